//! airlog command-line front end
//!
//! Imports capture files into the persistent network catalog and exports it
//! in the supported interchange formats.

use anyhow::{Context, Result};
use catalog::{
    CatalogConfig, ChannelScheduler, ExportScope, NetworkCatalog, SaveOutcome, setup_logging,
};
use clap::{Parser, Subcommand};
use records::DeviceSnapshot;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "airlog")]
#[command(
    author,
    version,
    about = "airlog - Merge wireless network sightings into one catalog"
)]
#[command(long_about = "
Keeps a deduplicated catalog of wireless networks keyed by hardware address.
Sightings from capture files and live snapshot dumps are merged into it, and
the catalog can be exported as legacy XML, KMZ or semicolon CSV.

EXAMPLES:
    # Merge two capture files into the catalog
    airlog import --format netxml Kismet-1.netxml Kismet-2.netxml

    # Merge live snapshots recorded as JSON lines
    airlog ingest --source wlan0 snapshots.jsonl

    # Export the filtered catalog for Google Earth
    airlog export --format kmz --output networks.kmz --filtered

    # Show catalog statistics with debug logging
    airlog --log-level debug stats

CONFIGURATION:
    The configuration file is read from:
    1. Path specified with --config
    2. ~/.config/airlog/config.toml
    3. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Catalog file, overriding the configured path
    #[arg(long, value_name = "PATH", global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge capture files into the catalog
    Import {
        /// Input format (native, netxml, csv)
        #[arg(short, long)]
        format: String,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Merge live device snapshots stored one JSON object per line
    Ingest {
        /// Capture source name recorded in each network's server list
        #[arg(short, long, default_value = "local")]
        source: String,

        file: PathBuf,
    },

    /// Write the catalog in another format
    Export {
        /// Output format (native, netxml, kmz, csv)
        #[arg(short, long)]
        format: String,

        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// Only export networks passing the configured filter
        #[arg(long)]
        filtered: bool,
    },

    /// Print record counts per type and encryption category
    Stats,

    /// Save default configuration to default location and exit
    SaveConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle save-config early (before loading config)
    if matches!(args.command, Command::SaveConfig) {
        return save_default_config();
    }

    let config = if let Some(ref path) = args.config {
        CatalogConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        CatalogConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("airlog v{}", env!("CARGO_PKG_VERSION"));

    let catalog_path = args.catalog.clone().unwrap_or_else(|| config.catalog_path());

    let (scheduler, mut ticks) = ChannelScheduler::new();
    let mut catalog = NetworkCatalog::with_scheduler(&config, Box::new(scheduler))
        .context("Failed to initialize catalog")?;

    if catalog_path.is_file() {
        let count = catalog
            .load(&catalog_path)
            .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
        info!("Loaded {} networks", count);
    }

    match args.command {
        Command::Import { format, files } => {
            for file in &files {
                let count = catalog.import_file(&format, file);
                println!("{}: {} networks", file.display(), count);
            }
            catalog.drive_drain(&mut ticks).await;
            save(&catalog, &catalog_path)?;
        }
        Command::Ingest { source, file } => {
            let count = ingest_snapshots(&mut catalog, &source, &file)?;
            println!("{}: {} snapshots", file.display(), count);
            catalog.drive_drain(&mut ticks).await;
            save(&catalog, &catalog_path)?;
        }
        Command::Export {
            format,
            output,
            filtered,
        } => {
            let scope = if filtered {
                ExportScope::Filtered
            } else {
                ExportScope::All
            };
            let count = catalog
                .export_file(&format, &output, &scope, None)
                .with_context(|| format!("Failed to export {}", output.display()))?;
            println!("Exported {} networks to {}", count, output.display());
        }
        Command::Stats => print_stats(&catalog),
        Command::SaveConfig => save_default_config()?,
    }

    Ok(())
}

fn save_default_config() -> Result<()> {
    let config = CatalogConfig::default();
    let path = CatalogConfig::default_path();
    config.save(&path).context("Failed to save configuration")?;
    println!("Configuration saved to: {}", path.display());
    Ok(())
}

fn ingest_snapshots(catalog: &mut NetworkCatalog, source: &str, file: &Path) -> Result<usize> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("Failed to read snapshots {}", file.display()))?;

    let mut count = 0;
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match DeviceSnapshot::from_json(line) {
            Ok(snapshot) => {
                if catalog.ingest_live(&snapshot, source).is_some() {
                    count += 1;
                }
            }
            Err(e) => warn!("Skipping line {} of {}: {}", index + 1, file.display(), e),
        }
    }
    Ok(count)
}

fn save(catalog: &NetworkCatalog, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create catalog directory: {}", parent.display()))?;
    }

    match catalog
        .save(path, false)
        .with_context(|| format!("Failed to save catalog {}", path.display()))?
    {
        SaveOutcome::Saved => println!("Catalog saved to: {}", path.display()),
        SaveOutcome::Skipped => warn!("Catalog not saved, notifications still pending"),
    }
    Ok(())
}

fn print_stats(catalog: &NetworkCatalog) {
    let stats = catalog.stats();
    println!("{} networks", stats.total);
    println!("\nBy type:");
    for (name, count) in &stats.by_type {
        println!("  {:<16} {}", name, count);
    }
    println!("\nBy encryption:");
    for (category, count) in &stats.by_category {
        println!("  {:<16} {}", category.label(), count);
    }
}
