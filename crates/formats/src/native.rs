//! Native catalog format
//!
//! The catalog is stored as one indented JSON object keyed by hardware
//! address, with keys sorted at every level. Writes go to `<file>.new` first
//! and are renamed over the target, so an interrupted save never leaves a
//! truncated catalog behind. [`save_with_backups`] additionally keeps
//! numbered copies `<file>.0 .. <file>.N-1` of earlier saves.

use crate::error::Result;
use crate::{ExportEntry, NetworkExporter, NetworkParser, ParsedNetworks};
use records::{MacAddress, NetworkRecord, StoredNetwork};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Suffix of the temporary file written before the final rename
pub const TEMP_SUFFIX: &str = ".new";

/// `<path><suffix>`, keeping the full file name
fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Path of the numbered backup `index`
pub fn backup_path(path: &Path, index: u32) -> PathBuf {
    suffixed_path(path, &format!(".{}", index))
}

fn write_json<'a, I>(path: &Path, networks: I) -> Result<()>
where
    I: IntoIterator<Item = ExportEntry<'a>>,
{
    let sorted: BTreeMap<&MacAddress, &NetworkRecord> = networks.into_iter().collect();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &sorted)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Write a catalog atomically
pub fn write_catalog<'a, I>(path: &Path, networks: I) -> Result<()>
where
    I: IntoIterator<Item = ExportEntry<'a>>,
{
    let temp = suffixed_path(path, TEMP_SUFFIX);
    write_json(&temp, networks)?;
    fs::rename(&temp, path)?;
    Ok(())
}

/// Write a catalog atomically and rotate numbered backups
///
/// With `num_backups == 0` no backup files are kept.
pub fn save_with_backups<'a, I>(path: &Path, networks: I, num_backups: u32) -> Result<()>
where
    I: IntoIterator<Item = ExportEntry<'a>>,
{
    let temp = suffixed_path(path, TEMP_SUFFIX);
    write_json(&temp, networks)?;

    if num_backups > 0 {
        for index in (0..num_backups - 1).rev() {
            let old = backup_path(path, index);
            if old.is_file() {
                fs::rename(&old, backup_path(path, index + 1))?;
            }
        }
        if path.is_file() {
            fs::rename(path, backup_path(path, 0))?;
        }
    }

    fs::rename(&temp, path)?;
    debug!("Saved catalog to {:?} keeping {} backups", path, num_backups);
    Ok(())
}

/// Read a catalog, upgrading older entry shapes
///
/// Entries whose key is not a valid hardware address are skipped.
pub fn read_catalog(path: &Path) -> Result<BTreeMap<MacAddress, NetworkRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let stored: BTreeMap<String, StoredNetwork> = serde_json::from_reader(reader)?;

    let mut networks = BTreeMap::new();
    for (key, entry) in stored {
        match key.parse::<MacAddress>() {
            Ok(mac) => {
                networks.insert(mac, entry.upgrade());
            }
            Err(e) => warn!("Skipping catalog entry {:?}: {}", key, e),
        }
    }

    info!("Read {} networks from {:?}", networks.len(), path);
    Ok(networks)
}

/// Native catalog parser and exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFormat;

impl NetworkParser for NativeFormat {
    fn parse(&self, path: &Path) -> ParsedNetworks {
        match read_catalog(path) {
            Ok(networks) => networks
                .into_iter()
                .map(|(mac, record)| (mac.to_string(), record.into()))
                .collect(),
            Err(e) => {
                error!("Failed to read catalog {:?}: {}", path, e);
                ParsedNetworks::new()
            }
        }
    }
}

impl NetworkExporter for NativeFormat {
    fn export(&self, path: &Path, networks: &[ExportEntry<'_>]) -> Result<()> {
        write_catalog(path, networks.iter().copied())
    }
}
