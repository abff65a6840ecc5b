//! Catalog configuration management

use crate::filter::{FilterSettings, NetworkFilter};
use crate::merge::MergePolicy;
use anyhow::{Context, Result, anyhow};
use formats::KmzOptions;
use records::ShowMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the target that scopes filtered exports
pub const EXPORT_TARGET: &str = "export";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub persistence: PersistenceSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    /// Display target name -> inclusion mode
    #[serde(default = "CatalogConfig::default_targets")]
    pub targets: BTreeMap<String, ShowMode>,
    #[serde(default)]
    pub drain: DrainSettings,
    #[serde(default)]
    pub merge: MergePolicy,
    #[serde(default)]
    pub kmz: KmzOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default = "GeneralSettings::default_log_level")]
    pub log_level: String,
    /// Catalog file; `~` is expanded
    #[serde(default)]
    pub catalog_path: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            catalog_path: None,
        }
    }
}

impl GeneralSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Numbered backups kept on save (0 = none)
    #[serde(default = "PersistenceSettings::default_num_backups")]
    pub num_backups: u32,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            num_backups: Self::default_num_backups(),
        }
    }
}

impl PersistenceSettings {
    fn default_num_backups() -> u32 {
        5
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainSettings {
    /// Time budget of one drain slice in milliseconds
    #[serde(default = "DrainSettings::default_slice_ms")]
    pub slice_ms: u64,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            slice_ms: Self::default_slice_ms(),
        }
    }
}

impl DrainSettings {
    fn default_slice_ms() -> u64 {
        900
    }

    pub fn slice(&self) -> Duration {
        Duration::from_millis(self.slice_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            persistence: PersistenceSettings::default(),
            filter: FilterSettings::default(),
            targets: Self::default_targets(),
            drain: DrainSettings::default(),
            merge: MergePolicy::default(),
            kmz: KmzOptions::default(),
        }
    }
}

impl CatalogConfig {
    fn default_targets() -> BTreeMap<String, ShowMode> {
        BTreeMap::from([
            ("map".to_string(), ShowMode::All),
            ("network_list".to_string(), ShowMode::All),
            (EXPORT_TARGET.to_string(), ShowMode::All),
        ])
    }

    /// Load configuration from the specified path, or the default location
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()),
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Err(anyhow!("No configuration file found, using defaults"));
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: CatalogConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("airlog").join("config.toml")
        } else {
            PathBuf::from(".config/airlog/config.toml")
        }
    }

    /// Resolved catalog file path
    pub fn catalog_path(&self) -> PathBuf {
        match &self.general.catalog_path {
            Some(path) => PathBuf::from(shellexpand::tilde(path).as_ref()),
            None => Self::default_catalog_path(),
        }
    }

    fn default_catalog_path() -> PathBuf {
        if let Some(data_dir) = dirs::data_local_dir() {
            data_dir.join("airlog").join("networks.json")
        } else {
            PathBuf::from("networks.json")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        NetworkFilter::new(&self.filter).context("Invalid filter expression")?;

        if self.drain.slice_ms == 0 {
            return Err(anyhow!("drain.slice_ms must be greater than zero"));
        }

        if self.kmz.document_name.is_empty() {
            return Err(anyhow!("kmz.document_name must not be empty"));
        }

        Ok(())
    }
}
