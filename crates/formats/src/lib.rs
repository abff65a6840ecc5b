//! Capture file codecs for airlog
//!
//! Every supported input format implements [`NetworkParser`], turning a file
//! into a map from hardware address text to a partial record. Every output
//! format implements [`NetworkExporter`]. Format names used by callers are
//! resolved through [`ImportFormat`] and [`ExportFormat`].
//!
//! | Name | Import | Export |
//! |------|--------|--------|
//! | native catalog (JSON) | yes | yes |
//! | legacy XML (`netxml`) | yes | yes |
//! | tabular (`csv`) | yes | yes |
//! | geo package (`kmz`) | no | yes |

pub mod error;
pub mod kmz;
pub mod native;
pub mod netxml;
pub mod tabular;

pub use error::{FormatError, Result};
pub use kmz::{KmzExporter, KmzOptions, TrackSource};
pub use native::NativeFormat;
pub use netxml::{NetxmlExporter, NetxmlParser};
pub use tabular::{TabularExporter, TabularParser};

use records::{ImportedNetwork, MacAddress, NetworkRecord};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Parser output keyed by the address text found in the file
///
/// Keys are not validated here; the catalog applies its validity gate on
/// ingestion.
pub type ParsedNetworks = BTreeMap<String, ImportedNetwork>;

/// One entry handed to an exporter
pub type ExportEntry<'a> = (&'a MacAddress, &'a NetworkRecord);

/// Turns a capture file into partial records
pub trait NetworkParser {
    /// Parse a file
    ///
    /// Missing or malformed files are logged and yield an empty map.
    fn parse(&self, path: &Path) -> ParsedNetworks;
}

/// Writes records in one output layout
pub trait NetworkExporter {
    fn export(&self, path: &Path, networks: &[ExportEntry<'_>]) -> Result<()>;
}

/// Render a coordinate in plain decimal notation
///
/// Never uses exponent form; trailing zeros are dropped but one fractional
/// digit is always kept, so `52.5` stays `52.5` and `1e-7` becomes
/// `0.0000001`.
pub fn format_coordinate(value: f64) -> String {
    let fixed = format!("{:.10}", value);
    let trimmed = fixed.trim_end_matches('0');
    let text = if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    };
    if text == "-0.0" { "0.0".to_string() } else { text }
}

/// Registered import format names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Native,
    Netxml,
    Csv,
}

impl ImportFormat {
    pub fn parser(self) -> Box<dyn NetworkParser> {
        match self {
            ImportFormat::Native => Box::new(NativeFormat),
            ImportFormat::Netxml => Box::new(NetxmlParser),
            ImportFormat::Csv => Box::new(TabularParser),
        }
    }
}

impl FromStr for ImportFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" | "networks" => Ok(ImportFormat::Native),
            "netxml" => Ok(ImportFormat::Netxml),
            "csv" => Ok(ImportFormat::Csv),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportFormat::Native => "native",
            ImportFormat::Netxml => "netxml",
            ImportFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

/// Registered export format names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Native,
    Netxml,
    Kmz,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(ExportFormat::Native),
            "netxml" | "kismet netxml" => Ok(ExportFormat::Netxml),
            "kmz" | "google earth kmz" => Ok(ExportFormat::Kmz),
            "csv" | "mappoint csv" => Ok(ExportFormat::Csv),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Native => "native",
            ExportFormat::Netxml => "netxml",
            ExportFormat::Kmz => "kmz",
            ExportFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}
