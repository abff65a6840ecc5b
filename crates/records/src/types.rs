//! Network record type definitions
//!
//! This module defines the merged catalog entry, the partial record produced
//! by legacy-format parsers, and the small enums they share.

use crate::crypt::{CryptCategory, CryptSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Device-type classification
///
/// Serialized as a lowercase string. Legacy values `generic`, `probe` and
/// `data` read back as [`NetworkType::Unknown`]. Any other unrecognized value
/// is preserved as [`NetworkType::Other`] so it survives a save/load cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkType {
    /// Access point
    Infrastructure,
    /// Peer-to-peer network
    AdHoc,
    /// Station associated to an access point
    Client,
    /// Wired device seen through a bridge
    Wired,
    /// Wireless distribution system link
    Wds,
    /// Turbocell point
    Turbocell,
    /// Unclassified device
    #[default]
    Unknown,
    /// Value this build does not recognize
    Other(String),
}

impl NetworkType {
    /// Every recognized type, in display order
    pub const KNOWN: [NetworkType; 7] = [
        NetworkType::Infrastructure,
        NetworkType::AdHoc,
        NetworkType::Client,
        NetworkType::Wired,
        NetworkType::Wds,
        NetworkType::Turbocell,
        NetworkType::Unknown,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NetworkType::Infrastructure => "infrastructure",
            NetworkType::AdHoc => "ad-hoc",
            NetworkType::Client => "client",
            NetworkType::Wired => "wired",
            NetworkType::Wds => "wds",
            NetworkType::Turbocell => "turbocell",
            NetworkType::Unknown => "unknown",
            NetworkType::Other(s) => s,
        }
    }

    /// Parse a type name, folding legacy names into `Unknown`
    pub fn parse(name: &str) -> NetworkType {
        match name {
            "infrastructure" => NetworkType::Infrastructure,
            "ad-hoc" => NetworkType::AdHoc,
            "client" => NetworkType::Client,
            "wired" => NetworkType::Wired,
            "wds" => NetworkType::Wds,
            "turbocell" => NetworkType::Turbocell,
            "unknown" | "generic" | "probe" | "data" | "" => NetworkType::Unknown,
            other => NetworkType::Other(other.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, NetworkType::Other(_))
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for NetworkType {
    fn from(s: String) -> Self {
        NetworkType::parse(&s)
    }
}

impl From<NetworkType> for String {
    fn from(t: NetworkType) -> Self {
        t.as_str().to_string()
    }
}

/// Signal strength bounds in dBm
///
/// All zero means no signal data was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalDbm {
    pub last: i32,
    pub max: i32,
    pub min: i32,
}

impl SignalDbm {
    pub fn new(min: i32, max: i32, last: i32) -> Self {
        Self { last, max, min }
    }

    /// A record carries signal data once its max is non-zero
    pub fn has_data(&self) -> bool {
        self.max != 0
    }
}

/// Inclusion mode for a display target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowMode {
    /// Every sighted device
    #[default]
    All,
    /// Only devices touched this session
    Current,
    /// Nothing
    #[serde(rename = "none")]
    Hidden,
}

impl ShowMode {
    /// Whether a device with the given recency belongs in this mode
    pub fn includes(self, is_recent: bool) -> bool {
        match self {
            ShowMode::All => true,
            ShowMode::Current => is_recent,
            ShowMode::Hidden => false,
        }
    }
}

/// One merged catalog entry
///
/// Field order matches the sorted key order of the native catalog file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub channel: u32,
    pub codename: String,
    pub comment: String,
    /// Human-readable form of `crypt_set`
    pub crypt: String,
    #[serde(rename = "cryptset")]
    pub crypt_set: CryptSet,
    #[serde(rename = "firsttime")]
    pub first_seen: i64,
    #[serde(rename = "lasttime")]
    pub last_seen: i64,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    #[serde(rename = "manuf")]
    pub manufacturer: String,
    /// Capture sources that reported this device
    pub servers: BTreeSet<String>,
    pub signal_dbm: SignalDbm,
    pub ssid: String,
    #[serde(rename = "type")]
    pub network_type: NetworkType,
}

impl NetworkRecord {
    /// `0,0` is the "no fix" origin
    pub fn has_fix(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    pub fn category(&self) -> CryptCategory {
        self.crypt_set.category()
    }

    pub fn is_cloaked(&self) -> bool {
        self.ssid.is_empty()
    }
}

/// Partial record produced by a legacy-format parser
///
/// Fields the source format does not carry are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImportedNetwork {
    pub network_type: NetworkType,
    pub channel: u32,
    pub first_seen: i64,
    pub last_seen: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub manufacturer: String,
    pub ssid: String,
    pub crypt_set: CryptSet,
    pub crypt: String,
    pub signal_dbm: Option<SignalDbm>,
    pub comment: Option<String>,
    pub codename: Option<String>,
    pub servers: Option<BTreeSet<String>>,
}

impl ImportedNetwork {
    pub fn has_fix(&self) -> bool {
        !(self.latitude == 0.0 && self.longitude == 0.0)
    }

    /// Build a full record, defaulting annotations and provenance
    pub fn into_record(self) -> NetworkRecord {
        NetworkRecord {
            channel: self.channel,
            codename: self.codename.unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
            crypt: self.crypt,
            crypt_set: self.crypt_set,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            latitude: self.latitude,
            longitude: self.longitude,
            manufacturer: self.manufacturer,
            servers: self.servers.unwrap_or_default(),
            signal_dbm: self.signal_dbm.unwrap_or_default(),
            ssid: self.ssid,
            network_type: self.network_type,
        }
    }
}

impl From<NetworkRecord> for ImportedNetwork {
    fn from(record: NetworkRecord) -> Self {
        Self {
            network_type: record.network_type,
            channel: record.channel,
            first_seen: record.first_seen,
            last_seen: record.last_seen,
            latitude: record.latitude,
            longitude: record.longitude,
            manufacturer: record.manufacturer,
            ssid: record.ssid,
            crypt_set: record.crypt_set,
            crypt: record.crypt,
            signal_dbm: Some(record.signal_dbm),
            comment: Some(record.comment),
            codename: Some(record.codename),
            servers: Some(record.servers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_type_legacy_names() {
        for legacy in ["generic", "probe", "data"] {
            assert_eq!(NetworkType::parse(legacy), NetworkType::Unknown);
        }
        assert_eq!(NetworkType::parse("ad-hoc"), NetworkType::AdHoc);
    }

    #[test]
    fn test_network_type_preserves_unrecognized() {
        let t = NetworkType::parse("mesh");
        assert!(!t.is_recognized());
        assert_eq!(t.to_string(), "mesh");
    }

    #[test]
    fn test_network_type_serde() {
        let json = serde_json::to_string(&NetworkType::Infrastructure).unwrap();
        assert_eq!(json, "\"infrastructure\"");
        let back: NetworkType = serde_json::from_str("\"probe\"").unwrap();
        assert_eq!(back, NetworkType::Unknown);
    }

    #[test]
    fn test_show_mode() {
        assert!(ShowMode::All.includes(false));
        assert!(ShowMode::Current.includes(true));
        assert!(!ShowMode::Current.includes(false));
        assert!(!ShowMode::Hidden.includes(true));
        let mode: ShowMode = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(mode, ShowMode::Hidden);
    }

    #[test]
    fn test_record_json_keys_sorted() {
        let record = NetworkRecord::default();
        let json = serde_json::to_string(&record).unwrap();
        let keys = [
            "\"channel\"",
            "\"codename\"",
            "\"comment\"",
            "\"crypt\"",
            "\"cryptset\"",
            "\"firsttime\"",
            "\"lasttime\"",
            "\"lat\"",
            "\"lon\"",
            "\"manuf\"",
            "\"servers\"",
            "\"signal_dbm\"",
            "\"ssid\"",
            "\"type\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
    }

    #[test]
    fn test_has_fix() {
        let mut record = NetworkRecord::default();
        assert!(!record.has_fix());
        record.latitude = 52.5;
        assert!(record.has_fix());
    }

    #[test]
    fn test_imported_defaults() {
        let imported = ImportedNetwork {
            ssid: "lab".to_string(),
            ..Default::default()
        };
        let record = imported.into_record();
        assert_eq!(record.comment, "");
        assert_eq!(record.codename, "");
        assert!(record.servers.is_empty());
        assert_eq!(record.signal_dbm, SignalDbm::default());
    }
}
