//! Stored catalog entry shape and its upgrade
//!
//! Catalog files written by older releases omit fields that were added
//! later. [`StoredNetwork`] accepts every historical shape and
//! [`StoredNetwork::upgrade`] turns it into a current [`NetworkRecord`] once,
//! at load time.

use crate::crypt::CryptSet;
use crate::types::{NetworkRecord, NetworkType, SignalDbm};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Any historical catalog entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoredNetwork {
    #[serde(rename = "type", default)]
    pub network_type: NetworkType,
    #[serde(default)]
    pub channel: u32,
    #[serde(rename = "firsttime", default)]
    pub first_seen: i64,
    #[serde(rename = "lasttime", default)]
    pub last_seen: i64,
    #[serde(rename = "lat", default)]
    pub latitude: f64,
    #[serde(rename = "lon", default)]
    pub longitude: f64,
    #[serde(rename = "manuf", default)]
    pub manufacturer: String,
    #[serde(default)]
    pub ssid: String,
    #[serde(rename = "cryptset", default)]
    pub crypt_set: CryptSet,
    pub crypt: Option<String>,
    pub signal_dbm: Option<SignalDbm>,
    pub comment: Option<String>,
    pub codename: Option<String>,
    pub servers: Option<BTreeSet<String>>,
}

impl StoredNetwork {
    /// Fill absent fields and normalize legacy values
    pub fn upgrade(self) -> NetworkRecord {
        let crypt = self.crypt.unwrap_or_else(|| self.crypt_set.describe());
        NetworkRecord {
            channel: self.channel,
            codename: self.codename.unwrap_or_default(),
            comment: self.comment.unwrap_or_default(),
            crypt,
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
