//! Network inclusion predicate
//!
//! A network passes when its type and crypt category are allowed and the
//! optional SSID and address expressions match.

use crate::error::Result;
use records::{CryptCategory, MacAddress, NetworkRecord, NetworkType};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

/// Filter configuration (`[filter]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Expression searched in the SSID; empty disables
    #[serde(default)]
    pub ssid_regex: String,
    /// Expression searched in the address, case-insensitive; empty disables
    #[serde(default)]
    pub bssid_regex: String,
    /// Network type name -> shown
    #[serde(default = "FilterSettings::default_types")]
    pub types: BTreeMap<String, bool>,
    /// Crypt category key (`none`, `wpa2`, `wpa`, `wep`, `other`) -> shown
    #[serde(default = "FilterSettings::default_crypts")]
    pub crypts: BTreeMap<String, bool>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            ssid_regex: String::new(),
            bssid_regex: String::new(),
            types: Self::default_types(),
            crypts: Self::default_crypts(),
        }
    }
}

impl FilterSettings {
    fn default_types() -> BTreeMap<String, bool> {
        NetworkType::KNOWN
            .iter()
            .map(|t| (t.as_str().to_string(), true))
            .collect()
    }

    fn default_crypts() -> BTreeMap<String, bool> {
        CryptCategory::BUCKET_ORDER
            .iter()
            .map(|c| (c.key().to_string(), true))
            .collect()
    }
}

/// Compiled filter
#[derive(Debug, Clone)]
pub struct NetworkFilter {
    types: BTreeMap<String, bool>,
    crypts: BTreeMap<CryptCategory, bool>,
    ssid: Option<Regex>,
    bssid: Option<Regex>,
}

impl NetworkFilter {
    /// Compile settings; fails on an invalid expression
    pub fn new(settings: &FilterSettings) -> Result<Self> {
        let crypts = CryptCategory::BUCKET_ORDER
            .iter()
            .filter_map(|c| settings.crypts.get(c.key()).map(|shown| (*c, *shown)))
            .collect();

        let ssid = if settings.ssid_regex.is_empty() {
            None
        } else {
            Some(Regex::new(&settings.ssid_regex)?)
        };
        let bssid = if settings.bssid_regex.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&settings.bssid_regex)
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(Self {
            types: settings.types.clone(),
            crypts,
            ssid,
            bssid,
        })
    }

    /// Evaluate the predicate
    ///
    /// Returns the network's crypt category when it passes. A type missing
    /// from the configuration is reported and treated as allowed.
    pub fn check(&self, mac: &MacAddress, network: &NetworkRecord) -> Option<CryptCategory> {
        match self.types.get(network.network_type.as_str()) {
            None => error!(
                "Unknown network type {:?} for {}",
                network.network_type.as_str(),
                mac
            ),
            Some(false) => return None,
            Some(true) => {}
        }

        let category = network.category();
        if !self.crypts.get(&category).copied().unwrap_or(true) {
            return None;
        }

        if let Some(ssid) = &self.ssid {
            if !ssid.is_match(&network.ssid) {
                return None;
            }
        }
        if let Some(bssid) = &self.bssid {
            if !bssid.is_match(&mac.to_string()) {
                return None;
            }
        }

        Some(category)
    }
}
