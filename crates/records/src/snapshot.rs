//! Live capture-source device snapshot
//!
//! The capture source reports each device as a JSON object with dotted field
//! names. [`DeviceSnapshot`] mirrors that wire shape and
//! [`DeviceSnapshot::observe`] normalizes it into a [`LiveObservation`].

use crate::crypt::CryptSet;
use crate::error::Result;
use crate::mac::MacAddress;
use crate::types::{NetworkType, SignalDbm};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::error;

/// Minimum fix quality for a trusted position (2D fix)
pub const MIN_FIX_QUALITY: u8 = 2;

/// Typeset bits reported by the capture source
pub mod typeset {
    pub const AP: u32 = 1;
    pub const ADHOC: u32 = 1 << 1;
    pub const CLIENT: u32 = 1 << 2;
    pub const WIRED: u32 = 1 << 3;
    pub const WDS: u32 = 1 << 4;
    pub const TURBOCELL: u32 = 1 << 5;
    pub const INFERRED_WIRELESS: u32 = 1 << 6;
    pub const INFERRED_WIRED: u32 = 1 << 7;
    pub const PROBE_AP: u32 = 1 << 8;
}

/// Decode a typeset bit field into a device type
pub fn decode_typeset(bits: u32) -> NetworkType {
    if bits & (typeset::AP | typeset::PROBE_AP) != 0 {
        NetworkType::Infrastructure
    } else if bits & typeset::ADHOC != 0 {
        NetworkType::AdHoc
    } else if bits & typeset::CLIENT != 0 {
        NetworkType::Client
    } else if bits & (typeset::WIRED | typeset::INFERRED_WIRED) != 0 {
        NetworkType::Wired
    } else if bits & typeset::WDS != 0 {
        NetworkType::Wds
    } else if bits & typeset::TURBOCELL != 0 {
        NetworkType::Turbocell
    } else {
        NetworkType::Unknown
    }
}

/// Device snapshot in the capture source's wire shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(rename = "kismet.device.base.macaddr")]
    pub macaddr: String,
    /// Channel as reported; may be a frequency label rather than a number
    #[serde(rename = "kismet.device.base.channel", default)]
    pub channel: String,
    #[serde(rename = "kismet.device.base.first_time", default)]
    pub first_time: i64,
    #[serde(rename = "kismet.device.base.last_time", default)]
    pub last_time: i64,
    #[serde(rename = "kismet.device.base.manuf", default)]
    pub manuf: String,
    #[serde(rename = "kismet.device.base.crypt", default)]
    pub crypt: String,
    #[serde(
        rename = "kismet.device.base.location",
        default,
        deserialize_with = "lenient_location",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Location>,
    #[serde(rename = "kismet.common.signal.type", default)]
    pub signal_type: String,
    #[serde(rename = "kismet.common.signal.min_signal", default)]
    pub min_signal: i32,
    #[serde(rename = "kismet.common.signal.max_signal", default)]
    pub max_signal: i32,
    #[serde(rename = "kismet.common.signal.last_signal", default)]
    pub last_signal: i32,
    #[serde(rename = "dot11.device", default)]
    pub dot11: Dot11Device,
}

/// Capture sources report `0`, `""` or `null` when no location is known
fn lenient_location<'de, D>(deserializer: D) -> std::result::Result<Option<Location>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "kismet.common.location.loc_fix", default)]
    pub loc_fix: u8,
    #[serde(
        rename = "kismet.common.location.avg_loc",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub avg_loc: Option<AverageLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AverageLocation {
    /// `[longitude, latitude]`
    #[serde(rename = "kismet.common.location.geopoint")]
    pub geopoint: [f64; 2],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dot11Device {
    #[serde(rename = "dot11.device.advertised_ssid_map", default)]
    pub advertised_ssid_map: Vec<AdvertisedSsid>,
    #[serde(
        rename = "dot11.device.last_beaconed_ssid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_beaconed_ssid: Option<String>,
    #[serde(rename = "dot11.device.typeset", default)]
    pub typeset: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvertisedSsid {
    #[serde(rename = "dot11.advertisedssid.ssid", default)]
    pub ssid: String,
    #[serde(rename = "dot11.advertisedssid.crypt_set", default)]
    pub crypt_set: u32,
}

/// Normalized live observation of one device
#[derive(Debug, Clone, PartialEq)]
pub struct LiveObservation {
    pub address: MacAddress,
    pub channel: u32,
    pub first_seen: i64,
    pub last_seen: i64,
    pub manufacturer: String,
    pub ssid: String,
    pub crypt_set: CryptSet,
    pub crypt: String,
    /// `(latitude, longitude)` when the fix is trusted
    pub position: Option<(f64, f64)>,
    pub signal: SignalDbm,
    pub network_type: NetworkType,
}

impl DeviceSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Normalize the wire shape
    ///
    /// Fails only when the hardware address is invalid.
    pub fn observe(&self) -> Result<LiveObservation> {
        let address: MacAddress = self.macaddr.parse()?;

        let channel = if !self.channel.is_empty() && self.channel.bytes().all(|b| b.is_ascii_digit())
        {
            self.channel.parse().unwrap_or(0)
        } else {
            0
        };

        let ssid_map = &self.dot11.advertised_ssid_map;
        if ssid_map.len() > 1 {
            error!(
                "Device {} advertises {} SSIDs, using the first",
                address,
                ssid_map.len()
            );
        }
        let (mut ssid, crypt_set) = ssid_map
            .first()
            .map(|entry| (entry.ssid.clone(), CryptSet(entry.crypt_set)))
            .unwrap_or_default();
        if ssid.is_empty() {
            if let Some(beaconed) = &self.dot11.last_beaconed_ssid {
                ssid = beaconed.clone();
            }
        }

        let position = self
            .location
            .as_ref()
            .filter(|loc| loc.loc_fix >= MIN_FIX_QUALITY)
            .and_then(|loc| loc.avg_loc.as_ref())
            .map(|avg| (avg.geopoint[1], avg.geopoint[0]));

        let signal = if self.signal_type == "dbm" {
            SignalDbm::new(self.min_signal, self.max_signal, self.last_signal)
        } else {
            SignalDbm::default()
        };

        Ok(LiveObservation {
            address,
            channel,
            first_seen: self.first_time,
            last_seen: self.last_time,
            manufacturer: self.manuf.clone(),
            ssid,
            crypt_set,
            crypt: self.crypt.clone(),
            position,
            signal,
            network_type: decode_typeset(self.dot11.typeset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "kismet.device.base.macaddr": "aa:bb:cc:dd:ee:ff",
            "kismet.device.base.channel": "11",
            "kismet.device.base.first_time": 1000,
            "kismet.device.base.last_time": 2000,
            "kismet.device.base.manuf": "Acme",
            "kismet.device.base.crypt": "WPA2-PSK",
            "kismet.device.base.location": {
                "kismet.common.location.loc_fix": 3,
                "kismet.common.location.avg_loc": {
                    "kismet.common.location.geopoint": [13.4, 52.5]
                }
            },
            "kismet.common.signal.type": "dbm",
            "kismet.common.signal.min_signal": -80,
            "kismet.common.signal.max_signal": -40,
            "kismet.common.signal.last_signal": -55,
            "dot11.device": {
                "dot11.device.advertised_ssid_map": [
                    {"dot11.advertisedssid.ssid": "lab", "dot11.advertisedssid.crypt_set": 704}
                ],
                "dot11.device.typeset": 1
            }
        }"#
    }

    #[test]
    fn test_observe_full_snapshot() {
        let snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        let obs = snapshot.observe().unwrap();
        assert_eq!(obs.address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(obs.channel, 11);
        assert_eq!(obs.ssid, "lab");
        assert_eq!(obs.crypt_set, CryptSet(704));
        assert_eq!(obs.position, Some((52.5, 13.4)));
        assert_eq!(obs.signal, SignalDbm::new(-80, -40, -55));
        assert_eq!(obs.network_type, NetworkType::Infrastructure);
    }

    #[test]
    fn test_odd_location_values_mean_no_fix() {
        let base: serde_json::Value = serde_json::from_str(sample_json()).unwrap();
        for odd in [
            serde_json::json!(0),
            serde_json::json!(""),
            serde_json::json!(null),
            serde_json::json!([]),
            serde_json::json!({"kismet.common.location.loc_fix": "bad"}),
        ] {
            let mut json = base.clone();
            json["kismet.device.base.location"] = odd;
            let snapshot = DeviceSnapshot::from_json(&json.to_string()).unwrap();
            assert!(snapshot.location.is_none());
            let obs = snapshot.observe().unwrap();
            assert_eq!(obs.position, None);
            assert_eq!(obs.ssid, "lab");
        }
    }

    #[test]
    fn test_non_numeric_channel() {
        let mut snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        snapshot.channel = "5GHz".to_string();
        assert_eq!(snapshot.observe().unwrap().channel, 0);
    }

    #[test]
    fn test_weak_fix_is_ignored() {
        let mut snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        if let Some(loc) = snapshot.location.as_mut() {
            loc.loc_fix = 1;
        }
        assert_eq!(snapshot.observe().unwrap().position, None);
    }

    #[test]
    fn test_non_dbm_signal_is_zeroed() {
        let mut snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        snapshot.signal_type = "rssi".to_string();
        assert_eq!(snapshot.observe().unwrap().signal, SignalDbm::default());
    }

    #[test]
    fn test_beaconed_ssid_fallback() {
        let mut snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        snapshot.dot11.advertised_ssid_map.clear();
        snapshot.dot11.last_beaconed_ssid = Some("beacon".to_string());
        let obs = snapshot.observe().unwrap();
        assert_eq!(obs.ssid, "beacon");
        assert_eq!(obs.crypt_set, CryptSet::NONE);
    }

    #[test]
    fn test_multiple_ssids_uses_first() {
        let mut snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        snapshot.dot11.advertised_ssid_map.push(AdvertisedSsid {
            ssid: "second".to_string(),
            crypt_set: 2,
        });
        assert_eq!(snapshot.observe().unwrap().ssid, "lab");
    }

    #[test]
    fn test_invalid_address() {
        let mut snapshot = DeviceSnapshot::from_json(sample_json()).unwrap();
        snapshot.macaddr = "00:00:00:00:00:00".to_string();
        assert!(snapshot.observe().is_err());
    }

    #[test]
    fn test_decode_typeset() {
        assert_eq!(decode_typeset(typeset::PROBE_AP), NetworkType::Infrastructure);
        assert_eq!(decode_typeset(typeset::AP | typeset::CLIENT), NetworkType::Infrastructure);
        assert_eq!(decode_typeset(typeset::CLIENT), NetworkType::Client);
        assert_eq!(decode_typeset(typeset::INFERRED_WIRED), NetworkType::Wired);
        assert_eq!(decode_typeset(typeset::INFERRED_WIRELESS), NetworkType::Unknown);
        assert_eq!(decode_typeset(0), NetworkType::Unknown);
    }
}
