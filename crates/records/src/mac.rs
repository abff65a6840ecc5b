//! Hardware address value object
//!
//! Every catalog entry is keyed by the 6-octet address of the radio that was
//! sighted. The canonical text form is 17 characters of uppercase,
//! colon-separated hex octets (`AA:BB:CC:DD:EE:FF`).

use crate::error::{RecordError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of the canonical text form
pub const ADDRESS_TEXT_LEN: usize = 17;

/// A validated hardware address
///
/// Construction goes through [`FromStr`], which rejects anything that is not
/// exactly six hex octets and rejects the all-zero address.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Build an address from raw octets
    pub fn from_octets(octets: [u8; 6]) -> Result<Self> {
        if octets == [0u8; 6] {
            return Err(RecordError::NullAddress);
        }
        Ok(Self(octets))
    }

    /// Raw octets
    pub fn octets(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check whether a string would be accepted as a catalog key
    pub fn is_valid(s: &str) -> bool {
        s.parse::<MacAddress>().is_ok()
    }
}

impl FromStr for MacAddress {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(RecordError::InvalidAddress(s.to_string()));
        }

        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| RecordError::InvalidAddress(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| RecordError::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(RecordError::InvalidAddress(s.to_string()));
        }

        Self::from_octets(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.octets(), &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_lowercase_normalizes_to_uppercase() {
        let mac: MacAddress = "00:1a:2b:3c:4d:5e".parse().unwrap();
        assert_eq!(mac.to_string(), "00:1A:2B:3C:4D:5E");
    }

    #[test]
    fn test_rejects_null_address() {
        assert!(matches!(
            "00:00:00:00:00:00".parse::<MacAddress>(),
            Err(RecordError::NullAddress)
        ));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(!MacAddress::is_valid(""));
        assert!(!MacAddress::is_valid("AA:BB:CC:DD:EE"));
        assert!(!MacAddress::is_valid("AA:BB:CC:DD:EE:FF:00"));
        assert!(!MacAddress::is_valid("AA:BB:CC:DD:EE:F"));
    }

    #[test]
    fn test_rejects_bad_shape() {
        assert!(!MacAddress::is_valid("AABBCCDDEEFF12345"));
        assert!(!MacAddress::is_valid("AA-BB-CC-DD-EE-FF"));
        assert!(!MacAddress::is_valid("GG:BB:CC:DD:EE:FF"));
        assert!(!MacAddress::is_valid("AAA:B:CC:DD:EE:FF"));
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"AA:BB:CC:DD:EE:FF\"");
        let back: MacAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
        assert!(serde_json::from_str::<MacAddress>("\"00:00:00:00:00:00\"").is_err());
    }

    #[test]
    fn test_ordering_follows_octets() {
        let low: MacAddress = "00:00:00:00:00:01".parse().unwrap();
        let high: MacAddress = "FF:00:00:00:00:00".parse().unwrap();
        assert!(low < high);
    }
}
