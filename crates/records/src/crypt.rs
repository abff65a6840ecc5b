//! Cryptography-set codec
//!
//! Capture sources report the encryption and authentication mechanisms seen on
//! a device as a bit field. Each bit maps to exactly one named mechanism; the
//! empty set is spelled `none`.
//!
//! # Bit layout
//! ```text
//! bit  0 unknown        bit  7 psk            bit 14 tls
//! bit  1 wep            bit  8 aes_ocb        bit 15 peap
//! bit  2 layer3         bit  9 aes_ccm        bit 16 isakmp
//! bit  3 wep40          bit 10 wpa_migmode    bit 17 pptp
//! bit  4 wep104         bit 11 eap            bit 18 fortress
//! bit  5 tkip           bit 12 leap           bit 19 keyguard
//! bit  6 wpa            bit 13 ttls           bit 20 unknown_nonwep
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Name used for the empty mechanism set
pub const NONE_NAME: &str = "none";

/// One encryption or authentication mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Crypt {
    Unknown = 0,
    Wep = 1,
    Layer3 = 2,
    Wep40 = 3,
    Wep104 = 4,
    Tkip = 5,
    Wpa = 6,
    Psk = 7,
    AesOcb = 8,
    AesCcm = 9,
    WpaMigMode = 10,
    Eap = 11,
    Leap = 12,
    Ttls = 13,
    Tls = 14,
    Peap = 15,
    Isakmp = 16,
    Pptp = 17,
    Fortress = 18,
    Keyguard = 19,
    UnknownNonWep = 20,
}

impl Crypt {
    /// Every mechanism in bit order
    pub const ALL: [Crypt; 21] = [
        Crypt::Unknown,
        Crypt::Wep,
        Crypt::Layer3,
        Crypt::Wep40,
        Crypt::Wep104,
        Crypt::Tkip,
        Crypt::Wpa,
        Crypt::Psk,
        Crypt::AesOcb,
        Crypt::AesCcm,
        Crypt::WpaMigMode,
        Crypt::Eap,
        Crypt::Leap,
        Crypt::Ttls,
        Crypt::Tls,
        Crypt::Peap,
        Crypt::Isakmp,
        Crypt::Pptp,
        Crypt::Fortress,
        Crypt::Keyguard,
        Crypt::UnknownNonWep,
    ];

    /// The single bit this mechanism occupies
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Lowercase token used in crypt strings and legacy files
    pub fn name(self) -> &'static str {
        match self {
            Crypt::Unknown => "unknown",
            Crypt::Wep => "wep",
            Crypt::Layer3 => "layer3",
            Crypt::Wep40 => "wep40",
            Crypt::Wep104 => "wep104",
            Crypt::Tkip => "tkip",
            Crypt::Wpa => "wpa",
            Crypt::Psk => "psk",
            Crypt::AesOcb => "aes_ocb",
            Crypt::AesCcm => "aes_ccm",
            Crypt::WpaMigMode => "wpa_migmode",
            Crypt::Eap => "eap",
            Crypt::Leap => "leap",
            Crypt::Ttls => "ttls",
            Crypt::Tls => "tls",
            Crypt::Peap => "peap",
            Crypt::Isakmp => "isakmp",
            Crypt::Pptp => "pptp",
            Crypt::Fortress => "fortress",
            Crypt::Keyguard => "keyguard",
            Crypt::UnknownNonWep => "unknown_nonwep",
        }
    }

    /// Look up a mechanism by its token
    pub fn from_name(name: &str) -> Option<Crypt> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Crypt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bit mask covering every recognized mechanism
pub const KNOWN_BITS: u32 = (1 << Crypt::ALL.len()) - 1;

/// Coarse encryption category used for display and filtering
///
/// Reduction is tested in priority order: an empty set is `None`, AES-CCM or
/// AES-OCB makes `Wpa2`, then WPA, then WEP, and anything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CryptCategory {
    None,
    Wpa2,
    Wpa,
    Wep,
    Other,
}

impl CryptCategory {
    /// Categories in export bucket order
    pub const BUCKET_ORDER: [CryptCategory; 5] = [
        CryptCategory::Wpa2,
        CryptCategory::Wpa,
        CryptCategory::Wep,
        CryptCategory::None,
        CryptCategory::Other,
    ];

    /// Display label (`WPA2`, `WPA`, `WEP`, `None`, `Other`)
    pub fn label(self) -> &'static str {
        match self {
            CryptCategory::None => "None",
            CryptCategory::Wpa2 => "WPA2",
            CryptCategory::Wpa => "WPA",
            CryptCategory::Wep => "WEP",
            CryptCategory::Other => "Other",
        }
    }

    /// Lowercase key used in configuration files
    pub fn key(self) -> &'static str {
        match self {
            CryptCategory::None => "none",
            CryptCategory::Wpa2 => "wpa2",
            CryptCategory::Wpa => "wpa",
            CryptCategory::Wep => "wep",
            CryptCategory::Other => "other",
        }
    }
}

impl fmt::Display for CryptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bit-encoded mechanism set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CryptSet(pub u32);

impl CryptSet {
    /// The empty set
    pub const NONE: CryptSet = CryptSet(0);

    /// Mechanisms present, in bit order
    pub fn mechanisms(self) -> Vec<Crypt> {
        Crypt::ALL
            .into_iter()
            .filter(|c| self.0 & c.bit() != 0)
            .collect()
    }

    /// Build a set from mechanisms
    pub fn from_mechanisms<I: IntoIterator<Item = Crypt>>(mechanisms: I) -> Self {
        CryptSet(mechanisms.into_iter().fold(0, |acc, c| acc | c.bit()))
    }

    /// Whether a mechanism is present
    pub fn contains(self, crypt: Crypt) -> bool {
        self.0 & crypt.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Reduce to the coarse display category
    pub fn category(self) -> CryptCategory {
        if self.is_empty() {
            CryptCategory::None
        } else if self.contains(Crypt::AesCcm) || self.contains(Crypt::AesOcb) {
            CryptCategory::Wpa2
        } else if self.contains(Crypt::Wpa) {
            CryptCategory::Wpa
        } else if self.contains(Crypt::Wep) {
            CryptCategory::Wep
        } else {
            CryptCategory::Other
        }
    }

    /// Uppercase comma-joined description, e.g. `WPA,PSK,AES_CCM`
    ///
    /// A WEP token alongside any WPA mechanism is dropped; capture sources
    /// report that combination for WPA networks with legacy WEP fallback.
    pub fn describe(self) -> String {
        let names = decode_cryptset(self.0);
        let has_wpa = names.iter().any(|n| n.starts_with("wpa"));
        names
            .into_iter()
            .filter(|n| !(has_wpa && *n == "wep"))
            .map(str::to_uppercase)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl From<u32> for CryptSet {
    fn from(bits: u32) -> Self {
        CryptSet(bits)
    }
}

/// Decode a crypt set into mechanism names
///
/// The empty set decodes to `["none"]`. Bits above the known range are
/// ignored.
pub fn decode_cryptset(cryptset: u32) -> Vec<&'static str> {
    if cryptset == 0 {
        return vec![NONE_NAME];
    }
    CryptSet(cryptset)
        .mechanisms()
        .into_iter()
        .map(Crypt::name)
        .collect()
}

/// Encode mechanism names into a crypt set
///
/// `none` contributes no bits. Unrecognized names are skipped.
pub fn encode_cryptset<I, S>(names: I) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut bits = 0;
    for name in names {
        let name = name.as_ref();
        if name == NONE_NAME || name.is_empty() {
            continue;
        }
        match Crypt::from_name(name) {
            Some(crypt) => bits |= crypt.bit(),
            None => debug!("Ignoring unrecognized crypt mechanism {:?}", name),
        }
    }
    bits
}

/// Normalize a legacy mechanism label (`AES-CCM`) into a token (`aes_ccm`)
pub fn normalize_token(label: &str) -> String {
    label.trim().to_lowercase().replace('-', "_")
}
