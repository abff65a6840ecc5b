//! Record library for airlog
//!
//! This crate defines the data model shared by the format codecs and the
//! catalog engine: validated hardware addresses, merged network records,
//! the cryptography-set codec, the legacy timestamp codec, and the live
//! capture-source snapshot shape.
//!
//! # Example
//!
//! ```
//! use records::{CryptCategory, CryptSet, MacAddress, decode_cryptset, encode_cryptset};
//!
//! let mac: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
//! assert_eq!(mac.to_string(), "AA:BB:CC:DD:EE:FF");
//!
//! let bits = encode_cryptset(["wpa", "psk", "aes_ccm"]);
//! assert_eq!(decode_cryptset(bits), vec!["wpa", "psk", "aes_ccm"]);
//! assert_eq!(CryptSet(bits).category(), CryptCategory::Wpa2);
//! ```

pub mod crypt;
pub mod error;
pub mod mac;
pub mod snapshot;
pub mod stored;
pub mod timestamp;
pub mod types;

pub use crypt::{Crypt, CryptCategory, CryptSet, decode_cryptset, encode_cryptset};
pub use error::{RecordError, Result};
pub use mac::MacAddress;
pub use snapshot::{DeviceSnapshot, LiveObservation};
pub use stored::StoredNetwork;
pub use types::{ImportedNetwork, NetworkRecord, NetworkType, ShowMode, SignalDbm};
