//! Record error types

use thiserror::Error;

/// Errors raised while building or decoding network records
#[derive(Debug, Error)]
pub enum RecordError {
    /// Hardware address is not a 17-character colon-separated hex string
    #[error("Invalid hardware address: {0:?}")]
    InvalidAddress(String),

    /// The all-zero address is reserved and never names a device
    #[error("Hardware address 00:00:00:00:00:00 is not a device")]
    NullAddress,

    /// Timestamp text did not match the legacy export format
    #[error("Invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    /// JSON decoding error for stored catalogs and live snapshots
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for record results
pub type Result<T> = std::result::Result<T, RecordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RecordError::InvalidAddress("AA:BB".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid hardware address"));
        assert!(msg.contains("AA:BB"));
    }

    #[test]
    fn test_timestamp_error_display() {
        let err = RecordError::InvalidTimestamp {
            input: "yesterday".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("yesterday"));
        assert!(msg.contains("invalid characters"));
    }
}
