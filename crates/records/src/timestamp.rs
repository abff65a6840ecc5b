//! Timestamp codec for legacy exports
//!
//! Legacy capture files carry times as `Sat Oct 24 09:05:35 2009`. The codec
//! always uses English day/month names and UTC, so the result never depends
//! on the host locale or time zone.

use crate::error::{RecordError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Text layout used by the legacy XML and tabular formats
pub const LEGACY_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Layout used for human-facing "last seen" columns
pub const DISPLAY_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

fn to_datetime(timestamp: i64) -> DateTime<Utc> {
    // Out-of-range values render as the epoch
    DateTime::from_timestamp(timestamp, 0).unwrap_or_default()
}

/// Render an epoch timestamp in the legacy layout
pub fn to_legacy_string(timestamp: i64) -> String {
    to_datetime(timestamp).format(LEGACY_FORMAT).to_string()
}

/// Parse the legacy layout back into an epoch timestamp
pub fn from_legacy_string(text: &str) -> Result<i64> {
    NaiveDateTime::parse_from_str(text.trim(), LEGACY_FORMAT)
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|e| RecordError::InvalidTimestamp {
            input: text.to_string(),
            reason: e.to_string(),
        })
}

/// Render an epoch timestamp in the display layout
pub fn to_display_string(timestamp: i64) -> String {
    to_datetime(timestamp).format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: i64 = 1_256_375_135;

    #[test]
    fn test_legacy_format() {
        assert_eq!(to_legacy_string(SAMPLE), "Sat Oct 24 09:05:35 2009");
    }

    #[test]
    fn test_legacy_parse() {
        assert_eq!(from_legacy_string("Sat Oct 24 09:05:35 2009").unwrap(), SAMPLE);
        assert_eq!(from_legacy_string("Sat Oct 24 09:06:00 2009").unwrap(), SAMPLE + 25);
    }

    #[test]
    fn test_legacy_roundtrip() {
        for ts in [0, 86_399, SAMPLE, 1_700_000_000] {
            assert_eq!(from_legacy_string(&to_legacy_string(ts)).unwrap(), ts);
        }
    }

    #[test]
    fn test_invalid_text() {
        let err = from_legacy_string("24.10.2009 09:05").unwrap_err();
        assert!(matches!(err, RecordError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_display_format() {
        assert_eq!(to_display_string(SAMPLE), "2009/10/24 09:05:35");
    }
}
