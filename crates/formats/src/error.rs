//! Format codec error types

use thiserror::Error;

/// Errors raised while reading or writing capture files
#[derive(Debug, Error)]
pub enum FormatError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed legacy XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed tabular file
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Archive could not be written
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Native catalog could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A field failed record validation
    #[error("Record error: {0}")]
    Record(#[from] records::RecordError),

    /// A required column or element is missing
    #[error("Missing field {0:?}")]
    MissingField(String),

    /// A numeric field did not parse
    #[error("Invalid value {value:?} for {field}")]
    InvalidValue { field: String, value: String },

    /// Format name not present in the registry
    #[error("Unknown format {0:?}")]
    UnknownFormat(String),
}

/// Type alias for format results
pub type Result<T> = std::result::Result<T, FormatError>;
