//! Catalog error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] formats::FormatError),

    #[error("Record error: {0}")]
    Record(#[from] records::RecordError),

    #[error("Invalid filter expression: {0}")]
    Filter(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
