use std::time::Duration;

use thiserror::Error;

pub mod config;
pub mod extract;
pub mod handle;
pub mod loader;
pub mod parser;
pub mod render;
pub mod retry;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ExtractionConfig, ScoringPolicy};
pub use extract::{extract_table_of_contents, run_stage};
pub use handle::{DocumentHandle, PageHandle};
pub use loader::{extract_from_source, load_document, Source};
pub use parser::document::LopdfDocument;
pub use retry::RetryPolicy;
pub use types::*;

#[derive(Debug, Error)]
pub enum TocError {
    /// The handle is unusable: no pages, or page 1 cannot be fetched.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },
    #[error("Destination could not be resolved: {0}")]
    Resolution(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InvalidTocSource> for TocError {
    fn from(e: InvalidTocSource) -> Self {
        TocError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for TocError {
    fn from(e: reqwest::Error) -> Self {
        TocError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for TocError {
    fn from(e: toml::de::Error) -> Self {
        TocError::Config(e.to_string())
    }
}
