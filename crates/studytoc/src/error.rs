#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Could not open {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
