use std::fmt;
use std::path::PathBuf;

use log::{debug, info};

use crate::config::ExtractionConfig;
use crate::extract::extract_table_of_contents;
use crate::handle::DocumentHandle;
use crate::parser::backend::LopdfBackend;
use crate::parser::document::LopdfDocument;
use crate::parser::offload;
use crate::types::TocNode;
use crate::TocError;

/// Where a PDF comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Url(String),
}

impl Source {
    /// `http(s)://` locations are URLs, anything else is a file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::Path(PathBuf::from(location))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Source::Url(url) => write!(f, "{}", url),
        }
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, TocError> {
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Parse on the blocking pool; only the finished backend comes back.
async fn parse(bytes: Vec<u8>) -> Result<LopdfDocument, TocError> {
    let backend = offload(move || LopdfBackend::load_bytes(&bytes)).await?;
    Ok(LopdfDocument::new(backend))
}

async fn load_once(source: &Source) -> Result<LopdfDocument, TocError> {
    match source {
        Source::Path(path) => parse(tokio::fs::read(path).await?).await,
        Source::Bytes(bytes) => parse(bytes.clone()).await,
        Source::Url(url) => {
            let bytes = fetch_bytes(url).await?;
            debug!("Downloaded {} bytes from {}", bytes.len(), url);
            parse(bytes).await
        }
    }
}

/// Open a document, retrying with the load timeout from `config`.
pub async fn load_document(source: &Source, config: &ExtractionConfig) -> Result<LopdfDocument, TocError> {
    let document = config
        .retry
        .load()
        .run("load document", || load_once(source))
        .await?;
    info!("Loaded {} ({} pages)", source, document.page_count());
    Ok(document)
}

/// [`load_document`] followed by [`extract_table_of_contents`].
pub async fn extract_from_source(
    source: &Source,
    config: &ExtractionConfig,
) -> Result<Vec<TocNode>, TocError> {
    let document = load_document(source, config).await?;
    extract_table_of_contents(&document, config).await
}
