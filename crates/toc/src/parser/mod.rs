//! The `lopdf`-backed document handle provider.

pub mod backend;
pub mod content;
pub mod document;
pub mod outline;

use crate::TocError;

/// Run CPU-bound parsing on tokio's blocking pool. The returned future
/// yields while `work` runs, so a timeout around it can fire.
pub(crate) async fn offload<T, F>(work: F) -> Result<T, TocError>
where
    F: FnOnce() -> Result<T, TocError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TocError::Parse(format!("parser task failed: {e}")))?
}
