//! The document interface the extraction engine consumes.
//!
//! A hosting application provides an opened document through these traits.
//! The crate ships one implementation backed by `lopdf`
//! ([`crate::parser::document::LopdfDocument`]); tests use a scripted mock.
//!
//! Every async method is a suspension point. The engine awaits them one at a
//! time and never shares a handle across threads, so the traits carry no
//! `Send` bound.

use async_trait::async_trait;

use crate::types::{OutlineItem, PageId, PdfValue, TextItem};
use crate::TocError;

#[async_trait(?Send)]
pub trait DocumentHandle {
    /// Total number of pages. Zero means the handle is unusable.
    fn page_count(&self) -> usize;

    /// Fetch a page by its 1-based number.
    async fn page(&self, page_number: usize) -> Result<Box<dyn PageHandle>, TocError>;

    /// The native outline, or `None` when the document has no bookmarks.
    async fn outline(&self) -> Result<Option<Vec<OutlineItem>>, TocError>;

    /// Resolve a named destination to its explicit destination array.
    async fn destination(&self, name: &str) -> Result<Option<Vec<PdfValue>>, TocError>;

    /// Zero-based index of the page an indirect reference points at.
    async fn page_index(&self, page_ref: PageId) -> Result<usize, TocError>;
}

#[async_trait(?Send)]
pub trait PageHandle {
    /// Positioned text fragments in content-stream order.
    async fn text_content(&self) -> Result<Vec<TextItem>, TocError>;

    /// Release any per-page resources held by the provider.
    fn cleanup(&self) {}
}
