use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;

use super::backend::{decode_ops, LopdfBackend, PdfBackend};
use super::{content, offload, outline};
use crate::handle::{DocumentHandle, PageHandle};
use crate::types::{OutlineItem, PageId, PdfValue, TextItem};
use crate::TocError;

/// [`DocumentHandle`] over a parsed `lopdf` document.
pub struct LopdfDocument {
    backend: Rc<LopdfBackend>,
    pages: BTreeMap<u32, PageId>,
}

impl LopdfDocument {
    pub fn new(backend: LopdfBackend) -> Self {
        let pages = backend.pages();
        LopdfDocument {
            backend: Rc::new(backend),
            pages,
        }
    }
}

struct LopdfPage {
    backend: Rc<LopdfBackend>,
    page_id: PageId,
}

#[async_trait(?Send)]
impl PageHandle for LopdfPage {
    async fn text_content(&self) -> Result<Vec<TextItem>, TocError> {
        let raw = self.backend.page_content(self.page_id)?;
        let ops = offload(move || decode_ops(&raw)).await?;
        Ok(content::items_from_ops(
            self.backend.as_ref(),
            self.page_id,
            &ops,
        ))
    }
}

#[async_trait(?Send)]
impl DocumentHandle for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page(&self, page_number: usize) -> Result<Box<dyn PageHandle>, TocError> {
        let page_id = u32::try_from(page_number)
            .ok()
            .and_then(|n| self.pages.get(&n))
            .copied()
            .ok_or_else(|| {
                TocError::Parse(format!(
                    "page {} out of range (document has {})",
                    page_number,
                    self.pages.len()
                ))
            })?;

        Ok(Box::new(LopdfPage {
            backend: Rc::clone(&self.backend),
            page_id,
        }))
    }

    async fn outline(&self) -> Result<Option<Vec<OutlineItem>>, TocError> {
        Ok(outline::read_outline(self.backend.raw_doc()))
    }

    async fn destination(&self, name: &str) -> Result<Option<Vec<PdfValue>>, TocError> {
        Ok(outline::named_destination(self.backend.raw_doc(), name))
    }

    async fn page_index(&self, page_ref: PageId) -> Result<usize, TocError> {
        outline::page_index(self.backend.raw_doc(), page_ref).ok_or_else(|| {
            TocError::Resolution(format!(
                "object {} {} R is not a page",
                page_ref.0, page_ref.1
            ))
        })
    }
}
