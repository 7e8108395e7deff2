//! Scripted [`DocumentHandle`] used by the engine's tests.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;

use crate::handle::{DocumentHandle, PageHandle};
use crate::types::{Destination, OutlineItem, PageId, PdfValue, TextItem};
use crate::TocError;

/// A text run in a regular-weight font.
pub(crate) fn item(text: &str, size: f32, x: f32, y: f32) -> TextItem {
    TextItem {
        text: text.to_string(),
        transform: [size, 0.0, 0.0, size, x, y],
        font_name: "Times-Roman".to_string(),
    }
}

/// A text run in a bold font.
pub(crate) fn bold(text: &str, size: f32, x: f32, y: f32) -> TextItem {
    TextItem {
        font_name: "Times-Bold".to_string(),
        ..item(text, size, x, y)
    }
}

/// One run per line, top to bottom, 20 units apart.
pub(crate) fn lines(texts: &[&str], size: f32) -> Vec<TextItem> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| item(text, size, 72.0, 720.0 - 20.0 * i as f32))
        .collect()
}

pub(crate) fn outline_entry(title: &str, dest: Option<Destination>) -> OutlineItem {
    OutlineItem {
        title: Some(title.to_string()),
        dest,
        items: Vec::new(),
    }
}

/// Explicit destination pointing at a page reference.
pub(crate) fn explicit(page_ref: PageId) -> Option<Destination> {
    Some(Destination::Explicit(vec![
        PdfValue::Reference(page_ref),
        PdfValue::Name(b"Fit".to_vec()),
    ]))
}

/// Page object reference used by the mock for zero-based page `index`.
pub(crate) fn page_ref(index: usize) -> PageId {
    (100 + index as u32, 0)
}

#[derive(Default)]
pub(crate) struct MockDocument {
    pages: Vec<Vec<TextItem>>,
    outline: Option<Vec<OutlineItem>>,
    destinations: HashMap<String, Vec<PdfValue>>,
    page_failures: HashMap<usize, Cell<u32>>,
    text_failures: HashSet<usize>,
    outline_error: bool,
    outline_hangs: bool,
    pub page_calls: Cell<usize>,
    pub cleanups: Rc<Cell<usize>>,
}

impl MockDocument {
    /// `page_count` blank pages. Page references follow [`page_ref`].
    pub fn new(page_count: usize) -> Self {
        MockDocument {
            pages: vec![Vec::new(); page_count],
            ..Default::default()
        }
    }

    pub fn with_page(mut self, page_number: usize, items: Vec<TextItem>) -> Self {
        self.pages[page_number - 1] = items;
        self
    }

    pub fn with_outline(mut self, outline: Vec<OutlineItem>) -> Self {
        self.outline = Some(outline);
        self
    }

    pub fn with_destination(mut self, name: &str, dest: Vec<PdfValue>) -> Self {
        self.destinations.insert(name.to_string(), dest);
        self
    }

    /// Reject the first `times` fetches of `page_number`.
    pub fn failing_page(mut self, page_number: usize, times: u32) -> Self {
        self.page_failures.insert(page_number, Cell::new(times));
        self
    }

    /// Every text read of `page_number` fails.
    pub fn failing_text(mut self, page_number: usize) -> Self {
        self.text_failures.insert(page_number);
        self
    }

    pub fn failing_outline(mut self) -> Self {
        self.outline_error = true;
        self
    }

    pub fn hanging_outline(mut self) -> Self {
        self.outline_hangs = true;
        self
    }
}

struct MockPage {
    items: Option<Vec<TextItem>>,
    cleanups: Rc<Cell<usize>>,
}

#[async_trait(?Send)]
impl PageHandle for MockPage {
    async fn text_content(&self) -> Result<Vec<TextItem>, TocError> {
        self.items
            .clone()
            .ok_or_else(|| TocError::Parse("text layer unavailable".into()))
    }

    fn cleanup(&self) {
        self.cleanups.set(self.cleanups.get() + 1);
    }
}

#[async_trait(?Send)]
impl DocumentHandle for MockDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page(&self, page_number: usize) -> Result<Box<dyn PageHandle>, TocError> {
        self.page_calls.set(self.page_calls.get() + 1);

        if let Some(remaining) = self.page_failures.get(&page_number) {
            if remaining.get() > 0 {
                remaining.set(remaining.get() - 1);
                return Err(TocError::Parse(format!("page {page_number} not ready")));
            }
        }

        let items = self
            .pages
            .get(page_number.wrapping_sub(1))
            .ok_or_else(|| TocError::Parse(format!("no page {page_number}")))?;

        Ok(Box::new(MockPage {
            items: (!self.text_failures.contains(&page_number)).then(|| items.clone()),
            cleanups: Rc::clone(&self.cleanups),
        }))
    }

    async fn outline(&self) -> Result<Option<Vec<OutlineItem>>, TocError> {
        if self.outline_hangs {
            std::future::pending::<()>().await;
        }
        if self.outline_error {
            return Err(TocError::Parse("outline unreadable".into()));
        }
        Ok(self.outline.clone())
    }

    async fn destination(&self, name: &str) -> Result<Option<Vec<PdfValue>>, TocError> {
        Ok(self.destinations.get(name).cloned())
    }

    async fn page_index(&self, page_ref: PageId) -> Result<usize, TocError> {
        let index = page_ref.0.checked_sub(100).map(|i| i as usize);
        match index {
            Some(i) if i < self.pages.len() && page_ref.1 == 0 => Ok(i),
            _ => Err(TocError::Resolution(format!("unknown page {:?}", page_ref))),
        }
    }
}
