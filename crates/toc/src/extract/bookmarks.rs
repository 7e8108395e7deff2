//! Native outline (bookmarks) to TOC nodes.

use std::sync::OnceLock;

use futures::future::{FutureExt, LocalBoxFuture};
use log::debug;
use regex::Regex;

use super::normalize::{has_title_length, is_numeric_only};
use crate::config::ExtractionConfig;
use crate::handle::DocumentHandle;
use crate::render::cleanup::clean_title;
use crate::retry::RetryPolicy;
use crate::types::{Destination, IdAllocator, OutlineItem, PdfValue, TocNode, TocSource};
use crate::TocError;

pub(crate) async fn extract(
    doc: &dyn DocumentHandle,
    config: &ExtractionConfig,
    ids: &IdAllocator,
) -> Result<Vec<TocNode>, TocError> {
    let outline = config
        .retry
        .outline()
        .run("outline", || doc.outline())
        .await?;

    let Some(items) = outline else {
        debug!("Document has no outline");
        return Ok(Vec::new());
    };

    let converter = Converter {
        doc,
        config,
        policy: config.retry.operation(),
        ids,
        total_pages: doc.page_count(),
    };
    Ok(converter.convert(&items, 0).await)
}

struct Converter<'a> {
    doc: &'a dyn DocumentHandle,
    config: &'a ExtractionConfig,
    policy: RetryPolicy,
    ids: &'a IdAllocator,
    total_pages: usize,
}

impl<'a> Converter<'a> {
    fn convert(&'a self, items: &'a [OutlineItem], level: u8) -> LocalBoxFuture<'a, Vec<TocNode>> {
        async move {
            let bounds = &self.config.bookmarks;
            if level >= bounds.max_depth {
                return Vec::new();
            }

            let mut nodes = Vec::new();
            for item in items.iter().take(bounds.max_siblings) {
                let Some(title) = item.title.as_deref().map(clean_title) else {
                    continue;
                };
                if !has_title_length(&title, bounds.min_title_len, bounds.max_title_len)
                    || is_numeric_only(&title)
                {
                    debug!("Skipping bookmark {:?}", title);
                    continue;
                }

                let page = self.resolve_page(item.dest.as_ref(), &title).await;
                let children = if item.items.is_empty() {
                    Vec::new()
                } else {
                    self.convert(&item.items, level + 1).await
                };

                let mut node = TocNode::leaf(self.ids.allocate(), title, page, TocSource::Bookmark);
                node.level = level;
                node.children = children;
                nodes.push(node);
            }
            nodes
        }
        .boxed_local()
    }

    /// 1-based page for an entry, falling back to a page number at the end
    /// of the title, then to page 1.
    async fn resolve_page(&self, dest: Option<&Destination>, title: &str) -> usize {
        match self.destination_page(dest).await {
            Ok(Some(page)) if (1..=self.total_pages).contains(&page) => return page,
            Ok(Some(page)) => debug!("Bookmark {:?} points at page {} of {}", title, page, self.total_pages),
            Ok(None) => debug!("Bookmark {:?} has no usable destination", title),
            Err(e) => debug!("Bookmark {:?} could not be resolved: {}", title, e),
        }
        page_from_title(title, self.total_pages).unwrap_or(1)
    }

    async fn destination_page(&self, dest: Option<&Destination>) -> Result<Option<usize>, TocError> {
        let explicit = match dest {
            None => return Ok(None),
            Some(Destination::Explicit(array)) => array.clone(),
            Some(Destination::Named(name)) => {
                let resolved = self
                    .policy
                    .run("named destination", || self.doc.destination(name))
                    .await?;
                match resolved {
                    Some(array) => array,
                    None => return Ok(None),
                }
            }
        };

        match explicit.first() {
            Some(PdfValue::Reference(page_ref)) => {
                let page_ref = *page_ref;
                let index = self
                    .policy
                    .run("page index", || self.doc.page_index(page_ref))
                    .await?;
                Ok(Some(index + 1))
            }
            Some(PdfValue::Integer(index)) if *index >= 0 => Ok(Some(*index as usize + 1)),
            _ => Ok(None),
        }
    }
}

/// A trailing integer in `title` that is a valid page number.
fn page_from_title(title: &str, total_pages: usize) -> Option<usize> {
    static RE_TRAILING: OnceLock<Regex> = OnceLock::new();
    let re = RE_TRAILING.get_or_init(|| Regex::new(r"(\d{1,5})\W*$").unwrap());
    re.captures(title)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|page| (1..=total_pages).contains(page))
}
