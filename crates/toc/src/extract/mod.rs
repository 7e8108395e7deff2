//! The extraction cascade.
//!
//! Stages run in a fixed order: native bookmarks, a printed contents page,
//! font-size structure, then evenly spaced synthetic sections. The first
//! stage that yields at least one node wins. A stage that fails is logged
//! and counts as empty; only an unusable document is reported to the caller.

mod bookmarks;
mod contents;
mod fallback;
mod fonts;
mod lines;
pub mod normalize;
mod pages;

use log::{debug, info, warn};

pub use fonts::FontBaseline;
pub use lines::reconstruct_lines;

use crate::config::ExtractionConfig;
use crate::handle::DocumentHandle;
use crate::types::{IdAllocator, TocNode, TocSource};
use crate::TocError;

/// Recover a table of contents from `doc`.
///
/// Fails with [`TocError::InvalidDocument`] when the document has no pages or
/// page 1 cannot be fetched after every retry. Otherwise the result is never
/// empty.
pub async fn extract_table_of_contents(
    doc: &dyn DocumentHandle,
    config: &ExtractionConfig,
) -> Result<Vec<TocNode>, TocError> {
    let total_pages = ensure_ready(doc, config).await?;
    let ids = IdAllocator::new();

    for source in TocSource::CASCADE {
        let nodes = run_guarded(doc, source, config, &ids).await;
        if !nodes.is_empty() {
            info!(
                "Extracted {} entries from {} ({} pages)",
                nodes.len(),
                source,
                total_pages
            );
            return Ok(nodes);
        }
        debug!("Stage {} produced nothing", source);
    }

    // The synthetic stage always yields at least `min_sections` nodes.
    Err(TocError::InvalidDocument(
        "no stage produced a table of contents".into(),
    ))
}

/// Run a single stage, after the same readiness check as the full cascade.
///
/// Stage failures are logged and reported as an empty result.
pub async fn run_stage(
    doc: &dyn DocumentHandle,
    source: TocSource,
    config: &ExtractionConfig,
) -> Result<Vec<TocNode>, TocError> {
    ensure_ready(doc, config).await?;
    let ids = IdAllocator::new();
    Ok(run_guarded(doc, source, config, &ids).await)
}

/// Wait for the document to settle and make sure page 1 can be fetched.
/// Returns the page count.
async fn ensure_ready(doc: &dyn DocumentHandle, config: &ExtractionConfig) -> Result<usize, TocError> {
    let total_pages = doc.page_count();
    if total_pages == 0 {
        return Err(TocError::InvalidDocument("document has no pages".into()));
    }

    tokio::time::sleep(config.settle_delay()).await;

    let policy = config.retry.operation();
    let page = policy
        .run("page 1", || doc.page(1))
        .await
        .map_err(|e| TocError::InvalidDocument(format!("page 1 is not available: {e}")))?;

    match policy.run("text content of page 1", || page.text_content()).await {
        Ok(items) => debug!("Page 1 has {} text runs", items.len()),
        Err(e) => warn!("Page 1 text is not readable yet: {}", e),
    }
    page.cleanup();

    Ok(total_pages)
}

async fn run_guarded(
    doc: &dyn DocumentHandle,
    source: TocSource,
    config: &ExtractionConfig,
    ids: &IdAllocator,
) -> Vec<TocNode> {
    let result = match source {
        TocSource::Bookmark => bookmarks::extract(doc, config, ids).await,
        TocSource::ContentsPage => contents::extract(doc, config, ids).await,
        TocSource::TextStructure => fonts::extract(doc, config, ids).await,
        TocSource::BasicStructure => Ok(fallback::synthesize(doc, config, ids).await),
    };

    match result {
        Ok(nodes) => normalize::retain_valid_pages(nodes, doc.page_count()),
        Err(e) => {
            warn!("Stage {} failed: {}", source, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::testing::{bold, explicit, item, lines, outline_entry, page_ref, MockDocument};

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    fn titles_and_pages(nodes: &[TocNode]) -> Vec<(&str, usize)> {
        nodes.iter().map(|n| (n.title.as_str(), n.page)).collect()
    }

    fn contents_page() -> Vec<crate::types::TextItem> {
        lines(
            &[
                "Contents",
                "Chapter 1 Introduction ..... 5",
                "Chapter 2 Methods ..... 42",
            ],
            12.0,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_bookmarks_win() {
        let doc = MockDocument::new(12)
            .with_outline(vec![
                outline_entry("Introduction", explicit(page_ref(0))),
                outline_entry("Methods", explicit(page_ref(9))),
            ])
            .with_page(2, contents_page());

        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(titles_and_pages(&nodes), vec![("Introduction", 1), ("Methods", 10)]);
        assert!(nodes.iter().all(|n| n.source == TocSource::Bookmark));
        // Only the readiness check touched a page; later stages never ran.
        assert_eq!(doc.page_calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contents_page_when_no_bookmarks() {
        let doc = MockDocument::new(60).with_page(3, contents_page());
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(
            titles_and_pages(&nodes),
            vec![("Chapter 1 Introduction", 5), ("Chapter 2 Methods", 42)]
        );
        assert!(nodes.iter().all(|n| n.source == TocSource::ContentsPage));
    }

    #[tokio::test(start_paused = true)]
    async fn test_font_structure_when_no_contents_page() {
        let mut doc = MockDocument::new(10);
        for page in 1..=5 {
            let mut items = vec![
                item("Plain body text", 10.0, 72.0, 600.0),
                item("More body text", 10.0, 72.0, 586.0),
            ];
            if page == 2 {
                items.push(item("Figure caption", 12.0, 72.0, 400.0));
            }
            if page % 2 == 1 {
                items.push(bold(&format!("Heading {page}"), 18.0, 72.0, 700.0));
            }
            doc = doc.with_page(page, items);
        }

        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(
            titles_and_pages(&nodes),
            vec![("Heading 1", 1), ("Heading 3", 3), ("Heading 5", 5)]
        );
        assert!(nodes
            .iter()
            .all(|n| n.source == TocSource::TextStructure && n.level == 0 && n.confidence.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_always_answers() {
        let doc = MockDocument::new(60);
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        let pages: Vec<_> = nodes.iter().map(|n| n.page).collect();
        assert_eq!(pages, vec![1, 21, 41]);
        assert!(nodes.iter().all(|n| n.source == TocSource::BasicStructure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_page_document() {
        let doc = MockDocument::new(1);
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.page == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_document_is_invalid() {
        let doc = MockDocument::new(0);
        let err = extract_table_of_contents(&doc, &config()).await.unwrap_err();
        assert!(matches!(err, TocError::InvalidDocument(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_one_rejected_every_attempt_is_invalid() {
        let doc = MockDocument::new(10).failing_page(1, 3);
        let err = extract_table_of_contents(&doc, &config()).await.unwrap_err();
        assert!(matches!(err, TocError::InvalidDocument(_)));
        assert_eq!(doc.page_calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_one_recovering_on_last_attempt() {
        let doc = MockDocument::new(10).failing_page(1, 2);
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert!(!nodes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_first_page_text_is_tolerated() {
        let doc = MockDocument::new(40).failing_text(1);
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(nodes[0].title, "Section 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_outline_falls_through() {
        let doc = MockDocument::new(60)
            .failing_outline()
            .with_page(3, contents_page());
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(nodes[0].source, TocSource::ContentsPage);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_outline_times_out() {
        let doc = MockDocument::new(60).hanging_outline();
        let start = Instant::now();
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(nodes[0].source, TocSource::BasicStructure);
        // Three 5 s attempts with 200 ms and 400 ms pauses, after the settle delay.
        assert!(start.elapsed() >= Duration::from_millis(300 + 15_000 + 600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_are_released() {
        let doc = MockDocument::new(30);
        extract_table_of_contents(&doc, &config()).await.unwrap();
        assert_eq!(doc.cleanups.get(), doc.page_calls.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stage_runs_only_that_stage() {
        let doc = MockDocument::new(60).with_page(3, contents_page());

        let bookmarks = run_stage(&doc, TocSource::Bookmark, &config()).await.unwrap();
        assert!(bookmarks.is_empty());

        let fallback = run_stage(&doc, TocSource::BasicStructure, &config()).await.unwrap();
        assert_eq!(fallback.len(), 3);

        let contents = run_stage(&doc, TocSource::ContentsPage, &config()).await.unwrap();
        assert_eq!(contents.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ids_unique_within_run() {
        let doc = MockDocument::new(120);
        let nodes = extract_table_of_contents(&doc, &config()).await.unwrap();
        let mut ids: Vec<_> = nodes.iter().map(|n| n.id.clone()).collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids.dedup();
        assert_eq!(ids.len(), nodes.len());
    }
}
