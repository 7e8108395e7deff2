use std::collections::HashSet;

use log::debug;

use super::lines::reconstruct_lines;
use super::normalize::{is_valid_title, normalized_key};
use super::pages::read_page_text;
use crate::config::{ExtractionConfig, FallbackConfig};
use crate::handle::DocumentHandle;
use crate::render::cleanup::clean_title;
use crate::types::{IdAllocator, TocNode, TocSource};

/// Number of evenly spaced sections for a document of `total_pages`.
pub(crate) fn section_count(total_pages: usize, settings: &FallbackConfig) -> usize {
    (total_pages / settings.pages_per_section)
        .max(settings.min_sections)
        .min(settings.max_sections)
}

/// First page of section `index`, clamped to the document.
pub(crate) fn section_start(index: usize, count: usize, total_pages: usize) -> usize {
    (index * total_pages / count + 1).clamp(1, total_pages.max(1))
}

/// Evenly spaced sections labelled from the top of their first page.
/// Never fails: unreadable pages get a numbered label.
pub(crate) async fn synthesize(
    doc: &dyn DocumentHandle,
    config: &ExtractionConfig,
    ids: &IdAllocator,
) -> Vec<TocNode> {
    let settings = &config.fallback;
    let policy = config.retry.operation();
    let total_pages = doc.page_count();
    let count = section_count(total_pages, settings);

    let mut used = HashSet::new();
    let mut nodes = Vec::with_capacity(count);
    for index in 0..count {
        let page = section_start(index, count, total_pages);

        let candidates = match read_page_text(doc, page, &policy).await {
            Ok(items) => reconstruct_lines(&items, config.contents.line_tolerance),
            Err(e) => {
                debug!("No label for section {}: {}", index + 1, e);
                Vec::new()
            }
        };

        // A label already used is most likely a running header.
        let label = candidates
            .iter()
            .take(settings.probe_lines)
            .map(|line| clean_title(line).chars().take(settings.max_label_len).collect::<String>())
            .map(|label| label.trim().to_string())
            .find(|label| is_valid_title(label) && !used.contains(&normalized_key(label)));

        let title = match label {
            Some(label) => {
                used.insert(normalized_key(&label));
                label
            }
            None => format!("Section {}", index + 1),
        };
        nodes.push(TocNode::leaf(ids.allocate(), title, page, TocSource::BasicStructure));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{lines, MockDocument};

    #[test]
    fn test_section_count_bounds() {
        let settings = FallbackConfig::default();
        assert_eq!(section_count(1, &settings), 2);
        assert_eq!(section_count(60, &settings), 3);
        assert_eq!(section_count(100, &settings), 5);
        assert_eq!(section_count(1000, &settings), 6);
    }

    #[test]
    fn test_section_starts() {
        let starts: Vec<_> = (0..3).map(|i| section_start(i, 3, 60)).collect();
        assert_eq!(starts, vec![1, 21, 41]);
        assert_eq!(section_start(1, 2, 1), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_document_gets_numbered_sections() {
        let doc = MockDocument::new(60);
        let nodes = synthesize(&doc, &ExtractionConfig::default(), &IdAllocator::new()).await;
        let got: Vec<_> = nodes.iter().map(|n| (n.title.as_str(), n.page)).collect();
        assert_eq!(got, vec![("Section 1", 1), ("Section 2", 21), ("Section 3", 41)]);
        assert!(nodes
            .iter()
            .all(|n| n.source == TocSource::BasicStructure && n.level == 0 && n.confidence.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_labels_taken_from_top_lines() {
        let long = "A".repeat(10) + &" word".repeat(20);
        let doc = MockDocument::new(40)
            .with_page(1, lines(&["12", "Getting Started", "body"], 11.0))
            .with_page(21, lines(&[&long], 11.0));
        let nodes = synthesize(&doc, &ExtractionConfig::default(), &IdAllocator::new()).await;
        assert_eq!(nodes[0].title, "Getting Started");
        assert_eq!(nodes[1].title.chars().count(), 60);
        assert_eq!(nodes[1].page, 21);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_header_not_reused_and_failures_tolerated() {
        let doc = MockDocument::new(60)
            .with_page(1, lines(&["Field Guide to Birds", "Owls"], 11.0))
            .with_page(21, lines(&["Field Guide to Birds", "Page 21", "Herons"], 11.0))
            .failing_page(41, 10);
        let nodes = synthesize(&doc, &ExtractionConfig::default(), &IdAllocator::new()).await;
        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Field Guide to Birds", "Herons", "Section 3"]);
    }
}
