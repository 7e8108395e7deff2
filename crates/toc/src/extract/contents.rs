//! Mining a printed "Contents" page for `(title, page)` entries.

use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;

use super::lines::reconstruct_lines;
use super::normalize::{dedup_by_title, has_title_length, is_numeric_only};
use super::pages::read_page_text;
use crate::config::{ContentsConfig, ExtractionConfig};
use crate::handle::DocumentHandle;
use crate::render::cleanup::clean_title;
use crate::types::{IdAllocator, TocNode, TocSource};
use crate::TocError;

const LEADER: &str = r"(?:\s*[.·…_]{2,}\s*|\s+)";

struct EntryPattern {
    name: &'static str,
    regex: Regex,
}

/// Line shapes in priority order. The first one that matches decides the line.
fn entry_patterns() -> &'static [EntryPattern] {
    static PATTERNS: OnceLock<Vec<EntryPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let pattern = |name, body: String| EntryPattern {
            name,
            regex: Regex::new(&body).unwrap(),
        };
        vec![
            pattern(
                "chapter",
                format!(
                    r"(?i)^((?:chapter|chap\.|part|unit|lesson)\s*(?:\d+|[ivxlcdm]+)\b[:.]?.*?|第\s*\d+\s*章.*?){LEADER}(\d{{1,4}})$"
                ),
            ),
            pattern(
                "numbered",
                format!(r"^(\d{{1,3}}\.\s+.+?){LEADER}(\d{{1,4}})$"),
            ),
            pattern(
                "subsection",
                format!(r"^(\d{{1,3}}(?:\.\d{{1,3}})+\.?\s+.+?){LEADER}(\d{{1,4}})$"),
            ),
            pattern(
                "leader",
                r"^(.+?)\s*[.·…_]{3,}\s*(\d{1,4})$".to_string(),
            ),
            pattern("trailing-number", r"^(.+?)\s+(\d{1,4})$".to_string()),
        ]
    })
}

/// Whether the page text reads like a table of contents.
fn looks_like_contents(text: &str) -> bool {
    let lower = text.to_lowercase();

    static RE_WORDS: OnceLock<Regex> = OnceLock::new();
    let re_words = RE_WORDS.get_or_init(|| {
        Regex::new(
            r"\b(?:table\s+of\s+contents|contents|index|inhaltsverzeichnis|inhalt|sommaire|table\s+des\s+matières|índice|contenido|содержание|оглавление)\b",
        )
        .unwrap()
    });
    if re_words.is_match(&lower) || ["目录", "目次", "목차"].iter().any(|w| lower.contains(w)) {
        return true;
    }

    static RE_REPEATED: OnceLock<Regex> = OnceLock::new();
    let re_repeated =
        RE_REPEATED.get_or_init(|| Regex::new(r"(?:chapter|section)\s+\d+").unwrap());
    if re_repeated.find_iter(&lower).nth(1).is_some() {
        return true;
    }

    static RE_LEADER: OnceLock<Regex> = OnceLock::new();
    let re_leader = RE_LEADER.get_or_init(|| Regex::new(r"\.{3,}\s*\d+").unwrap());
    re_leader.is_match(&lower)
}

/// Trim leading bullets and dots and any trailing leader from a label.
fn trim_label(label: &str) -> String {
    static RE_EDGES: OnceLock<Regex> = OnceLock::new();
    let re_edges = RE_EDGES.get_or_init(|| {
        Regex::new(r"^[\s.·…_\-–—•:;,]+|[\s.·…_\-–—:;,]+$").unwrap()
    });
    re_edges.replace_all(&clean_title(label), "").into_owned()
}

/// Parse one reconstructed line into a `(title, page)` entry.
fn parse_entry(line: &str, total_pages: usize, settings: &ContentsConfig) -> Option<(String, usize)> {
    let line = line.trim();
    let (pattern, caps) = entry_patterns()
        .iter()
        .find_map(|p| p.regex.captures(line).map(|caps| (p, caps)))?;

    let title = trim_label(&caps[1]);
    let page: usize = caps[2].parse().ok()?;
    trace!("{:?} matched the {} pattern", line, pattern.name);

    let accepted = has_title_length(&title, settings.min_title_len, settings.max_title_len)
        && !is_numeric_only(&title)
        && (1..=total_pages).contains(&page);
    accepted.then_some((title, page))
}

/// An accepted contents line and the page it was printed on.
#[derive(Debug, Clone, PartialEq)]
struct ContentsEntry {
    title: String,
    page: usize,
    listed_on: usize,
}

/// Entries from every contents page within the page budget, in reading
/// order.
async fn collect_entries(
    doc: &dyn DocumentHandle,
    config: &ExtractionConfig,
) -> Vec<ContentsEntry> {
    let settings = &config.contents;
    let policy = config.retry.operation();
    let total_pages = doc.page_count();

    let mut entries = Vec::new();
    for page_number in 1..=settings.max_pages.min(total_pages) {
        let items = match read_page_text(doc, page_number, &policy).await {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => continue,
            Err(e) => {
                debug!("Skipping page {}: {}", page_number, e);
                continue;
            }
        };

        let text = items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        if !looks_like_contents(&text) {
            continue;
        }

        for line in reconstruct_lines(&items, settings.line_tolerance) {
            if let Some((title, page)) = parse_entry(&line, total_pages, settings) {
                entries.push(ContentsEntry {
                    title,
                    page,
                    listed_on: page_number,
                });
            }
        }
    }
    entries
}

pub(crate) async fn extract(
    doc: &dyn DocumentHandle,
    config: &ExtractionConfig,
    ids: &IdAllocator,
) -> Result<Vec<TocNode>, TocError> {
    let mut entries = collect_entries(doc, config).await;
    entries.sort_by_key(|entry| entry.page);

    let nodes = entries
        .into_iter()
        .map(|entry| {
            debug!(
                "Contents entry {:?} -> page {} (listed on page {})",
                entry.title, entry.page, entry.listed_on
            );
            TocNode::leaf(ids.allocate(), entry.title, entry.page, TocSource::ContentsPage)
        })
        .collect();

    let mut nodes = dedup_by_title(nodes);
    nodes.truncate(config.contents.max_entries);
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{item, lines, MockDocument};

    fn parse(line: &str) -> Option<(String, usize)> {
        parse_entry(line, 100, &ContentsConfig::default())
    }

    fn entry(title: &str, page: usize) -> Option<(String, usize)> {
        Some((title.to_string(), page))
    }

    #[test]
    fn test_chapter_lines_keep_their_numbering() {
        assert_eq!(parse("Chapter 1 Introduction ..... 5"), entry("Chapter 1 Introduction", 5));
        assert_eq!(parse("CHAPTER 2: Methods 42"), entry("CHAPTER 2: Methods", 42));
        assert_eq!(parse("Part II Applications .... 61"), entry("Part II Applications", 61));
        assert_eq!(parse("第3章 实验结果 …… 27"), entry("第3章 实验结果", 27));
    }

    #[test]
    fn test_numbered_lines() {
        assert_eq!(parse("2. Related Work 14"), entry("2. Related Work", 14));
        assert_eq!(parse("3.2 Datasets ........ 33"), entry("3.2 Datasets", 33));
        assert_eq!(parse("4.1.2 Ablations 40"), entry("4.1.2 Ablations", 40));
    }

    #[test]
    fn test_leader_and_trailing_number_lines() {
        assert_eq!(parse("Bibliography ............ 88"), entry("Bibliography", 88));
        assert_eq!(parse("Introduction....5"), entry("Introduction", 5));
        assert_eq!(parse("introduction   5"), entry("introduction", 5));
        assert_eq!(parse("• Glossary 97"), entry("Glossary", 97));
    }

    #[test]
    fn test_rejected_lines() {
        assert_eq!(parse("Contents"), None);
        assert_eq!(parse("Results .... 500"), None);
        assert_eq!(parse("Ab 5"), None);
        assert_eq!(parse("12 34"), None);
        assert_eq!(parse("Summary 0"), None);
        assert_eq!(parse(&format!("{} 7", "a".repeat(101))), None);
    }

    #[test]
    fn test_contents_indicators() {
        assert!(looks_like_contents("Table of Contents"));
        assert!(looks_like_contents("INHALTSVERZEICHNIS"));
        assert!(looks_like_contents("Table des matières"));
        assert!(looks_like_contents("Содержание"));
        assert!(looks_like_contents("目录"));
        assert!(looks_like_contents("Chapter 1 Basics Chapter 2 More"));
        assert!(looks_like_contents("Preface....... 7"));
        assert!(!looks_like_contents("Chapter 1 begins here. We discuss contentment."));
    }

    async fn run(doc: &MockDocument) -> Vec<TocNode> {
        extract(doc, &ExtractionConfig::default(), &IdAllocator::new())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_contents_page_entries() {
        let doc = MockDocument::new(60).with_page(
            3,
            lines(
                &[
                    "Contents",
                    "Chapter 1 Introduction ..... 5",
                    "Chapter 2 Methods ..... 42",
                ],
                12.0,
            ),
        );
        let nodes = run(&doc).await;
        let got: Vec<_> = nodes.iter().map(|n| (n.title.as_str(), n.page)).collect();
        assert_eq!(got, vec![("Chapter 1 Introduction", 5), ("Chapter 2 Methods", 42)]);
        assert!(nodes
            .iter()
            .all(|n| n.source == TocSource::ContentsPage && n.level == 0 && n.confidence.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_entries_collapse() {
        let doc = MockDocument::new(20).with_page(
            2,
            lines(
                &["Table of Contents", "Introduction....5", "introduction   5", "Methods ..... 9"],
                11.0,
            ),
        );
        let nodes = run(&doc).await;
        let got: Vec<_> = nodes.iter().map(|n| (n.title.as_str(), n.page)).collect();
        assert_eq!(got, vec![("Introduction", 5), ("Methods", 9)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_from_split_runs_sorted_by_page() {
        let doc = MockDocument::new(50)
            .with_page(
                2,
                vec![
                    item("Contents", 16.0, 72.0, 740.0),
                    item("Results", 11.0, 72.0, 700.0),
                    item(".........", 11.0, 200.0, 700.0),
                    item("30", 11.0, 500.0, 700.0),
                    item("Background", 11.0, 72.0, 680.0),
                    item("12", 11.0, 500.0, 681.0),
                ],
            )
            .with_page(3, lines(&["Contents (continued)", "Appendix ..... 8"], 11.0));
        let nodes = run(&doc).await;
        let pages: Vec<_> = nodes.iter().map(|n| n.page).collect();
        assert_eq!(pages, vec![8, 12, 30]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignores_body_pages_and_pages_past_budget() {
        let doc = MockDocument::new(40)
            .with_page(4, lines(&["The study ran for 12", "Results were mixed 14"], 10.0))
            .with_page(16, lines(&["Contents", "Late Chapter ..... 20"], 10.0));
        assert!(run(&doc).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_pages_are_skipped() {
        let doc = MockDocument::new(10)
            .failing_text(1)
            .with_page(2, lines(&["Contents", "Overview ..... 3"], 10.0));
        let nodes = run(&doc).await;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].title, "Overview");
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_capped() {
        let listing: Vec<String> = (1..=40).map(|i| format!("Topic {i} ..... {i}")).collect();
        let mut page = vec!["Contents"];
        page.extend(listing.iter().map(String::as_str));
        let doc = MockDocument::new(50).with_page(1, lines(&page, 9.0));
        let nodes = run(&doc).await;
        assert_eq!(nodes.len(), 30);
        assert_eq!(nodes[29].page, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_remember_their_contents_page() {
        let doc = MockDocument::new(50)
            .with_page(2, lines(&["Contents", "Results ..... 30"], 11.0))
            .with_page(3, lines(&["Contents (continued)", "Appendix ..... 44"], 11.0));

        let entries = collect_entries(&doc, &ExtractionConfig::default()).await;
        let listed: Vec<_> = entries
            .iter()
            .map(|e| (e.title.as_str(), e.page, e.listed_on))
            .collect();
        assert_eq!(listed, vec![("Results", 30, 2), ("Appendix", 44, 3)]);
    }
}
