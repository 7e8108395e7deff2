//! Heading inference from font sizes and weights.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::normalize::{dedup_by_title, is_valid_title};
use super::pages::read_page_text;
use crate::config::{ExtractionConfig, FontConfig, ScoringPolicy};
use crate::handle::DocumentHandle;
use crate::render::cleanup::clean_title;
use crate::types::{IdAllocator, TextItem, TocNode, TocSource};
use crate::TocError;

/// Font-size statistics over the first pages of a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontBaseline {
    pub average: f32,
    /// Largest size seen.
    pub large: f32,
    /// Size at the configured percentile of the descending unique sizes.
    pub medium: f32,
}

impl FontBaseline {
    /// `None` when the sizes are too uniform to tell headings from body text.
    /// Sizes are compared at 0.01 precision.
    pub fn from_sizes(sizes: &[f32], settings: &FontConfig) -> Option<Self> {
        let unique: BTreeSet<i64> = sizes.iter().map(|s| (s * 100.0).round() as i64).collect();
        if unique.len() < settings.min_distinct_sizes.max(1) {
            return None;
        }

        let descending: Vec<f32> = unique.iter().rev().map(|&k| k as f32 / 100.0).collect();
        let medium_index = (descending.len() as f32 * settings.scoring.medium_percentile) as usize;

        Some(FontBaseline {
            average: sizes.iter().sum::<f32>() / sizes.len() as f32,
            large: descending[0],
            medium: descending[medium_index.min(descending.len() - 1)],
        })
    }
}

fn looks_like_heading(text: &str) -> bool {
    static RE_NUMBERED: OnceLock<Regex> = OnceLock::new();
    let re_numbered = RE_NUMBERED
        .get_or_init(|| Regex::new(r"(?i)^(?:chapter|section)\s+\d+|^第\s*\d+\s*章").unwrap());

    static RE_CAPS: OnceLock<Regex> = OnceLock::new();
    let re_caps = RE_CAPS.get_or_init(|| Regex::new(r"^\p{Lu}[\p{Lu}\s]{5,29}$").unwrap());

    re_numbered.is_match(text) || re_caps.is_match(text)
}

impl ScoringPolicy {
    /// Heading confidence of a single text run.
    pub fn score(&self, item: &TextItem, baseline: &FontBaseline) -> f32 {
        let size = item.font_size();
        let mut score = if size >= baseline.large * self.tier_ratio {
            self.large_weight
        } else if size >= baseline.medium * self.tier_ratio {
            self.medium_weight
        } else if size > baseline.average * self.above_average_ratio {
            self.above_average_weight
        } else {
            0.0
        };

        if item.is_bold() {
            score += self.bold_weight;
        }
        if looks_like_heading(item.text.trim()) {
            score += self.pattern_weight;
        }
        score
    }
}

pub(crate) async fn extract(
    doc: &dyn DocumentHandle,
    config: &ExtractionConfig,
    ids: &IdAllocator,
) -> Result<Vec<TocNode>, TocError> {
    let settings = &config.fonts;
    let policy = config.retry.operation();

    let mut pages = Vec::new();
    for page_number in 1..=settings.max_pages.min(doc.page_count()) {
        match read_page_text(doc, page_number, &policy).await {
            Ok(items) => pages.push((page_number, items)),
            Err(e) => debug!("Skipping page {}: {}", page_number, e),
        }
    }

    let sizes: Vec<f32> = pages
        .iter()
        .filter(|(page_number, _)| *page_number <= settings.baseline_pages)
        .flat_map(|(_, items)| items)
        .filter(|item| !item.text.trim().is_empty())
        .map(TextItem::font_size)
        .collect();

    let Some(baseline) = FontBaseline::from_sizes(&sizes, settings) else {
        debug!("Font sizes too uniform for structure detection");
        return Ok(Vec::new());
    };
    debug!("Font baseline: {:?}", baseline);

    let mut nodes = Vec::new();
    for (page_number, items) in &pages {
        for item in items {
            let confidence = settings.scoring.score(item, &baseline);
            if confidence < settings.min_confidence {
                continue;
            }
            let title = clean_title(&item.text);
            if !is_valid_title(&title) {
                continue;
            }
            nodes.push(
                TocNode::leaf(ids.allocate(), title, *page_number, TocSource::TextStructure)
                    .with_confidence(confidence),
            );
        }
    }

    let mut nodes = dedup_by_title(nodes);
    nodes.sort_by(|a, b| {
        a.page.cmp(&b.page).then_with(|| {
            let (a, b) = (a.confidence.unwrap_or(0.0), b.confidence.unwrap_or(0.0));
            b.total_cmp(&a)
        })
    });
    nodes.truncate(settings.max_entries);
    Ok(nodes)
}
