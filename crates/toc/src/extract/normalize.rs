//! Title filters, the dedup key, and page validation shared by every stage.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::types::TocNode;

/// Lowercased, NFKC-folded, punctuation-free, whitespace-collapsed form of a
/// title. Two titles with the same key are the same entry.
pub fn normalized_key(title: &str) -> String {
    let folded: String = title
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the text is digits, optionally grouped by dots or spaces.
pub fn is_numeric_only(text: &str) -> bool {
    static RE_NUMERIC: OnceLock<Regex> = OnceLock::new();
    let re = RE_NUMERIC.get_or_init(|| Regex::new(r"^\d+(?:[.\s]+\d+)*\.?$").unwrap());
    re.is_match(text.trim())
}

/// Length check on the trimmed title, in characters.
pub fn has_title_length(title: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&title.trim().chars().count())
}

/// The filter applied to heading candidates and fallback labels.
pub fn is_valid_title(title: &str) -> bool {
    let title = title.trim();
    if !has_title_length(title, 2, 150) || is_numeric_only(title) {
        return false;
    }

    static RE_NOISE: OnceLock<Regex> = OnceLock::new();
    let re_noise = RE_NOISE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            ^(?:page|p\.|pg\.?)\s*\d+(?:\s*(?:of|/)\s*\d+)?$
            | copyright | © | all\ rights\ reserved
            | ^(?:https?://|www\.)\S*$ | \S+\.(?:com|org|net|edu|gov|io)(?:/\S*)?$
            | ^blank(?:\s+page)?$ | intentionally\s+(?:left\s+)?blank
            | ^[\p{P}\p{S}\s]+$
            ",
        )
        .unwrap()
    });
    if re_noise.is_match(title) {
        return false;
    }

    static RE_LETTERS: OnceLock<Regex> = OnceLock::new();
    let re_letters = RE_LETTERS.get_or_init(|| Regex::new(r"\p{L}{2,}").unwrap());
    re_letters.is_match(title)
}

/// Collapse nodes whose titles share a [`normalized_key`].
///
/// The surviving node keeps the position of the first occurrence; a later
/// duplicate replaces it only when it carries a strictly higher confidence.
pub fn dedup_by_title(nodes: Vec<TocNode>) -> Vec<TocNode> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<TocNode> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let key = normalized_key(&node.title);
        match seen.get(&key) {
            Some(&index) => {
                let kept = out[index].confidence.unwrap_or(0.0);
                if node.confidence.unwrap_or(0.0) > kept {
                    out[index] = node;
                }
            }
            None => {
                seen.insert(key, out.len());
                out.push(node);
            }
        }
    }

    out
}

/// Drop nodes (and their subtrees) whose page falls outside `1..=total_pages`.
pub fn retain_valid_pages(nodes: Vec<TocNode>, total_pages: usize) -> Vec<TocNode> {
    nodes
        .into_iter()
        .filter(|node| (1..=total_pages).contains(&node.page))
        .map(|mut node| {
            node.children = retain_valid_pages(std::mem::take(&mut node.children), total_pages);
            node
        })
        .collect()
}
