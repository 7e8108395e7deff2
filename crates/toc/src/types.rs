use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An indirect object reference mirroring `lopdf::ObjectId`: (object number,
/// generation number). Page references in destinations use this shape.
pub type PageId = (u32, u16);

/// A simplified, lopdf-independent representation of a PDF value.
///
/// This enum decouples the extraction engine from the concrete
/// `lopdf::Object` type so that destination arrays and content-stream
/// operands can be handled as plain data.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

// ---------------------------------------------------------------------------
// TOC nodes
// ---------------------------------------------------------------------------

/// Opaque node identifier. Allocated in extraction order, not stable across
/// runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out [`NodeId`]s for a single extraction run.
///
/// Every run gets a random prefix so ids from different runs never collide;
/// within a run ids follow allocation order.
#[derive(Debug)]
pub struct IdAllocator {
    run: u32,
    next: Cell<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            run: rand::random(),
            next: Cell::new(0),
        }
    }

    pub fn allocate(&self) -> NodeId {
        let seq = self.next.get();
        self.next.set(seq + 1);
        NodeId(format!("toc-{:08x}-{}", self.run, seq))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// The pipeline stage that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TocSource {
    Bookmark,
    ContentsPage,
    TextStructure,
    BasicStructure,
}

impl TocSource {
    /// Stages in cascade order.
    pub const CASCADE: [TocSource; 4] = [
        TocSource::Bookmark,
        TocSource::ContentsPage,
        TocSource::TextStructure,
        TocSource::BasicStructure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TocSource::Bookmark => "bookmark",
            TocSource::ContentsPage => "contents-page",
            TocSource::TextStructure => "text-structure",
            TocSource::BasicStructure => "basic-structure",
        }
    }
}

impl fmt::Display for TocSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TocSource {
    type Err = InvalidTocSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TocSource::CASCADE
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or(InvalidTocSource)
    }
}

/// A single table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocNode {
    pub id: NodeId,
    pub title: String,
    /// 1-based page number, always within the document's page range.
    pub page: usize,
    pub level: u8,
    pub children: Vec<TocNode>,
    pub source: TocSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl TocNode {
    /// A top-level leaf node.
    pub fn leaf(id: NodeId, title: impl Into<String>, page: usize, source: TocSource) -> Self {
        TocNode {
            id,
            title: title.into(),
            page,
            level: 0,
            children: Vec::new(),
            source,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TocNode::subtree_len).sum::<usize>()
    }
}

// ---------------------------------------------------------------------------
// Document handle data
// ---------------------------------------------------------------------------

/// A positioned run of text as reported by a page's text content.
///
/// `transform` follows the pdf.js convention: `[a, b, c, d, e, f]` where
/// `a`..`d` already include the font size and `e`, `f` are the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub transform: [f32; 6],
    pub font_name: String,
}

impl TextItem {
    pub fn x(&self) -> f32 {
        self.transform[4]
    }

    pub fn y(&self) -> f32 {
        self.transform[5]
    }

    /// Glyph size taken from the horizontal scale component.
    pub fn font_size(&self) -> f32 {
        self.transform[0].abs()
    }

    pub fn is_bold(&self) -> bool {
        let lower = self.font_name.to_lowercase();
        lower.contains("bold") || lower.contains("black") || lower.contains("heavy")
    }
}

/// Where an outline entry points.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// A named destination that must be looked up through the document.
    Named(String),
    /// An explicit destination array, `[page, /Fit, ...]`.
    Explicit(Vec<PdfValue>),
}

/// One entry of the document's native outline (bookmarks).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutlineItem {
    pub title: Option<String>,
    pub dest: Option<Destination>,
    pub items: Vec<OutlineItem>,
}

#[derive(Debug, Error)]
#[error("Unknown stage (expected bookmark, contents-page, text-structure or basic-structure)")]
pub struct InvalidTocSource;
