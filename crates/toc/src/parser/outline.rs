//! Outline (bookmark) and destination lookups on a `lopdf::Document`.
//!
//! The outline is returned unresolved, the way a viewer library reports it:
//! each entry keeps its raw destination (a name or an explicit array) and
//! page resolution is left to the caller through [`named_destination`] and
//! [`page_index`].

use std::collections::HashSet;

use lopdf::{Document, Object, ObjectId};

use super::backend::{convert_object, decode_text_simple};
use crate::types::{Destination, OutlineItem, PageId, PdfValue};

/// Outline nesting deeper than this is treated as corrupt and cut off.
const MAX_OUTLINE_DEPTH: usize = 64;

/// Name trees deeper than this are not followed.
const MAX_NAME_TREE_DEPTH: usize = 32;

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a lopdf::Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

fn decode_name_or_string(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) | Object::Name(bytes) => Some(decode_text_simple(bytes)),
        _ => None,
    }
}

/// Read the document outline. `None` when the catalog has no `/Outlines`
/// or the outline has no entries.
pub fn read_outline(doc: &Document) -> Option<Vec<OutlineItem>> {
    let catalog = doc.catalog().ok()?;
    let outlines = resolve_dict(doc, catalog.get(b"Outlines").ok()?)?;
    let first = outlines.get(b"First").ok()?.as_reference().ok()?;

    let mut visited = HashSet::new();
    let items = read_siblings(doc, first, 0, &mut visited);
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Follow a `/First` → `/Next` chain.
fn read_siblings(
    doc: &Document,
    first: ObjectId,
    depth: usize,
    visited: &mut HashSet<ObjectId>,
) -> Vec<OutlineItem> {
    let mut items = Vec::new();
    if depth >= MAX_OUTLINE_DEPTH {
        return items;
    }

    let mut current = Some(first);
    while let Some(id) = current {
        if !visited.insert(id) {
            log::warn!("outline cycle at object {:?}, stopping", id);
            break;
        }
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };

        let title = dict
            .get(b"Title")
            .ok()
            .and_then(|t| resolve(doc, t))
            .and_then(decode_name_or_string);

        let dest = dict
            .get(b"Dest")
            .ok()
            .and_then(|d| parse_destination(doc, d))
            .or_else(|| action_destination(doc, dict));

        let children = match dict.get(b"First").ok().and_then(|f| f.as_reference().ok()) {
            Some(child) => read_siblings(doc, child, depth + 1, visited),
            None => Vec::new(),
        };

        items.push(OutlineItem {
            title,
            dest,
            items: children,
        });

        current = dict.get(b"Next").ok().and_then(|n| n.as_reference().ok());
    }

    items
}

/// Destination of a `/GoTo` action stored under `/A`.
fn action_destination(doc: &Document, item: &lopdf::Dictionary) -> Option<Destination> {
    let action = resolve_dict(doc, item.get(b"A").ok()?)?;
    let kind = action.get(b"S").ok().and_then(|s| s.as_name().ok());
    if kind.is_some_and(|k| k != b"GoTo".as_slice()) {
        return None;
    }
    parse_destination(doc, action.get(b"D").ok()?)
}

fn parse_destination(doc: &Document, obj: &Object) -> Option<Destination> {
    match resolve(doc, obj)? {
        Object::Array(arr) => Some(Destination::Explicit(
            arr.iter().map(convert_object).collect(),
        )),
        Object::Dictionary(dict) => parse_destination(doc, dict.get(b"D").ok()?),
        other => decode_name_or_string(other).map(Destination::Named),
    }
}

/// Explicit destination array registered under `name`, from the `/Names`
/// → `/Dests` name tree or the legacy catalog `/Dests` dictionary.
pub fn named_destination(doc: &Document, name: &str) -> Option<Vec<PdfValue>> {
    let catalog = doc.catalog().ok()?;

    let from_tree = catalog
        .get(b"Names")
        .ok()
        .and_then(|n| resolve_dict(doc, n))
        .and_then(|names| names.get(b"Dests").ok())
        .and_then(|dests| resolve_dict(doc, dests))
        .and_then(|root| search_name_tree(doc, root, name, 0));

    let value = from_tree.or_else(|| {
        let legacy = resolve_dict(doc, catalog.get(b"Dests").ok()?)?;
        legacy.get(name.as_bytes()).ok()
    })?;

    match parse_destination(doc, value)? {
        Destination::Explicit(arr) => Some(arr),
        Destination::Named(_) => None,
    }
}

fn search_name_tree<'a>(
    doc: &'a Document,
    node: &'a lopdf::Dictionary,
    name: &str,
    depth: usize,
) -> Option<&'a Object> {
    if depth > MAX_NAME_TREE_DEPTH {
        return None;
    }

    if let Ok(Object::Array(pairs)) = node.get(b"Names") {
        for pair in pairs.chunks_exact(2) {
            if decode_name_or_string(&pair[0]).as_deref() == Some(name) {
                return Some(&pair[1]);
            }
        }
    }

    if let Ok(Object::Array(kids)) = node.get(b"Kids") {
        for kid in kids {
            if let Some(found) =
                resolve_dict(doc, kid).and_then(|k| search_name_tree(doc, k, name, depth + 1))
            {
                return Some(found);
            }
        }
    }

    None
}

/// Zero-based index of the page object `page_ref`.
pub fn page_index(doc: &Document, page_ref: PageId) -> Option<usize> {
    doc.get_pages()
        .into_iter()
        .find(|(_, id)| *id == page_ref)
        .map(|(number, _)| number as usize - 1)
}
