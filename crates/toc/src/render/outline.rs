use crate::types::TocNode;

/// Walk a node tree depth-first, pairing every node with its depth.
pub fn flatten(nodes: &[TocNode]) -> Vec<(usize, &TocNode)> {
    fn walk<'a>(nodes: &'a [TocNode], depth: usize, out: &mut Vec<(usize, &'a TocNode)>) {
        for node in nodes {
            out.push((depth, node));
            walk(&node.children, depth + 1, out);
        }
    }

    let mut out = Vec::new();
    walk(nodes, 0, &mut out);
    out
}

/// Indented text, two spaces per level, page number after the title.
pub fn to_indented(nodes: &[TocNode]) -> String {
    flatten(nodes)
        .into_iter()
        .map(|(depth, node)| format!("{}{}  [p. {}]", "  ".repeat(depth), node.title, node.page))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Markdown nested list.
pub fn to_markdown(nodes: &[TocNode]) -> String {
    flatten(nodes)
        .into_iter()
        .map(|(depth, node)| {
            format!(
                "{}* {} (p. {})",
                "  ".repeat(depth),
                escape_markdown(&node.title),
                node.page
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape Markdown special characters in text.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}
