use std::collections::BTreeMap;

use crate::types::TextItem;

/// Group text runs into reading-order lines.
///
/// Runs whose baselines round to the same `y / tolerance` bucket share a line.
/// Lines come out top to bottom (descending `y`), runs within a line left to
/// right, joined by a single space.
pub fn reconstruct_lines(items: &[TextItem], tolerance: f32) -> Vec<String> {
    let mut buckets: BTreeMap<i64, Vec<&TextItem>> = BTreeMap::new();
    for item in items {
        if item.text.trim().is_empty() {
            continue;
        }
        let bucket = (item.y() / tolerance).round() as i64;
        buckets.entry(bucket).or_default().push(item);
    }

    buckets
        .into_values()
        .rev()
        .map(|mut runs| {
            runs.sort_by(|a, b| a.x().total_cmp(&b.x()));
            runs.iter()
                .flat_map(|run| run.text.split_whitespace())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
