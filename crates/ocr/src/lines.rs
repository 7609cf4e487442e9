//! Grouping of positioned fragments into visual lines.
//!
//! Clustering is greedy: each fragment joins the first existing bucket whose running
//! y-estimate is within tolerance, in input order. The result depends on fragment
//! order and is not a globally optimal segmentation, but it is deterministic for the
//! same OCR output.

use crate::types::{TextFragment, YAxis};

struct LineBucket<'a> {
    y_estimate: f64,
    fragments: Vec<(f64, &'a str)>,
}

/// Reconstruct top-to-bottom text lines from unordered fragments.
pub fn reconstruct_lines(fragments: &[TextFragment], tolerance: f64, axis: YAxis) -> Vec<String> {
    let mut buckets: Vec<LineBucket<'_>> = Vec::new();

    for fragment in fragments {
        let y = fragment.y_center;
        match buckets
            .iter_mut()
            .find(|b| (b.y_estimate - y).abs() < tolerance)
        {
            Some(bucket) => {
                bucket.fragments.push((fragment.x_center, fragment.text.as_str()));
                bucket.y_estimate = (bucket.y_estimate + y) / 2.0;
            }
            None => buckets.push(LineBucket {
                y_estimate: y,
                fragments: vec![(fragment.x_center, fragment.text.as_str())],
            }),
        }
    }

    match axis {
        YAxis::BottomUp => buckets.sort_by(|a, b| b.y_estimate.total_cmp(&a.y_estimate)),
        YAxis::TopDown => buckets.sort_by(|a, b| a.y_estimate.total_cmp(&b.y_estimate)),
    }

    buckets
        .into_iter()
        .filter_map(|mut bucket| {
            bucket.fragments.sort_by(|a, b| a.0.total_cmp(&b.0));
            let joined = bucket
                .fragments
                .iter()
                .map(|(_, text)| *text)
                .collect::<Vec<_>>()
                .join(" ");
            let line = collapse_whitespace(&joined);
            (!line.is_empty()).then_some(line)
        })
        .collect()
}

/// Collapse whitespace runs (tabs included) to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
