//! Column detection
//!
//! Partitions a page into vertical bands by clustering fragment left edges:
//! a large horizontal gap between consecutive distinct left positions marks
//! a column boundary. Splits that would produce a column narrower than the
//! configured minimum are discarded.

use crate::backend::TextFragment;
use crate::config::EngineConfig;

/// Vertical band `[x_start, x_end)` on a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub x_start: f32,
    pub x_end: f32,
}

impl Column {
    /// Whether a fragment belongs to this column (by its left edge)
    pub fn contains(&self, fragment: &TextFragment) -> bool {
        fragment.bbox.x0 >= self.x_start && fragment.bbox.x0 < self.x_end
    }
}

/// Detect the column layout of one page
pub fn detect_columns(
    fragments: &[TextFragment],
    page_width: f32,
    cfg: &EngineConfig,
) -> Vec<Column> {
    let full_page = vec![Column {
        x_start: 0.0,
        x_end: page_width,
    }];

    if fragments.is_empty() {
        return full_page;
    }

    // Distinct left edges, rounded to whole layout units
    let mut lefts: Vec<f32> = fragments.iter().map(|f| f.bbox.x0.round()).collect();
    lefts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    lefts.dedup();

    // Candidate boundaries sit in the middle of each qualifying gap
    let mut boundaries: Vec<f32> = Vec::new();
    for window in lefts.windows(2) {
        if window[1] - window[0] >= cfg.column_gap {
            boundaries.push((window[0] + window[1]) / 2.0);
        }
    }

    if boundaries.is_empty() {
        return full_page;
    }

    // Drop boundaries that would leave a too-narrow column
    let mut edges = vec![0.0];
    for b in boundaries {
        if b - edges.last().copied().unwrap_or(0.0) >= cfg.min_column_width
            && page_width - b >= cfg.min_column_width
        {
            edges.push(b);
        }
    }
    edges.push(page_width);

    if edges.len() == 2 {
        return full_page;
    }

    edges
        .windows(2)
        .map(|pair| Column {
            x_start: pair[0],
            x_end: pair[1],
        })
        .collect()
}
