//! Question region building
//!
//! Turns a column's ordered markers into crop rectangles and fragment sets.
//! A region runs from its marker down to the next marker (or the page
//! bottom), trimmed so consecutive regions never overlap, except for the
//! side-by-side sub-case where two markers share a baseline and both regions
//! run to the page bottom with a horizontal split.
//!
//! `SegmentState` is the run's id accumulator: ids are handed out once per
//! accepted region, in discovery order, and never reused.

use crate::backend::{PageSize, Rect, TextFragment};
use crate::config::EngineConfig;
use crate::segment::columns::Column;
use crate::segment::markers::QuestionMarker;
use tracing::warn;

/// Per-run accumulator for globally unique, order-stable question ids
#[derive(Debug, Default)]
pub struct SegmentState {
    next_id: u32,
}

impl SegmentState {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

/// One segmented question: identity, geometry, and owned fragments
#[derive(Debug, Clone)]
pub struct QuestionBoundary {
    /// Globally unique, strictly increasing in scan order
    pub unique_id: u32,
    /// Document-local question number
    pub pdf_number: u32,
    /// Zero-based page index
    pub page: u32,
    /// Index of the owning column on its page
    pub column_index: usize,
    /// Crop rectangle, padded and clamped
    pub crop: Rect,
    /// Fragments whose top edge falls inside the region, in reading order
    pub fragments: Vec<TextFragment>,
}

/// Vertical span plus optional horizontal cap for one marker
struct RegionSpan {
    start_y: f32,
    end_y: f32,
    x_cap: Option<f32>,
    side_by_side: bool,
}

fn region_span(
    markers: &[QuestionMarker],
    index: usize,
    page_size: &PageSize,
    cfg: &EngineConfig,
) -> RegionSpan {
    let marker = &markers[index];
    let beside_prev = index
        .checked_sub(1)
        .and_then(|i| markers.get(i))
        .is_some_and(|prev| (marker.y - prev.y).abs() < cfg.side_by_side_tolerance);

    match markers.get(index + 1) {
        Some(next) if (next.y - marker.y).abs() < cfg.side_by_side_tolerance => {
            // Side-by-side: both regions reach the page bottom, split on x
            RegionSpan {
                start_y: marker.y,
                end_y: page_size.height,
                x_cap: Some(next.x - cfg.crop_padding),
                side_by_side: true,
            }
        }
        Some(next) => RegionSpan {
            start_y: marker.y,
            end_y: next.y - cfg.region_gap,
            x_cap: None,
            side_by_side: beside_prev,
        },
        None => RegionSpan {
            start_y: marker.y,
            end_y: page_size.height,
            x_cap: None,
            side_by_side: beside_prev,
        },
    }
}

/// Build all question regions for one column of one page
pub fn build_regions(
    state: &mut SegmentState,
    page: u32,
    page_size: &PageSize,
    column_index: usize,
    column: &Column,
    fragments: &[TextFragment],
    markers: &[QuestionMarker],
    cfg: &EngineConfig,
) -> Vec<QuestionBoundary> {
    let mut boundaries = Vec::with_capacity(markers.len());

    for (index, marker) in markers.iter().enumerate() {
        let span = region_span(markers, index, page_size, cfg);

        let mut owned: Vec<TextFragment> = fragments
            .iter()
            .filter(|f| {
                f.bbox.y0 >= span.start_y
                    && f.bbox.y0 < span.end_y
                    && column.contains(f)
                    && span.x_cap.map_or(true, |cap| f.bbox.x0 < cap)
            })
            .cloned()
            .collect();

        owned.sort_by(|a, b| {
            a.bbox
                .y0
                .partial_cmp(&b.bbox.y0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.bbox
                        .x0
                        .partial_cmp(&b.bbox.x0)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        let Some(tight) = owned
            .iter()
            .map(|f| f.bbox)
            .reduce(|acc, b| acc.union(&b))
        else {
            warn!(page, pdf_number = marker.pdf_number, "region owns no fragments, skipped");
            continue;
        };

        let mut crop = tight.padded_within(cfg.crop_padding, page_size.width, page_size.height);

        // Clamp to the column band so the crop never bleeds sideways
        crop.x0 = crop.x0.max(column.x_start);
        crop.x1 = crop.x1.min(column.x_end);
        if let Some(cap) = span.x_cap {
            crop.x1 = crop.x1.min(cap);
        }
        // Keep the region inside its vertical span (plus top padding)
        crop.y0 = crop.y0.max((span.start_y - cfg.crop_padding).max(0.0));
        if span.side_by_side {
            // Both side-by-side regions run to the page bottom independently
            crop.y1 = page_size.height;
        } else {
            crop.y1 = crop.y1.min((span.end_y + cfg.crop_padding).min(page_size.height));
        }

        if crop.width() < cfg.min_region_extent || crop.height() < cfg.min_region_extent {
            warn!(
                page,
                pdf_number = marker.pdf_number,
                width = crop.width(),
                height = crop.height(),
                "degenerate crop region, question skipped"
            );
            continue;
        }

        boundaries.push(QuestionBoundary {
            unique_id: state.next_id(),
            pdf_number: marker.pdf_number,
            page,
            column_index,
            crop,
            fragments: owned,
        });
    }

    trim_overlaps(&mut boundaries);
    boundaries
}

/// Trim consecutive crops so they never vertically overlap; side-by-side
/// pairs are horizontally disjoint and left alone.
fn trim_overlaps(boundaries: &mut [QuestionBoundary]) {
    for i in 1..boundaries.len() {
        let (head, tail) = boundaries.split_at_mut(i);
        let prev = &mut head[i - 1];
        let cur = &tail[0];

        let x_disjoint = prev.crop.x1 <= cur.crop.x0 || cur.crop.x1 <= prev.crop.x0;
        if !x_disjoint && prev.crop.y1 > cur.crop.y0 {
            prev.crop.y1 = cur.crop.y0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page() -> PageSize {
        PageSize {
            width: 595.0,
            height: 842.0,
        }
    }

    fn column() -> Column {
        Column {
            x_start: 0.0,
            x_end: 595.0,
        }
    }

    fn fragment(text: &str, x0: f32, y0: f32) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            bbox: Rect::new(x0, y0, x0 + 180.0, y0 + 12.0),
            font_size: 11.0,
            is_bold: false,
            page: 0,
        }
    }

    fn marker(pdf_number: u32, x: f32, y: f32) -> QuestionMarker {
        QuestionMarker { pdf_number, x, y }
    }

    #[test]
    fn consecutive_regions_do_not_overlap() {
        let fragments = vec![
            fragment("1. Soru metni", 50.0, 100.0),
            fragment("A) bir", 60.0, 130.0),
            fragment("2. Sonraki", 50.0, 400.0),
            fragment("A) iki", 60.0, 430.0),
        ];
        let markers = vec![marker(1, 50.0, 100.0), marker(2, 50.0, 400.0)];
        let mut state = SegmentState::new();

        let regions = build_regions(
            &mut state,
            0,
            &page(),
            0,
            &column(),
            &fragments,
            &markers,
            &EngineConfig::default(),
        );

        assert_eq!(regions.len(), 2);
        assert!(regions[0].crop.y1 <= regions[1].crop.y0 + 10.0);
        assert!(regions[0].crop.y1 < 400.0);
        assert_eq!(regions[0].fragments.len(), 2);
        assert_eq!(regions[1].fragments.len(), 2);
    }

    #[test]
    fn ids_increase_across_calls() {
        let fragments = vec![fragment("1. Bir", 50.0, 100.0)];
        let markers = vec![marker(1, 50.0, 100.0)];
        let mut state = SegmentState::new();

        let first = build_regions(
            &mut state,
            0,
            &page(),
            0,
            &column(),
            &fragments,
            &markers,
            &EngineConfig::default(),
        );
        let second = build_regions(
            &mut state,
            1,
            &page(),
            0,
            &column(),
            &fragments,
            &markers,
            &EngineConfig::default(),
        );

        assert_eq!(first[0].unique_id, 1);
        assert_eq!(second[0].unique_id, 2);
    }

    #[test]
    fn side_by_side_markers_split_horizontally() {
        let fragments = vec![
            fragment("1. Sol soru", 40.0, 100.0),
            fragment("2. Sağ soru", 320.0, 105.0),
        ];
        let markers = vec![marker(1, 40.0, 100.0), marker(2, 320.0, 105.0)];
        let mut state = SegmentState::new();

        let regions = build_regions(
            &mut state,
            0,
            &page(),
            0,
            &column(),
            &fragments,
            &markers,
            &EngineConfig::default(),
        );

        assert_eq!(regions.len(), 2);
        // Left region is capped before the right marker and reaches page bottom
        assert!(regions[0].crop.x1 <= 310.0);
        assert_eq!(regions[0].crop.y1, 842.0);
        assert_eq!(regions[1].crop.y1, 842.0);
        // Left region must not own the right column's fragment
        assert_eq!(regions[0].fragments.len(), 1);
    }

    #[test]
    fn empty_marker_region_is_skipped_without_consuming_id() {
        let fragments = vec![fragment("2. Gerçek soru", 50.0, 500.0)];
        // First marker owns nothing: its span ends before any fragment
        let markers = vec![marker(1, 50.0, 100.0), marker(2, 50.0, 500.0)];
        let mut state = SegmentState::new();

        let regions = build_regions(
            &mut state,
            0,
            &page(),
            0,
            &column(),
            &fragments,
            &markers,
            &EngineConfig::default(),
        );

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].unique_id, 1);
        assert_eq!(regions[0].pdf_number, 2);
    }
}
