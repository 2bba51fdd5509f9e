//! Document backend abstraction
//!
//! The segmentation core never touches a PDF library directly. It consumes
//! positioned text fragments and rasterized regions through the
//! [`DocumentBackend`] trait; `pdfium.rs` provides the production
//! implementation.
//!
//! Coordinates use a top-left origin: `y` grows downward, so a fragment's
//! `bbox.y0` is its top edge and pages read in ascending `y0` order.

pub mod pdfium;

pub use pdfium::PdfiumBackend;

use crate::error::Result;
use serde::Serialize;

/// Axis-aligned rectangle in page layout units
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Expand by `pad` on every side, clamped to `[0, width] x [0, height]`
    pub fn padded_within(&self, pad: f32, width: f32, height: f32) -> Rect {
        Rect {
            x0: (self.x0 - pad).max(0.0),
            y0: (self.y0 - pad).max(0.0),
            x1: (self.x1 + pad).min(width),
            y1: (self.y1 + pad).min(height),
        }
    }

    /// Smallest rectangle covering both `self` and `other`
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One visually contiguous line of text on a page
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Line text as produced by the backend (pre-normalization)
    pub text: String,
    /// Line bounding box, top-left origin
    pub bbox: Rect,
    /// Representative font size for the line
    pub font_size: f32,
    /// Whether the majority of the line is bold
    pub is_bold: bool,
    /// Zero-based page index
    pub page: u32,
}

/// Page dimensions in layout units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Read-only access to a paginated document
pub trait DocumentBackend: Send + Sync {
    /// Number of pages in the document
    fn page_count(&self) -> u32;

    /// Dimensions of a page (zero-based index)
    fn page_size(&self, page: u32) -> Result<PageSize>;

    /// Positioned text fragments of a page, unordered
    fn fragments(&self, page: u32) -> Result<Vec<TextFragment>>;

    /// Rasterize a rectangular page region to PNG bytes at `scale`
    fn rasterize(&self, page: u32, region: Rect, scale: f32) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_padding_clamps_to_page() {
        let r = Rect::new(5.0, 5.0, 100.0, 100.0);
        let padded = r.padded_within(10.0, 120.0, 104.0);
        assert_eq!(padded, Rect::new(0.0, 0.0, 110.0, 104.0));
    }

    #[test]
    fn rect_union_covers_both() {
        let a = Rect::new(0.0, 10.0, 50.0, 20.0);
        let b = Rect::new(40.0, 5.0, 80.0, 15.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 5.0, 80.0, 20.0));
    }
}
