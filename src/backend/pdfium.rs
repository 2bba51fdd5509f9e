//! PDFium-backed document access
//!
//! Extracts line-level fragments with font metadata upfront (PDFium is not
//! thread-safe, so the document is never held across calls) and re-loads the
//! document for rasterization requests.

use crate::backend::{DocumentBackend, PageSize, Rect, TextFragment};
use crate::error::{Error, Result};
use pdfium_render::prelude::*;
use std::path::Path;

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Character with position and font metadata, prior to line grouping
#[derive(Debug, Clone)]
struct CharInfo {
    char: char,
    x: f32,
    /// Top edge, top-left origin
    y: f32,
    width: f32,
    height: f32,
    font_size: f32,
    is_bold: bool,
}

/// Document backend over PDFium
pub struct PdfiumBackend {
    data: Vec<u8>,
    page_count: u32,
    sizes: Vec<PageSize>,
    fragments: Vec<Vec<TextFragment>>,
}

impl PdfiumBackend {
    /// Open a document from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::DocumentNotFound {
                path: path.display().to_string(),
            });
        }

        let data = std::fs::read(path)?;
        Self::open_bytes(&data)
    }

    /// Open a document from bytes
    pub fn open_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidDocument {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        let pdfium = create_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| Error::Pdfium {
                reason: format!("{}", e),
            })?;

        let pages = document.pages();
        let page_count = pages.len() as u32;
        let mut sizes = Vec::with_capacity(page_count as usize);
        let mut fragments = Vec::with_capacity(page_count as usize);

        for index in 0..pages.len() {
            let page = pages.get(index).map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })?;

            let size = PageSize {
                width: page.width().value,
                height: page.height().value,
            };
            sizes.push(size);
            fragments.push(Self::extract_page_fragments(&page, index as u32, size));
        }

        Ok(Self {
            data: data.to_vec(),
            page_count,
            sizes,
            fragments,
        })
    }

    fn extract_page_fragments(page: &PdfPage, page_index: u32, size: PageSize) -> Vec<TextFragment> {
        let text_obj = match page.text() {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };

        let chars = Self::collect_chars_with_info(&text_obj, size.height);
        if chars.is_empty() {
            return Vec::new();
        }

        let y_tolerance = Self::line_tolerance(&chars);
        Self::group_into_fragments(chars, y_tolerance, page_index)
    }

    fn collect_chars_with_info(text_obj: &PdfPageText, page_height: f32) -> Vec<CharInfo> {
        let mut chars = Vec::new();

        for segment in text_obj.segments().iter() {
            if let Ok(char_iter) = segment.chars() {
                for char_result in char_iter.iter() {
                    if let Some(c) = char_result.unicode_char() {
                        if let Ok(bounds) = char_result.loose_bounds() {
                            let height = bounds.height().value;
                            // PDF coordinates grow upward; flip to top-left origin
                            let y = page_height - bounds.top().value;

                            let font_size = char_result
                                .unscaled_font_size()
                                .value
                                .max(0.0);
                            let is_bold = Self::char_is_bold(&char_result);

                            chars.push(CharInfo {
                                char: c,
                                x: bounds.left().value,
                                y,
                                width: bounds.width().value,
                                height,
                                font_size: if font_size > 0.0 { font_size } else { height },
                                is_bold,
                            });
                        }
                    }
                }
            }
        }

        chars
    }

    fn char_is_bold(char_result: &PdfPageTextChar) -> bool {
        match char_result.font_weight() {
            Some(PdfFontWeight::Weight600) => true,
            Some(PdfFontWeight::Weight700Bold) => true,
            Some(PdfFontWeight::Weight800) => true,
            Some(PdfFontWeight::Weight900) => true,
            Some(PdfFontWeight::Custom(w)) => w >= 600,
            _ => false,
        }
    }

    /// Y tolerance for same-line grouping: 40% of median char height
    fn line_tolerance(chars: &[CharInfo]) -> f32 {
        let mut heights: Vec<f32> = chars
            .iter()
            .filter(|c| c.height > 0.0)
            .map(|c| c.height)
            .collect();

        if heights.is_empty() {
            return 5.0;
        }

        heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        (heights[heights.len() / 2] * 0.4).max(2.0)
    }

    fn group_into_fragments(
        chars: Vec<CharInfo>,
        y_tolerance: f32,
        page_index: u32,
    ) -> Vec<TextFragment> {
        // Sort top to bottom, then left to right
        let mut sorted = chars;
        sorted.sort_by(|a, b| {
            let y_cmp = a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal);
            if y_cmp == std::cmp::Ordering::Equal {
                a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                y_cmp
            }
        });

        let mut fragments = Vec::new();
        let mut current: Vec<CharInfo> = Vec::new();
        let mut current_y: Option<f32> = None;

        for c in sorted {
            match current_y {
                Some(y) if (y - c.y).abs() <= y_tolerance => current.push(c),
                _ => {
                    if !current.is_empty() {
                        fragments.push(Self::finish_fragment(std::mem::take(&mut current), page_index));
                    }
                    current_y = Some(c.y);
                    current.push(c);
                }
            }
        }
        if !current.is_empty() {
            fragments.push(Self::finish_fragment(current, page_index));
        }

        fragments
    }

    fn finish_fragment(mut chars: Vec<CharInfo>, page_index: u32) -> TextFragment {
        chars.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let space_threshold = {
            let mut sizes: Vec<f32> = chars.iter().map(|c| c.height).collect();
            sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            (sizes[sizes.len() / 2] * 0.3).max(3.0)
        };

        let mut text = String::new();
        let mut prev_right: Option<f32> = None;
        for c in &chars {
            if let Some(px) = prev_right {
                if c.x - px > space_threshold && c.char != ' ' {
                    text.push(' ');
                }
            }
            text.push(c.char);
            prev_right = Some(c.x + c.width);
        }

        let x0 = chars.iter().map(|c| c.x).fold(f32::MAX, f32::min);
        let x1 = chars.iter().map(|c| c.x + c.width).fold(f32::MIN, f32::max);
        let y0 = chars.iter().map(|c| c.y).fold(f32::MAX, f32::min);
        let y1 = chars
            .iter()
            .map(|c| c.y + c.height)
            .fold(f32::MIN, f32::max);

        let mut font_sizes: Vec<f32> = chars.iter().map(|c| c.font_size).collect();
        font_sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let font_size = font_sizes[font_sizes.len() / 2];

        let bold_count = chars.iter().filter(|c| c.is_bold).count();

        TextFragment {
            text,
            bbox: Rect::new(x0, y0, x1, y1),
            font_size,
            is_bold: bold_count * 2 > chars.len(),
            page: page_index,
        }
    }
}

impl DocumentBackend for PdfiumBackend {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_size(&self, page: u32) -> Result<PageSize> {
        self.sizes
            .get(page as usize)
            .copied()
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            })
    }

    fn fragments(&self, page: u32) -> Result<Vec<TextFragment>> {
        self.fragments
            .get(page as usize)
            .cloned()
            .ok_or(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            })
    }

    fn rasterize(&self, page: u32, region: Rect, scale: f32) -> Result<Vec<u8>> {
        if page >= self.page_count {
            return Err(Error::PageOutOfBounds {
                page,
                total: self.page_count,
            });
        }

        let pdfium = create_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.data, None)
            .map_err(|e| Error::Pdfium {
                reason: format!("{}", e),
            })?;

        let pdf_page = document
            .pages()
            .get(page as u16)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", page + 1, e),
            })?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to render page {}: {}", page + 1, e),
            })?;

        let full = bitmap.as_image();

        // Clip the requested region out of the scaled page render
        let x = ((region.x0 * scale).max(0.0)) as u32;
        let y = ((region.y0 * scale).max(0.0)) as u32;
        let w = ((region.width() * scale) as u32).min(full.width().saturating_sub(x));
        let h = ((region.height() * scale) as u32).min(full.height().saturating_sub(y));

        if w == 0 || h == 0 {
            return Err(Error::Pdfium {
                reason: format!("empty raster region on page {}", page + 1),
            });
        }

        let cropped = full.crop_imm(x, y, w, h);

        let mut png_bytes = Vec::new();
        cropped.write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )?;

        Ok(png_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_bytes() {
        let result = PdfiumBackend::open_bytes(b"not a pdf");
        assert!(matches!(result, Err(Error::InvalidDocument { .. })));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = PdfiumBackend::open("/nonexistent/exam.pdf");
        assert!(matches!(result, Err(Error::DocumentNotFound { .. })));
    }
}
