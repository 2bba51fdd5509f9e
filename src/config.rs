//! Engine configuration
//!
//! All tuned layout constants live here with their defaults, so a run can
//! override any of them without touching the segmentation code. Service
//! endpoints are optional; a missing endpoint disables that fallback stage.

use std::time::Duration;

/// Tuning and service configuration for a segmentation run
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum horizontal gap between left edges that opens a new column
    pub column_gap: f32,
    /// Columns narrower than this are merged back into their neighbor
    pub min_column_width: f32,
    /// Padding added around a question's tight bounding box
    pub crop_padding: f32,
    /// Vertical gap kept between consecutive question regions
    pub region_gap: f32,
    /// Two markers closer than this vertically are treated as side-by-side
    pub side_by_side_tolerance: f32,
    /// Regions with width or height below this are dropped
    pub min_region_extent: f32,
    /// Fragments at or above this font size count as "large" for marker rules
    pub large_font_size: f32,
    /// Horizontal tolerance when pulling wrapped option lines
    pub option_x_tolerance: f32,
    /// Option values shorter than this are discarded
    pub min_option_len: usize,
    /// Native question text below this length triggers the OCR fallback
    pub min_native_len: usize,
    /// Scale factor for rasterizing question crops
    pub render_scale: f32,
    /// How many trailing pages are scanned for the answer key
    pub answer_key_page_window: u32,
    /// Timeout applied to each OCR and vision call
    pub service_timeout: Duration,
    /// Retry budget for the vision service (OCR gets a single attempt)
    pub vision_retries: u32,
    /// OCR service endpoint; `None` disables the OCR fallback
    pub ocr_url: Option<String>,
    /// Vision service endpoint; `None` disables the vision fallback
    pub vision_url: Option<String>,
    /// API key for the vision service
    pub vision_api_key: Option<String>,
    /// Vision model identifier
    pub vision_model: String,
    /// Language hints forwarded to the OCR service
    pub ocr_languages: String,
    /// Attach base64 crop images to emitted questions
    pub include_images: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            column_gap: 80.0,
            min_column_width: 100.0,
            crop_padding: 10.0,
            region_gap: 5.0,
            side_by_side_tolerance: 50.0,
            min_region_extent: 10.0,
            large_font_size: 13.0,
            option_x_tolerance: 25.0,
            min_option_len: 1,
            min_native_len: 12,
            render_scale: 1.5,
            answer_key_page_window: 3,
            service_timeout: Duration::from_secs(30),
            vision_retries: 2,
            ocr_url: None,
            vision_url: None,
            vision_api_key: None,
            vision_model: "gpt-4o-mini".to_string(),
            ocr_languages: "tur+eng".to_string(),
            include_images: true,
        }
    }
}
