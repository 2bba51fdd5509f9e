//! External recognition services
//!
//! OCR and vision calls are best-effort: both traits return degraded values
//! (empty text, default analysis) instead of errors, so a flaky service can
//! never abort a document run.

pub mod ocr;
pub mod vision;

pub use ocr::HttpOcrClient;
pub use vision::HttpVisionClient;

use serde::Deserialize;

/// Converts a raster image to text. Unreadable input yields an empty string.
pub trait OcrService: Send + Sync {
    fn recognize(
        &self,
        image_png: &[u8],
        languages: &str,
    ) -> impl std::future::Future<Output = String> + Send;
}

/// Structured fields recovered by the vision service for one question crop
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct VisionAnalysis {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub stem: Option<String>,
    #[serde(default)]
    pub options: Vec<VisionOption>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub subtopic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// One labeled option as returned by the vision service
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VisionOption {
    pub label: String,
    pub value: String,
}

impl VisionAnalysis {
    /// Whether the analysis carries anything worth adopting
    pub fn is_usable(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
            || !self.options.is_empty()
            || self.answer.is_some()
    }
}

/// Analyzes a question crop, returning a default analysis on any failure.
pub trait VisionService: Send + Sync {
    fn analyze(
        &self,
        image_png: &[u8],
    ) -> impl std::future::Future<Output = VisionAnalysis> + Send;
}
