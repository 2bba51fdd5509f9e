//! Error types for the exam segmenter

use thiserror::Error;

/// Result type alias for the exam segmenter
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the exam segmenter
#[derive(Error, Debug)]
pub enum Error {
    /// Document file not found
    #[error("document not found: {path}")]
    DocumentNotFound { path: String },

    /// Invalid document
    #[error("invalid document: {reason}")]
    InvalidDocument { reason: String },

    /// Page out of bounds
    #[error("page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Image encoding error
    #[error("image encoding failed: {0}")]
    ImageEncode(#[from] image::ImageError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
