//! Exam question segmentation engine
//!
//! Turns an exam PDF into structured questions:
//! - `backend`: positioned text and raster access behind a trait
//! - `segment`: column detection, marker matching, region building,
//!   option clustering, and answer key extraction
//! - `services`: best-effort OCR and vision fallbacks for questions whose
//!   native text is missing or too short

pub mod backend;
pub mod config;
pub mod error;
pub mod segment;
pub mod services;

pub use backend::{DocumentBackend, PdfiumBackend};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use segment::{extract_questions, validate, ExtractionReport, Question};
pub use services::{HttpOcrClient, HttpVisionClient, OcrService, VisionService};
