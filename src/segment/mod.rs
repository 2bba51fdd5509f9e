//! Question segmentation core
//!
//! Pure layout analysis over [`crate::backend::TextFragment`] streams:
//! column detection, question marker matching, region building, option
//! clustering, answer key extraction, and the pipeline that ties them
//! together. Everything except `pipeline` is synchronous and free of I/O.

pub mod answer_key;
pub mod columns;
pub mod markers;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod regions;
pub mod text_source;

pub use answer_key::{extract_answer_key, AnswerKey};
pub use columns::{detect_columns, Column};
pub use markers::{detect_markers, QuestionMarker};
pub use options::{extract_options, QuestionOption};
pub use pipeline::{
    extract_questions, validate, AnswerSource, ExtractionReport, Question, ValidationReport,
};
pub use regions::{build_regions, QuestionBoundary, SegmentState};
pub use text_source::TextOrigin;
