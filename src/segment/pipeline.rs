//! Document-level orchestration
//!
//! Walks every page of a document, segments columns into question regions,
//! resolves each region's text through the native/OCR/vision chain, and
//! assembles the final report with subjects and answers attached.
//!
//! Per-question resolution runs concurrently; the emitted list preserves
//! scan order regardless of service completion order.

use base64::Engine as _;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::backend::{DocumentBackend, Rect};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::segment::answer_key::{extract_answer_key, AnswerKey};
use crate::segment::columns::detect_columns;
use crate::segment::markers::detect_markers;
use crate::segment::normalize::normalize;
use crate::segment::options::{extract_options, first_option_start_y, QuestionOption};
use crate::segment::regions::{build_regions, QuestionBoundary, SegmentState};
use crate::segment::text_source::{
    accept_native, accept_ocr, native_candidate, TextOrigin,
};
use crate::services::{OcrService, VisionAnalysis, VisionService};

/// How a question's answer letter was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Matched in the document's own answer key
    PdfKey,
    /// Supplied by the vision service
    VisionModel,
    /// No source produced an answer
    None,
}

/// Crop geometry of a question, in page layout units
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CropInfo {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub width: f32,
    pub height: f32,
}

impl From<Rect> for CropInfo {
    fn from(rect: Rect) -> Self {
        Self {
            x0: rect.x0,
            y0: rect.y0,
            x1: rect.x1,
            y1: rect.y1,
            width: rect.width(),
            height: rect.height(),
        }
    }
}

/// One fully resolved question
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    /// Document-wide sequential id, starting at 1
    pub id: u32,
    /// Question number as printed on the page
    pub pdf_question_number: u32,
    /// One-based page number
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub text: String,
    pub stem: String,
    /// Which stage of the fallback chain produced `text`
    pub text_source: TextOrigin,
    pub options: Vec<QuestionOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<char>,
    pub answer_source: AnswerSource,
    /// PNG crop as a data URL, when image output is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub crop_info: CropInfo,
}

/// Result envelope of one document run
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub success: bool,
    pub total_questions: usize,
    pub questions: Vec<Question>,
}

/// Questions that fail basic completeness checks, with reasons
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub id: u32,
    pub problems: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: usize,
    pub invalid: usize,
    pub issues: Vec<ValidationIssue>,
}

/// Flag questions with a too-short body, fewer than two options, or no
/// answer. Purely advisory; flagged questions stay in the report.
pub fn validate(questions: &[Question]) -> ValidationReport {
    let mut issues = Vec::new();

    for question in questions {
        let mut problems = Vec::new();
        let body_len = question
            .text
            .chars()
            .count()
            .max(question.stem.chars().count());
        if body_len < 10 {
            problems.push("soru metni çok kısa".to_string());
        }
        if question.options.len() < 2 {
            problems.push("yetersiz seçenek".to_string());
        }
        if question.answer.is_none() {
            problems.push("cevap eksik".to_string());
        }
        if !problems.is_empty() {
            issues.push(ValidationIssue {
                id: question.id,
                problems,
            });
        }
    }

    ValidationReport {
        valid: questions.len() - issues.len(),
        invalid: issues.len(),
        issues,
    }
}

/// Intermediate question state between resolution and aggregation
#[derive(Debug, Clone)]
struct QuestionDraft {
    unique_id: u32,
    pdf_number: u32,
    page: u32,
    crop: Rect,
    text: String,
    stem: String,
    origin: TextOrigin,
    options: Vec<QuestionOption>,
    vision: Option<VisionAnalysis>,
    image_png: Option<Vec<u8>>,
}

/// Segment every non-key page of a document into question boundaries
pub fn segment_document<B: DocumentBackend>(
    backend: &B,
    key: &AnswerKey,
    cfg: &EngineConfig,
) -> Result<Vec<QuestionBoundary>> {
    let mut state = SegmentState::new();
    let mut boundaries = Vec::new();

    for page in 0..backend.page_count() {
        if key.excluded_pages.contains(&page) {
            debug!(page, "skipping answer key page");
            continue;
        }

        let page_size = backend.page_size(page)?;
        let fragments = backend.fragments(page)?;
        let columns = detect_columns(&fragments, page_size.width, cfg);

        for (column_index, column) in columns.iter().enumerate() {
            let column_fragments: Vec<_> = fragments
                .iter()
                .filter(|f| column.contains(f))
                .cloned()
                .collect();
            let markers = detect_markers(&column_fragments, cfg);
            if markers.is_empty() {
                continue;
            }
            boundaries.extend(build_regions(
                &mut state,
                page,
                &page_size,
                column_index,
                column,
                &column_fragments,
                &markers,
                cfg,
            ));
        }
    }

    if boundaries.is_empty() {
        warn!("no question markers found in document");
    }
    Ok(boundaries)
}

fn vision_options(analysis: &VisionAnalysis, cfg: &EngineConfig) -> Vec<QuestionOption> {
    let mut options: Vec<QuestionOption> = analysis
        .options
        .iter()
        .filter_map(|opt| {
            let label = opt
                .label
                .trim()
                .chars()
                .next()?
                .to_ascii_uppercase();
            if !('A'..='E').contains(&label) {
                return None;
            }
            let value = normalize(&opt.value);
            if value.chars().count() < cfg.min_option_len {
                return None;
            }
            Some(QuestionOption { label, value })
        })
        .collect();
    options.sort_by_key(|o| o.label);
    options.dedup_by_key(|o| o.label);
    options
}

fn answer_letter(raw: &str) -> Option<char> {
    let letter = raw.trim().chars().next()?.to_ascii_uppercase();
    ('A'..='E').contains(&letter).then_some(letter)
}

/// Resolve one boundary into a draft: options, text source chain, crop image
async fn resolve_question<B, O, V>(
    backend: &B,
    ocr: Option<&O>,
    vision: Option<&V>,
    cfg: &EngineConfig,
    boundary: QuestionBoundary,
) -> QuestionDraft
where
    B: DocumentBackend,
    O: OcrService,
    V: VisionService,
{
    let mut options = extract_options(&boundary.fragments, cfg);
    let first_option_y = first_option_start_y(&boundary.fragments);
    let native = native_candidate(&boundary.fragments, first_option_y);
    let native_ok = accept_native(&native, cfg);

    let services_present = ocr.is_some() || vision.is_some();
    let needs_image = cfg.include_images || (!native_ok && services_present);

    let png = if needs_image {
        match backend.rasterize(boundary.page, boundary.crop, cfg.render_scale) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(
                    question = boundary.unique_id,
                    page = boundary.page,
                    error = %err,
                    "failed to rasterize question crop"
                );
                None
            }
        }
    } else {
        None
    };

    let mut text = native.text.clone();
    let mut stem = native.stem.clone();
    let mut origin = if native.text.is_empty() && native.stem.is_empty() {
        TextOrigin::Empty
    } else {
        TextOrigin::Native
    };
    let mut vision_result = None;

    if !native_ok {
        let mut adopted = false;

        if let (Some(service), Some(image)) = (ocr, png.as_deref()) {
            let recognized = service.recognize(image, &cfg.ocr_languages).await;
            if accept_ocr(&recognized, &native) {
                debug!(question = boundary.unique_id, "adopted OCR text");
                text = normalize(&recognized);
                stem = String::new();
                origin = TextOrigin::Ocr;
                adopted = true;
            }
        }

        if !adopted {
            if let (Some(service), Some(image)) = (vision, png.as_deref()) {
                let analysis = service.analyze(image).await;
                if analysis.is_usable() {
                    debug!(question = boundary.unique_id, "adopted vision analysis");
                    text = normalize(analysis.text.as_deref().unwrap_or(""));
                    stem = normalize(analysis.stem.as_deref().unwrap_or(""));
                    let replacement = vision_options(&analysis, cfg);
                    if !replacement.is_empty() {
                        options = replacement;
                    }
                    origin = TextOrigin::Vision;
                    vision_result = Some(analysis);
                }
            }
        }
    }

    QuestionDraft {
        unique_id: boundary.unique_id,
        pdf_number: boundary.pdf_number,
        page: boundary.page,
        crop: boundary.crop,
        text,
        stem,
        origin,
        options,
        vision: vision_result,
        image_png: if cfg.include_images { png } else { None },
    }
}

/// Attach subjects and answers to drafts, in ascending id order.
///
/// The subject cursor starts at the key's first subject and advances when
/// a question's printed number drops back to 1 after at least one question
/// was filed under the current subject. It clamps at the last subject.
fn aggregate(drafts: Vec<QuestionDraft>, key: &AnswerKey) -> Vec<Question> {
    let mut cursor = 0usize;
    let mut filed_in_current = 0usize;
    let mut questions = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let mut subject: Option<String> = None;
        if !key.subjects.is_empty() {
            if draft.pdf_number == 1 && filed_in_current > 0 && cursor + 1 < key.subjects.len() {
                cursor += 1;
                filed_in_current = 0;
            }
            subject = Some(key.subjects[cursor].clone());
            filed_in_current += 1;
        }

        let mut answer = subject
            .as_deref()
            .and_then(|s| key.lookup(s, draft.pdf_number));
        let mut answer_source = if answer.is_some() {
            AnswerSource::PdfKey
        } else {
            AnswerSource::None
        };

        if answer.is_none() {
            if let Some((hit_subject, letter)) = key.lookup_any(draft.pdf_number) {
                answer = Some(letter);
                answer_source = AnswerSource::PdfKey;
                if subject.is_none() {
                    subject = Some(hit_subject.to_string());
                }
            }
        }

        if answer.is_none() {
            if let Some(letter) = draft
                .vision
                .as_ref()
                .and_then(|v| v.answer.as_deref())
                .and_then(answer_letter)
            {
                answer = Some(letter);
                answer_source = AnswerSource::VisionModel;
            }
        }

        let vision = draft.vision.as_ref();
        if subject.is_none() {
            subject = vision.and_then(|v| v.subject.clone());
        }

        questions.push(Question {
            id: draft.unique_id,
            pdf_question_number: draft.pdf_number,
            page: draft.page + 1,
            subject,
            topic: vision.and_then(|v| v.topic.clone()),
            subtopic: vision.and_then(|v| v.subtopic.clone()),
            difficulty: vision.and_then(|v| v.difficulty.clone()),
            text: draft.text,
            stem: draft.stem,
            text_source: draft.origin,
            options: draft.options,
            answer,
            answer_source,
            image: draft.image_png.map(|bytes| {
                format!(
                    "data:image/png;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(bytes)
                )
            }),
            crop_info: draft.crop.into(),
        });
    }

    questions
}

/// Run the full pipeline over one document
pub async fn extract_questions<B, O, V>(
    backend: &B,
    ocr: Option<&O>,
    vision: Option<&V>,
    cfg: &EngineConfig,
) -> Result<ExtractionReport>
where
    B: DocumentBackend,
    O: OcrService,
    V: VisionService,
{
    let key = extract_answer_key(backend, cfg)?;
    if !key.is_empty() {
        info!(
            subjects = key.subjects.len(),
            key_pages = key.excluded_pages.len(),
            "answer key extracted"
        );
    }

    let boundaries = segment_document(backend, &key, cfg)?;
    info!(questions = boundaries.len(), "document segmented");

    let drafts = join_all(
        boundaries
            .into_iter()
            .map(|boundary| resolve_question(backend, ocr, vision, cfg, boundary)),
    )
    .await;

    let questions = aggregate(drafts, &key);
    let empty_count = questions
        .iter()
        .filter(|q| q.text.is_empty() && q.stem.is_empty())
        .count();
    if empty_count > 0 {
        warn!(count = empty_count, "questions with no recoverable text");
    }

    Ok(ExtractionReport {
        success: true,
        total_questions: questions.len(),
        questions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::VisionOption;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn draft(unique_id: u32, pdf_number: u32) -> QuestionDraft {
        QuestionDraft {
            unique_id,
            pdf_number,
            page: 0,
            crop: Rect::new(0.0, 0.0, 100.0, 100.0),
            text: "Aşağıdakilerden hangisi doğrudur?".to_string(),
            stem: String::new(),
            origin: TextOrigin::Native,
            options: Vec::new(),
            vision: None,
            image_png: None,
        }
    }

    fn key_with(entries: &[(&str, &[(u32, char)])]) -> AnswerKey {
        let mut key = AnswerKey::default();
        for (subject, answers) in entries {
            key.subjects.push(subject.to_string());
            let table: HashMap<u32, char> = answers.iter().copied().collect();
            key.answers.insert(subject.to_string(), table);
        }
        key
    }

    #[test]
    fn subject_cursor_advances_on_number_reset() {
        let key = key_with(&[
            ("TÜRKÇE", &[(1, 'A'), (2, 'B')]),
            ("MATEMATİK", &[(1, 'C'), (2, 'D')]),
        ]);
        let drafts = vec![draft(1, 1), draft(2, 2), draft(3, 1), draft(4, 2)];

        let questions = aggregate(drafts, &key);

        let subjects: Vec<_> = questions
            .iter()
            .map(|q| q.subject.as_deref().unwrap())
            .collect();
        assert_eq!(subjects, vec!["TÜRKÇE", "TÜRKÇE", "MATEMATİK", "MATEMATİK"]);
        let answers: Vec<_> = questions.iter().map(|q| q.answer.unwrap()).collect();
        assert_eq!(answers, vec!['A', 'B', 'C', 'D']);
    }

    #[test]
    fn subject_cursor_clamps_at_last_subject() {
        let key = key_with(&[("TÜRKÇE", &[(1, 'A')]), ("MATEMATİK", &[(1, 'B')])]);
        let drafts = vec![draft(1, 1), draft(2, 1), draft(3, 1)];

        let questions = aggregate(drafts, &key);

        let subjects: Vec<_> = questions
            .iter()
            .map(|q| q.subject.as_deref().unwrap())
            .collect();
        assert_eq!(subjects, vec!["TÜRKÇE", "MATEMATİK", "MATEMATİK"]);
    }

    #[test]
    fn key_answer_beats_vision_answer() {
        let key = key_with(&[("MATEMATİK", &[(3, 'B')])]);
        let mut d = draft(1, 3);
        d.vision = Some(VisionAnalysis {
            answer: Some("D".to_string()),
            ..Default::default()
        });

        let questions = aggregate(vec![d], &key);

        assert_eq!(questions[0].answer, Some('B'));
        assert_eq!(questions[0].answer_source, AnswerSource::PdfKey);
    }

    #[test]
    fn vision_answer_used_when_key_has_no_entry() {
        let key = AnswerKey::default();
        let mut d = draft(1, 7);
        d.vision = Some(VisionAnalysis {
            answer: Some("d".to_string()),
            subject: Some("FİZİK".to_string()),
            ..Default::default()
        });

        let questions = aggregate(vec![d], &key);

        assert_eq!(questions[0].answer, Some('D'));
        assert_eq!(questions[0].answer_source, AnswerSource::VisionModel);
        assert_eq!(questions[0].subject.as_deref(), Some("FİZİK"));
    }

    #[test]
    fn missing_answer_is_reported_as_none() {
        let questions = aggregate(vec![draft(1, 5)], &AnswerKey::default());

        assert_eq!(questions[0].answer, None);
        assert_eq!(questions[0].answer_source, AnswerSource::None);
        assert_eq!(questions[0].page, 1);
    }

    #[test]
    fn validation_flags_incomplete_questions() {
        let key = key_with(&[("TÜRKÇE", &[(1, 'A')])]);
        let mut good = draft(1, 1);
        good.options = vec![
            QuestionOption { label: 'A', value: "bir".to_string() },
            QuestionOption { label: 'B', value: "iki".to_string() },
        ];
        let mut bad = draft(2, 2);
        bad.text = "kısa".to_string();

        let questions = aggregate(vec![good, bad], &key);
        let report = validate(&questions);

        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.issues[0].id, 2);
        assert_eq!(report.issues[0].problems.len(), 3);
    }

    #[test]
    fn vision_options_drop_bad_labels_and_sort() {
        let cfg = EngineConfig::default();
        let analysis = VisionAnalysis {
            options: vec![
                VisionOption { label: "C".to_string(), value: "üç".to_string() },
                VisionOption { label: "a)".to_string(), value: "bir".to_string() },
                VisionOption { label: "7".to_string(), value: "yedi".to_string() },
            ],
            ..Default::default()
        };

        let options = vision_options(&analysis, &cfg);

        let labels: Vec<_> = options.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!['A', 'C']);
    }
}
