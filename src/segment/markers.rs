//! Question-start detection
//!
//! An ordered cascade of named rules, evaluated per fragment line and
//! short-circuiting on the first match. A number followed by running
//! lowercase text is rejected unless a keyword, an uppercase or
//! interrogative continuation, or bold/large type backs it up, which
//! filters out table rows and formula numbering.

use crate::backend::TextFragment;
use crate::config::EngineConfig;
use crate::segment::normalize::normalize;
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Document-local question numbers outside this range are noise
const NUMBER_RANGE: std::ops::RangeInclusive<u32> = 1..=200;

/// Words that open a question when a bare number is followed by lowercase
const INTERROGATIVE_LEADS: &[&str] = &[
    "hangisi",
    "hangisidir",
    "hangi",
    "kaçtır",
    "kaç",
    "nedir",
    "aşağıdaki",
    "aşağıdakilerden",
];

static KEYWORD_THEN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^soru\s+(\d+)\s*[.):]?").unwrap());
static NUMBER_THEN_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*\.?\s*soru\b").unwrap());
static NUMBER_DELIMITED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*[.)]\s*(.*)$").unwrap());
static NUMBER_DASHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*-\s+\S").unwrap());

/// A detected question start within a column
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionMarker {
    /// Document-local number; may repeat across subjects
    pub pdf_number: u32,
    pub x: f32,
    pub y: f32,
}

/// One rule of the detection cascade
struct MarkerRule {
    name: &'static str,
    matcher: fn(&str, &TextFragment, &EngineConfig) -> Option<u32>,
}

const RULES: &[MarkerRule] = &[
    MarkerRule {
        name: "keyword-number",
        matcher: |line, _, _| capture_number(&KEYWORD_THEN_NUMBER, line),
    },
    MarkerRule {
        name: "number-keyword",
        matcher: |line, _, _| capture_number(&NUMBER_THEN_KEYWORD, line),
    },
    MarkerRule {
        name: "number-delimited",
        matcher: |line, fragment, cfg| {
            let caps = NUMBER_DELIMITED.captures(line)?;
            let number: u32 = caps.get(1)?.as_str().parse().ok()?;
            let rest = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");

            let accepted = rest.is_empty()
                || rest.chars().next().is_some_and(char::is_uppercase)
                || starts_with_interrogative(rest)
                || fragment.is_bold
                || fragment.font_size >= cfg.large_font_size;

            accepted.then_some(number)
        },
    },
    MarkerRule {
        name: "number-dashed",
        matcher: |line, _, _| capture_number(&NUMBER_DASHED, line),
    },
];

fn capture_number(pattern: &Regex, line: &str) -> Option<u32> {
    pattern
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn starts_with_interrogative(rest: &str) -> bool {
    let first = rest
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase();
    INTERROGATIVE_LEADS.contains(&first.as_str())
}

/// Evaluate the cascade against one fragment; only its first line counts
pub fn match_question_start(fragment: &TextFragment, cfg: &EngineConfig) -> Option<u32> {
    let normalized = normalize(&fragment.text);
    let line = normalized.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return None;
    }

    for rule in RULES {
        if let Some(number) = (rule.matcher)(line, fragment, cfg) {
            if !NUMBER_RANGE.contains(&number) {
                trace!(rule = rule.name, number, "marker number out of range");
                return None;
            }
            trace!(rule = rule.name, number, "question start matched");
            return Some(number);
        }
    }
    None
}

/// Detect ordered question markers among one column's fragments
pub fn detect_markers(fragments: &[TextFragment], cfg: &EngineConfig) -> Vec<QuestionMarker> {
    let mut markers: Vec<QuestionMarker> = fragments
        .iter()
        .filter_map(|fragment| {
            match_question_start(fragment, cfg).map(|pdf_number| QuestionMarker {
                pdf_number,
                x: fragment.bbox.x0,
                y: fragment.bbox.y0,
            })
        })
        .collect();

    markers.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });
    markers
}
