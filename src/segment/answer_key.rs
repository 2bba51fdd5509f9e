//! Answer key extraction
//!
//! Scans the trailing pages of a document for an answer-key section, groups
//! `(number, letter)` pairs under detected subject headers, and reports the
//! key-bearing pages so the boundary scan skips them entirely.

use crate::backend::DocumentBackend;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::segment::normalize::normalize;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Phrases that mark a page as answer-key-bearing
const KEY_MARKERS: &[&str] = &["CEVAP ANAHTARI", "CEVAPLAR", "YANIT ANAHTARI", "ANSWER KEY"];

/// Known exam subjects, matched as line headers
const SUBJECTS: &[&str] = &[
    "TÜRKÇE",
    "MATEMATİK",
    "FEN BİLİMLERİ",
    "SOSYAL BİLGİLER",
    "İNGİLİZCE",
    "DİN KÜLTÜRÜ",
    "FİZİK",
    "KİMYA",
    "BİYOLOJİ",
    "TARİH",
    "COĞRAFYA",
];

/// Bucket for answers seen before any subject header
const DEFAULT_SUBJECT: &str = "GENEL";

static ANSWER_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*[-.:)]\s*([A-E])\b").unwrap());

/// The answer key of one document
#[derive(Debug, Clone, Default)]
pub struct AnswerKey {
    /// Subjects in first-seen order
    pub subjects: Vec<String>,
    /// Subject -> per-subject question number -> answer letter
    pub answers: HashMap<String, HashMap<u32, char>>,
    /// Zero-based indices of key-bearing pages, excluded from question scans
    pub excluded_pages: BTreeSet<u32>,
}

impl AnswerKey {
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Look up the answer for `(subject, number)`
    pub fn lookup(&self, subject: &str, number: u32) -> Option<char> {
        self.answers.get(subject)?.get(&number).copied()
    }

    /// Search every subject for `number`, returning the first hit in
    /// subject order
    pub fn lookup_any(&self, number: u32) -> Option<(&str, char)> {
        self.subjects.iter().find_map(|subject| {
            self.lookup(subject, number)
                .map(|letter| (subject.as_str(), letter))
        })
    }
}

fn page_text(fragments: &[crate::backend::TextFragment]) -> Vec<String> {
    let mut sorted: Vec<_> = fragments.to_vec();
    sorted.sort_by(|a, b| {
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
    sorted.iter().map(|f| normalize(&f.text)).collect()
}

fn is_key_bearing(lines: &[String]) -> bool {
    let joined = lines.join("\n").to_uppercase();
    KEY_MARKERS.iter().any(|marker| joined.contains(marker))
}

fn subject_header(line: &str) -> Option<&'static str> {
    let upper = line.trim().to_uppercase();
    SUBJECTS
        .iter()
        .find(|subject| upper.starts_with(**subject))
        .copied()
}

/// Extract the answer key from the trailing pages of a document
pub fn extract_answer_key<B: DocumentBackend>(
    backend: &B,
    cfg: &EngineConfig,
) -> Result<AnswerKey> {
    let page_count = backend.page_count();
    let first_candidate = page_count.saturating_sub(cfg.answer_key_page_window);

    let mut key = AnswerKey::default();

    for page in first_candidate..page_count {
        let fragments = backend.fragments(page)?;
        let lines = page_text(&fragments);

        if !is_key_bearing(&lines) {
            continue;
        }

        key.excluded_pages.insert(page);
        debug!(page, "answer-key-bearing page");

        let mut current_subject: Option<String> = None;
        for line in &lines {
            if let Some(subject) = subject_header(line) {
                // First header per subject wins for grouping
                if !key.subjects.iter().any(|s| s == subject) {
                    key.subjects.push(subject.to_string());
                }
                current_subject = Some(subject.to_string());
                continue;
            }

            for caps in ANSWER_PAIR.captures_iter(line) {
                let Ok(number) = caps[1].parse::<u32>() else {
                    continue;
                };
                let letter = caps[2].chars().next().unwrap_or('A');

                let subject = current_subject
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
                if !key.subjects.iter().any(|s| s == &subject) {
                    key.subjects.push(subject.clone());
                }

                // Last write wins on duplicate numbers
                key.answers
                    .entry(subject)
                    .or_default()
                    .insert(number, letter);
            }
        }
    }

    if key.is_empty() {
        info!("no answer key found in trailing pages");
    } else {
        info!(
            subjects = key.subjects.len(),
            pages = key.excluded_pages.len(),
            "answer key extracted"
        );
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{PageSize, Rect, TextFragment};
    use crate::error::Result;
    use pretty_assertions::assert_eq;

    struct FakeBackend {
        pages: Vec<Vec<TextFragment>>,
    }

    impl DocumentBackend for FakeBackend {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_size(&self, _page: u32) -> Result<PageSize> {
            Ok(PageSize {
                width: 595.0,
                height: 842.0,
            })
        }

        fn fragments(&self, page: u32) -> Result<Vec<TextFragment>> {
            Ok(self.pages[page as usize].clone())
        }

        fn rasterize(&self, _page: u32, _region: Rect, _scale: f32) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn line(text: &str, y0: f32, page: u32) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            bbox: Rect::new(50.0, y0, 400.0, y0 + 12.0),
            font_size: 11.0,
            is_bold: false,
            page,
        }
    }

    fn key_page(page: u32) -> Vec<TextFragment> {
        vec![
            line("CEVAP ANAHTARI", 40.0, page),
            line("MATEMATİK", 70.0, page),
            line("1-B 2-D 3-A 4-C 5-E", 90.0, page),
            line("TÜRKÇE", 120.0, page),
            line("1-A 2-C", 140.0, page),
        ]
    }

    #[test]
    fn groups_answers_by_subject() {
        let backend = FakeBackend {
            pages: vec![vec![line("1. Soru", 100.0, 0)], key_page(1)],
        };
        let key = extract_answer_key(&backend, &EngineConfig::default()).unwrap();

        assert_eq!(key.subjects, vec!["MATEMATİK", "TÜRKÇE"]);
        assert_eq!(key.lookup("MATEMATİK", 3), Some('A'));
        assert_eq!(key.lookup("TÜRKÇE", 2), Some('C'));
        assert_eq!(key.lookup("TÜRKÇE", 3), None);
        assert_eq!(key.excluded_pages.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn multiple_pairs_per_line_and_overwrites() {
        let backend = FakeBackend {
            pages: vec![vec![
                line("CEVAPLAR", 40.0, 0),
                line("MATEMATİK", 70.0, 0),
                line("1-B 1-C", 90.0, 0),
            ]],
        };
        let key = extract_answer_key(&backend, &EngineConfig::default()).unwrap();
        // Last write wins per line scan
        assert_eq!(key.lookup("MATEMATİK", 1), Some('C'));
    }

    #[test]
    fn pairs_before_any_header_use_default_bucket() {
        let backend = FakeBackend {
            pages: vec![vec![line("CEVAPLAR: 1-B 2-D", 40.0, 0)]],
        };
        let key = extract_answer_key(&backend, &EngineConfig::default()).unwrap();
        assert_eq!(key.lookup(DEFAULT_SUBJECT, 2), Some('D'));
    }

    #[test]
    fn pages_without_markers_are_not_excluded() {
        let backend = FakeBackend {
            pages: vec![vec![line("1. Soru metni", 100.0, 0)]],
        };
        let key = extract_answer_key(&backend, &EngineConfig::default()).unwrap();
        assert!(key.is_empty());
        assert!(key.excluded_pages.is_empty());
    }
}
