//! Text source selection
//!
//! Each question's text comes from the first acceptable stage of a fixed
//! chain: native fragment text, then OCR on the rasterized crop, then the
//! vision model. Every stage has an explicit acceptance predicate so the
//! policy is testable stage by stage; the chain itself is driven from the
//! pipeline where the async services live.

use crate::backend::TextFragment;
use crate::config::EngineConfig;
use crate::segment::normalize::normalize;
use regex::Regex;
use std::sync::LazyLock;

/// Page furniture excluded from native question text
const SKIP_PHRASES: &[&str] = &["sayfa", "page", "©", "www.", "http"];

static ANSWER_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(cevap|doğru cevap|yanıt|answer)\b").unwrap());
static LONE_NUMERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\s*[.)]?$").unwrap());

/// Where a question's final text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOrigin {
    Native,
    Ocr,
    Vision,
    Empty,
}

/// Native text split into bold stem and regular remainder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeText {
    pub text: String,
    pub stem: String,
}

/// Whether a fragment line is excluded from native question text
fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    SKIP_PHRASES.iter().any(|phrase| lower.contains(phrase))
        || ANSWER_PHRASE.is_match(line)
        || LONE_NUMERAL.is_match(line.trim())
}

/// Build the native text candidate from a question's fragments.
///
/// Fragments at or below the first option start are excluded; bold
/// fragments form the stem, regular fragments the text.
pub fn native_candidate(fragments: &[TextFragment], first_option_y: Option<f32>) -> NativeText {
    let mut text_parts: Vec<String> = Vec::new();
    let mut stem_parts: Vec<String> = Vec::new();

    for fragment in fragments {
        if let Some(limit) = first_option_y {
            if fragment.bbox.y0 >= limit {
                continue;
            }
        }

        let line = normalize(&fragment.text);
        if line.is_empty() || is_noise(&line) {
            continue;
        }

        if fragment.is_bold {
            stem_parts.push(line);
        } else {
            text_parts.push(line);
        }
    }

    NativeText {
        text: normalize(&text_parts.join(" ")),
        stem: normalize(&stem_parts.join(" ")),
    }
}

/// Acceptance predicate for the native stage
pub fn accept_native(candidate: &NativeText, cfg: &EngineConfig) -> bool {
    candidate.text.chars().count() + candidate.stem.chars().count() >= cfg.min_native_len
}

/// Acceptance predicate for the OCR stage: non-empty and no shorter than
/// what the native attempt produced
pub fn accept_ocr(ocr_text: &str, native: &NativeText) -> bool {
    let cleaned = ocr_text.trim();
    !cleaned.is_empty() && cleaned.chars().count() > native.text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Rect;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn fragment(text: &str, y0: f32, bold: bool) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            bbox: Rect::new(50.0, y0, 300.0, y0 + 12.0),
            font_size: 11.0,
            is_bold: bold,
            page: 0,
        }
    }

    #[test]
    fn bold_fragments_become_stem() {
        let fragments = vec![
            fragment("Aşağıdaki cümlelerden hangisi doğrudur?", 100.0, true),
            fragment("Bir metin parçası verilmiştir.", 120.0, false),
        ];
        let native = native_candidate(&fragments, None);
        assert_eq!(native.stem, "Aşağıdaki cümlelerden hangisi doğrudur?");
        assert_eq!(native.text, "Bir metin parçası verilmiştir.");
    }

    #[test]
    fn fragments_after_first_option_are_excluded() {
        let fragments = vec![
            fragment("Soru metni", 100.0, false),
            fragment("A) bir", 140.0, false),
            fragment("B) iki", 160.0, false),
        ];
        let native = native_candidate(&fragments, Some(140.0));
        assert_eq!(native.text, "Soru metni");
    }

    #[rstest]
    #[case("Sayfa 3")]
    #[case("www.ornek.com")]
    #[case("12")]
    #[case("7.")]
    #[case("Cevap: B")]
    fn noise_lines_are_skipped(#[case] noise: &str) {
        let fragments = vec![
            fragment("Gerçek soru metni burada", 100.0, false),
            fragment(noise, 120.0, false),
        ];
        let native = native_candidate(&fragments, None);
        assert_eq!(native.text, "Gerçek soru metni burada");
    }

    #[test]
    fn native_acceptance_uses_minimum_length() {
        let cfg = EngineConfig::default();
        let short = NativeText {
            text: "kısa".to_string(),
            stem: String::new(),
        };
        let long = NativeText {
            text: "Bu yeterince uzun bir soru metnidir".to_string(),
            stem: String::new(),
        };
        assert!(!accept_native(&short, &cfg));
        assert!(accept_native(&long, &cfg));
    }

    #[test]
    fn ocr_accepted_only_when_it_adds_text() {
        let empty_native = NativeText::default();
        assert!(accept_ocr("Hangi şehir...", &empty_native));
        assert!(!accept_ocr("", &empty_native));
        assert!(!accept_ocr("   ", &empty_native));

        let rich_native = NativeText {
            text: "Uzun ve eksiksiz bir soru metni".to_string(),
            stem: String::new(),
        };
        assert!(!accept_ocr("kısa", &rich_native));
    }
}
