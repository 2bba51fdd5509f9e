//! Option extraction
//!
//! Clusters a question's fragments into labeled options A-E: finds label
//! starts, merges wrapped continuation lines by horizontal alignment with
//! the mean option indent, filters placeholder text, and orders the result
//! by label.

use crate::backend::TextFragment;
use crate::config::EngineConfig;
use crate::segment::normalize::normalize;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::warn;

static OPTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Ea-e])\s*[.):\-]\s*(.*)$").unwrap());
static BARE_OPTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-E])\b\s*(.*)$").unwrap());
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(seçenek|şık)?\s*[A-E]$").unwrap());

/// How many fragments a permissive bare-letter line may span
const BARE_LINE_MAX_LEN: usize = 40;

/// A labeled answer option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOption {
    pub label: char,
    pub value: String,
}

/// An option label start located within the fragment list
#[derive(Debug)]
struct OptionStart {
    label: char,
    fragment_index: usize,
    x: f32,
    y: f32,
    content: String,
}

fn placeholder(content: &str) -> bool {
    content.is_empty() || PLACEHOLDER.is_match(content.trim())
}

fn strict_start(index: usize, fragment: &TextFragment, line: &str) -> Option<OptionStart> {
    let caps = OPTION_START.captures(line)?;
    let label = caps
        .get(1)?
        .as_str()
        .chars()
        .next()?
        .to_ascii_uppercase();
    let content = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");

    // A lone "A)" can still head a multi-line option; only reject
    // placeholder phrases with actual content.
    if !content.is_empty() && placeholder(content) {
        return None;
    }

    Some(OptionStart {
        label,
        fragment_index: index,
        x: fragment.bbox.x0,
        y: fragment.bbox.y0,
        content: content.to_string(),
    })
}

fn bare_start(index: usize, fragment: &TextFragment, line: &str) -> Option<OptionStart> {
    if line.chars().count() > BARE_LINE_MAX_LEN {
        return None;
    }
    let caps = BARE_OPTION_START.captures(line)?;
    let label = caps.get(1)?.as_str().chars().next()?;
    let content = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");

    // Delimited lines already went through the strict scan; a leading
    // delimiter here means the strict scan rejected them for cause.
    if content.starts_with(['.', ')', ':', '-']) {
        return None;
    }

    Some(OptionStart {
        label,
        fragment_index: index,
        x: fragment.bbox.x0,
        y: fragment.bbox.y0,
        content: content.to_string(),
    })
}

/// Top edge of the first confidently-identified option start, if any
pub fn first_option_start_y(fragments: &[TextFragment]) -> Option<f32> {
    fragments
        .iter()
        .filter(|f| {
            let line = normalize(&f.text);
            OPTION_START
                .captures(&line)
                .is_some_and(|caps| {
                    let content = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
                    content.is_empty() || !placeholder(content)
                })
        })
        .map(|f| f.bbox.y0)
        .fold(None, |acc: Option<f32>, y| {
            Some(acc.map_or(y, |a| a.min(y)))
        })
}

/// Extract the labeled options of one question from its ordered fragments
pub fn extract_options(fragments: &[TextFragment], cfg: &EngineConfig) -> Vec<QuestionOption> {
    let lines: Vec<String> = fragments.iter().map(|f| normalize(&f.text)).collect();

    // Step 1: strict label starts, first occurrence per label
    let mut starts: Vec<OptionStart> = Vec::new();
    for (index, fragment) in fragments.iter().enumerate() {
        if let Some(start) = strict_start(index, fragment, &lines[index]) {
            if !starts.iter().any(|s| s.label == start.label) {
                starts.push(start);
            }
        }
    }

    // Step 2: permissive re-scan for unclaimed labels when yield is low
    if starts.len() < 4 {
        for (index, fragment) in fragments.iter().enumerate() {
            if starts.iter().any(|s| s.fragment_index == index) {
                continue;
            }
            if let Some(start) = bare_start(index, fragment, &lines[index]) {
                if !starts.iter().any(|s| s.label == start.label) {
                    starts.push(start);
                }
            }
        }
    }

    if starts.is_empty() {
        warn!("no option labels found in question fragments");
        return Vec::new();
    }

    starts.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    // Step 3: pull wrapped continuation lines aligned with the mean indent
    let mean_x: f32 = starts.iter().map(|s| s.x).sum::<f32>() / starts.len() as f32;
    let start_indices: Vec<usize> = starts.iter().map(|s| s.fragment_index).collect();

    let mut options: Vec<QuestionOption> = Vec::new();
    for (pos, start) in starts.iter().enumerate() {
        let span_end = starts
            .get(pos + 1)
            .map(|next| next.y)
            .unwrap_or(f32::INFINITY);

        let mut parts: Vec<(f32, String)> = vec![(start.y, start.content.clone())];
        for (index, fragment) in fragments.iter().enumerate() {
            if start_indices.contains(&index) {
                continue;
            }
            let y = fragment.bbox.y0;
            if y > start.y
                && y < span_end
                && (fragment.bbox.x0 - mean_x).abs() <= cfg.option_x_tolerance
            {
                parts.push((y, lines[index].clone()));
            }
        }

        // Step 4: join in reading order, normalize, length-filter
        parts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let value = normalize(
            &parts
                .into_iter()
                .map(|(_, text)| text)
                .collect::<Vec<_>>()
                .join(" "),
        );

        if value.chars().count() < cfg.min_option_len || placeholder(&value) {
            continue;
        }

        options.push(QuestionOption {
            label: start.label,
            value,
        });
    }

    // Step 5: label order, at most five
    options.sort_by_key(|o| o.label);
    options.dedup_by_key(|o| o.label);
    if options.len() > 5 {
        warn!(found = options.len(), "more than five options, truncating");
        options.truncate(5);
    }
    if options.len() < 2 {
        warn!(found = options.len(), "fewer than two options found");
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Rect;
    use pretty_assertions::assert_eq;

    fn fragment(text: &str, x0: f32, y0: f32) -> TextFragment {
        TextFragment {
            text: text.to_string(),
            bbox: Rect::new(x0, y0, x0 + 150.0, y0 + 12.0),
            font_size: 11.0,
            is_bold: false,
            page: 0,
        }
    }

    fn labels(options: &[QuestionOption]) -> Vec<char> {
        options.iter().map(|o| o.label).collect()
    }

    #[test]
    fn extracts_labeled_options_in_order() {
        let fragments = vec![
            fragment("Soru metni burada", 50.0, 100.0),
            fragment("C) üç", 60.0, 160.0),
            fragment("A) bir", 60.0, 120.0),
            fragment("B) iki", 60.0, 140.0),
            fragment("D) dört", 60.0, 180.0),
        ];
        let options = extract_options(&fragments, &EngineConfig::default());
        assert_eq!(labels(&options), vec!['A', 'B', 'C', 'D']);
        assert_eq!(options[0].value, "bir");
        assert_eq!(options[3].value, "dört");
    }

    #[test]
    fn merges_wrapped_continuation_lines() {
        let fragments = vec![
            fragment("A) uzun bir seçenek", 60.0, 120.0),
            fragment("devam eden satır", 62.0, 134.0),
            fragment("B) kısa", 60.0, 150.0),
            // Side text far from the option indent must not be dragged in
            fragment("kenar notu", 300.0, 134.0),
        ];
        let options = extract_options(&fragments, &EngineConfig::default());
        assert_eq!(options[0].value, "uzun bir seçenek devam eden satır");
        assert_eq!(options[1].value, "kısa");
    }

    #[test]
    fn placeholder_options_are_rejected() {
        let fragments = vec![
            fragment("A) Seçenek A", 60.0, 120.0),
            fragment("B) gerçek içerik", 60.0, 140.0),
            fragment("C) c", 60.0, 160.0),
        ];
        let options = extract_options(&fragments, &EngineConfig::default());
        assert_eq!(labels(&options), vec!['B']);
    }

    #[test]
    fn duplicate_labels_keep_first_occurrence() {
        let fragments = vec![
            fragment("A) ilk değer", 60.0, 120.0),
            fragment("A) ikinci değer", 60.0, 140.0),
            fragment("B) başka", 60.0, 160.0),
        ];
        let options = extract_options(&fragments, &EngineConfig::default());
        assert_eq!(labels(&options), vec!['A', 'B']);
        assert!(options[0].value.starts_with("ilk değer"));
    }

    #[test]
    fn permissive_rescan_claims_bare_letters() {
        let fragments = vec![
            fragment("A) bir", 60.0, 120.0),
            fragment("B) iki", 60.0, 140.0),
            fragment("C üç", 60.0, 160.0),
        ];
        let options = extract_options(&fragments, &EngineConfig::default());
        assert_eq!(labels(&options), vec!['A', 'B', 'C']);
        assert_eq!(options[2].value, "üç");
    }

    #[test]
    fn extraction_is_idempotent_and_label_unique() {
        let fragments = vec![
            fragment("E) beş", 60.0, 200.0),
            fragment("A) bir", 60.0, 120.0),
            fragment("D) dört", 60.0, 180.0),
            fragment("B) iki", 60.0, 140.0),
            fragment("C) üç", 60.0, 160.0),
        ];
        let cfg = EngineConfig::default();
        let first = extract_options(&fragments, &cfg);
        let second = extract_options(&fragments, &cfg);
        assert_eq!(first, second);
        assert_eq!(labels(&first), vec!['A', 'B', 'C', 'D', 'E']);
    }

    #[test]
    fn no_labels_yields_empty() {
        let fragments = vec![fragment("sadece açıklama metni", 50.0, 100.0)];
        assert!(extract_options(&fragments, &EngineConfig::default()).is_empty());
    }
}
