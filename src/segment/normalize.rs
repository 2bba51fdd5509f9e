//! Text normalization
//!
//! Repairs Turkish characters that broken font mappings emit as
//! combining-accent pairs, then collapses whitespace runs. Pure and
//! idempotent; every text-consuming stage runs its input through here.

/// Garbled accent sequences seen in exam PDFs, with their repairs
const REPLACEMENTS: &[(&str, &str)] = &[
    ("˙I", "İ"),
    ("˙i", "İ"),
    ("ˆI", "İ"),
    ("¸s", "ş"),
    ("¸S", "Ş"),
    ("˘g", "ğ"),
    ("˘G", "Ğ"),
    ("ˆı", "ı"),
];

/// Repair known mis-encoded characters and collapse internal whitespace
pub fn normalize(text: &str) -> String {
    let mut repaired = text.to_string();
    for (from, to) in REPLACEMENTS {
        if repaired.contains(from) {
            repaired = repaired.replace(from, to);
        }
    }

    let mut out = String::with_capacity(repaired.len());
    let mut in_space = false;
    for c in repaired.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
