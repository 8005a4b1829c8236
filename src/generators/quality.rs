//! Quality noise: truncation, duplication, low-information replacement.
//!
//! The replacement branch doubles as the universal escape hatch of the
//! forced-mutation loop: for any non-empty input it returns a different string.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::constants::quality::{
    LOW_INFORMATION_RESPONSES, TRUNCATE_MAX_FRACTION, TRUNCATE_MIN_FRACTION, TRUNCATION_MARKER,
};
use crate::utils::WordLayout;

/// Quality corruption variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QualityOp {
    /// Keep a 30-70% word prefix and mark the cut.
    Truncate,
    /// Repeat the text once.
    Duplicate,
    /// Replace the text with a low-information answer.
    Replace,
}

impl QualityOp {
    /// Every operation, in draw order.
    pub const ALL: [QualityOp; 3] = [QualityOp::Truncate, QualityOp::Duplicate, QualityOp::Replace];
}

/// Degrade the text. Empty input is returned unchanged.
pub fn generate<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    if text.is_empty() {
        return String::new();
    }
    let op = *QualityOp::ALL.choose(rng).unwrap_or(&QualityOp::Replace);
    apply(op, text, rng)
}

/// Apply a specific quality corruption.
pub fn apply<R: Rng + ?Sized>(op: QualityOp, text: &str, rng: &mut R) -> String {
    match op {
        QualityOp::Truncate => truncate(text, rng),
        QualityOp::Duplicate => format!("{text} {text}"),
        QualityOp::Replace => replace_with_fallback(text, rng),
    }
}

/// Keep a random word prefix (never fewer than one word) and append the
/// truncation marker. Whitespace-only text falls back to replacement.
pub fn truncate<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let layout = WordLayout::parse(text);
    if layout.is_empty() {
        return replace_with_fallback(text, rng);
    }
    let fraction = rng.random_range(TRUNCATE_MIN_FRACTION..=TRUNCATE_MAX_FRACTION);
    let keep = ((layout.len() as f64) * fraction).round() as usize;
    let keep = keep.clamp(1, layout.len());
    format!("{}{TRUNCATION_MARKER}", layout.prefix(keep))
}

/// Replace the text with a low-information response that differs from it.
/// Empty input stays empty.
pub fn replace_with_fallback<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    if text.is_empty() {
        return String::new();
    }
    let options: Vec<&str> = LOW_INFORMATION_RESPONSES
        .iter()
        .copied()
        .filter(|candidate| *candidate != text)
        .collect();
    options
        .choose(rng)
        .map(|choice| choice.to_string())
        .unwrap_or_else(|| format!("{text}{TRUNCATION_MARKER}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    #[test]
    fn empty_input_is_unchanged() {
        let mut rng = DeterministicRng::new(0);
        assert_eq!(generate("", &mut rng), "");
        assert_eq!(replace_with_fallback("", &mut rng), "");
    }

    #[test]
    fn truncation_keeps_between_thirty_and_seventy_percent_of_words() {
        let text = (0..20).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        for seed in 0..50 {
            let mut rng = DeterministicRng::new(seed);
            let out = truncate(&text, &mut rng);
            assert!(out.ends_with(TRUNCATION_MARKER));
            let kept = WordLayout::parse(out.trim_end_matches(TRUNCATION_MARKER)).len();
            assert!((6..=14).contains(&kept), "kept {kept} words");
            assert!(text.starts_with(out.trim_end_matches(TRUNCATION_MARKER)));
        }
    }

    #[test]
    fn truncation_floors_at_one_word() {
        let mut rng = DeterministicRng::new(4);
        assert_eq!(truncate("word", &mut rng), "word...");
        assert_eq!(truncate("two words", &mut rng), "two...");
    }

    #[test]
    fn duplicate_repeats_text_once() {
        let mut rng = DeterministicRng::new(0);
        assert_eq!(apply(QualityOp::Duplicate, "echo", &mut rng), "echo echo");
    }

    #[test]
    fn fallback_never_returns_input() {
        for seed in 0..50 {
            for text in LOW_INFORMATION_RESPONSES.iter().chain(["x", " "].iter()) {
                let mut rng = DeterministicRng::new(seed);
                let out = replace_with_fallback(text, &mut rng);
                assert_ne!(&out, text);
                assert!(!out.is_empty());
            }
        }
    }

    #[test]
    fn every_op_changes_non_empty_text() {
        for seed in 0..50 {
            for op in QualityOp::ALL {
                for text in ["x", "   ", "a b c d e"] {
                    let mut rng = DeterministicRng::new(seed);
                    assert_ne!(apply(op, text, &mut rng), text, "{op:?} on '{text}'");
                }
            }
        }
    }
}
