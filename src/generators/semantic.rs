//! Semantic noise: content that does not belong in the sample.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::constants::semantic::{DRIFT_CLAUSES, OUT_OF_CONTEXT_SENTENCES, TANGENT_SENTENCES};
use crate::utils::{WordLayout, ends_sentence};

/// Semantic corruption variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticOp {
    /// Insert an unrelated sentence at a sentence boundary.
    InjectSentence,
    /// Append a conversational tangent.
    AppendTangent,
    /// Splice a topic-drift clause after a word.
    SpliceDrift,
}

impl SemanticOp {
    /// Every operation, in draw order.
    pub const ALL: [SemanticOp; 3] = [
        SemanticOp::InjectSentence,
        SemanticOp::AppendTangent,
        SemanticOp::SpliceDrift,
    ];
}

/// Add off-topic content. Non-empty input always grows; empty input is
/// returned unchanged.
pub fn generate<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    if text.is_empty() {
        return String::new();
    }
    let op = *SemanticOp::ALL
        .choose(rng)
        .unwrap_or(&SemanticOp::AppendTangent);
    apply(op, text, rng)
}

/// Apply a specific semantic corruption.
pub fn apply<R: Rng + ?Sized>(op: SemanticOp, text: &str, rng: &mut R) -> String {
    let mut layout = WordLayout::parse(text);
    if layout.is_empty() {
        // Whitespace-only text: nothing to splice into.
        return format!("{text}{}", pick(&TANGENT_SENTENCES, rng));
    }
    match op {
        SemanticOp::InjectSentence => {
            // Boundaries: before the first word, or after any sentence end.
            let mut boundaries = vec![0];
            boundaries.extend(
                layout
                    .words()
                    .iter()
                    .enumerate()
                    .filter(|(_, word)| ends_sentence(word))
                    .map(|(idx, _)| idx + 1),
            );
            let position = *boundaries.choose(rng).unwrap_or(&0);
            layout.insert_word(position, pick(&OUT_OF_CONTEXT_SENTENCES, rng));
        }
        SemanticOp::AppendTangent => {
            let len = layout.len();
            layout.insert_word(len, pick(&TANGENT_SENTENCES, rng));
        }
        SemanticOp::SpliceDrift => {
            let last = layout.len() - 1;
            let idx = if last == 0 {
                0
            } else {
                rng.random_range(0..last)
            };
            let word = format!("{}{}", layout.words()[idx], pick(&DRIFT_CLAUSES, rng));
            layout.set_word(idx, word);
        }
    }
    layout.render()
}

fn pick<R: Rng + ?Sized>(pool: &[&'static str], rng: &mut R) -> &'static str {
    pool.choose(rng).copied().unwrap_or_default()
}
