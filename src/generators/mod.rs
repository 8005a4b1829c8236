//! Text-noise generators.
//!
//! Each family is a pure `text -> text` transform driven only by the rng it is
//! handed. All of them return empty input unchanged.

/// Typos, transpositions, punctuation and agreement errors.
pub mod grammar;
/// Truncation, duplication, low-information replacement.
pub mod quality;
/// Out-of-context sentences, tangents, topic drift.
pub mod semantic;

use rand::Rng;

use crate::constants::rng::{PURPOSE_GRAMMAR, PURPOSE_QUALITY, PURPOSE_SEMANTIC};
use crate::data::NoiseType;
use crate::types::PurposeTag;

/// Run the generator for `noise_type`. Non-text noise types return the input.
pub fn generate<R: Rng + ?Sized>(noise_type: NoiseType, text: &str, rng: &mut R) -> String {
    match noise_type {
        NoiseType::Grammar => grammar::generate(text, rng),
        NoiseType::Semantic => semantic::generate(text, rng),
        NoiseType::Quality => quality::generate(text, rng),
        NoiseType::LabelFlip | NoiseType::None => text.to_string(),
    }
}

/// Rng purpose tag of a generator family.
pub fn purpose_tag(noise_type: NoiseType) -> PurposeTag {
    match noise_type {
        NoiseType::Grammar => PURPOSE_GRAMMAR,
        NoiseType::Semantic => PURPOSE_SEMANTIC,
        NoiseType::Quality | NoiseType::LabelFlip | NoiseType::None => PURPOSE_QUALITY,
    }
}
