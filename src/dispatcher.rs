//! Strategy-weighted routing of a record to one text-noise family.

use rand::Rng;

use crate::config::NoiseStrategy;
use crate::constants::rng::PURPOSE_DISPATCH;
use crate::data::{FieldValue, NoiseType, Record};
use crate::descriptor::DatasetDescriptor;
use crate::generators;
use crate::rng::SampleStreams;

/// Draw a text-noise family from the strategy weights.
///
/// Cumulative walk over `(grammar, semantic, quality)`; a draw that lands past
/// the cumulative sum (float slack) falls to the last family with non-zero
/// weight.
pub fn draw_noise_type<R: Rng + ?Sized>(strategy: &NoiseStrategy, rng: &mut R) -> NoiseType {
    let roll: f64 = rng.random();
    let mut cumulative = 0.0;
    let mut fallback = NoiseType::Quality;
    for noise_type in NoiseType::TEXT_NOISE {
        let weight = strategy.weight_for(noise_type);
        if weight <= 0.0 {
            continue;
        }
        fallback = noise_type;
        cumulative += weight;
        if roll < cumulative {
            return noise_type;
        }
    }
    fallback
}

/// Run one dispatcher round for the record at `streams.index()`.
///
/// The family is drawn once per attempt and applied to every declared text
/// field, each field on its own lane. Non-text fields are copied through.
pub fn apply(
    record: &Record,
    descriptor: &DatasetDescriptor,
    strategy: &NoiseStrategy,
    streams: &SampleStreams,
    attempt: u32,
) -> (Record, NoiseType) {
    let mut dispatch_rng = streams.rng(PURPOSE_DISPATCH, attempt, 0);
    let noise_type = draw_noise_type(strategy, &mut dispatch_rng);
    let purpose = generators::purpose_tag(noise_type);

    let mut mutated = record.clone();
    for (lane, field) in descriptor.text_fields().iter().enumerate() {
        let Some(text) = record.text(field) else {
            continue;
        };
        let mut rng = streams.rng(purpose, attempt, lane as u32);
        let noisy = generators::generate(noise_type, text, &mut rng);
        mutated.set_existing(field, FieldValue::Text(noisy));
    }
    (mutated, noise_type)
}
