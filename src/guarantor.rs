//! Forced-mutation loop.
//!
//! A targeted record is run through the dispatcher until a text field changes.
//! The loop is an explicit state machine:
//!
//! ```text
//! Attempting(0) -> Attempting(1) -> ... -> Attempting(max - 1)
//!       |                |                        |
//!       +---- changed ---+------------------------+--> Done
//!                                                 |
//!                                    exhausted -> Escalated -> Done
//!                                                     |
//!                                                     +-> Exhausted
//! ```
//!
//! `Escalated` applies the quality fallback to every non-empty text field,
//! which always changes such a field, so `Exhausted` is only reachable when
//! every text field is empty.

use tracing::debug;

use crate::config::NoiseStrategy;
use crate::constants::rng::PURPOSE_ESCALATION;
use crate::data::{FieldValue, NoiseType, Record};
use crate::descriptor::DatasetDescriptor;
use crate::dispatcher;
use crate::generators::quality;
use crate::rng::SampleStreams;

/// State of the forced-mutation loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationState {
    /// Dispatcher attempt `n` (zero-based) is about to run.
    Attempting(u32),
    /// Every attempt left the text unchanged; apply the quality fallback.
    Escalated,
    /// Nothing could change the record.
    Exhausted,
}

/// Outcome of [`force_apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct ForcedMutation {
    /// Mutated record (equal to the input when `exhausted`).
    pub record: Record,
    /// Family that produced the final text, or `None` when exhausted.
    pub noise_type: NoiseType,
    /// Generator rounds run, including the escalation round.
    pub attempts: u32,
    /// Whether the quality fallback produced the final text. Exhausted
    /// records are not counted as escalated.
    pub escalated: bool,
    /// Whether the record could not be changed at all.
    pub exhausted: bool,
}

/// True when any declared text field of `a` differs from `b`.
pub fn text_fields_differ(descriptor: &DatasetDescriptor, a: &Record, b: &Record) -> bool {
    descriptor
        .text_fields()
        .iter()
        .any(|field| a.get(field) != b.get(field))
}

/// Mutate `record` until at least one text field differs from the input.
///
/// Terminates within `max_attempts + 1` generator rounds. `max_attempts` of
/// zero is treated as one; callers validate it through
/// [`EngineConfig`](crate::config::EngineConfig).
pub fn force_apply(
    record: &Record,
    descriptor: &DatasetDescriptor,
    strategy: &NoiseStrategy,
    streams: &SampleStreams,
    max_attempts: u32,
) -> ForcedMutation {
    let max_attempts = max_attempts.max(1);
    let mut state = MutationState::Attempting(0);
    loop {
        match state {
            MutationState::Attempting(attempt) => {
                let (candidate, noise_type) =
                    dispatcher::apply(record, descriptor, strategy, streams, attempt);
                if text_fields_differ(descriptor, record, &candidate) {
                    return ForcedMutation {
                        record: candidate,
                        noise_type,
                        attempts: attempt + 1,
                        escalated: false,
                        exhausted: false,
                    };
                }
                state = if attempt + 1 < max_attempts {
                    MutationState::Attempting(attempt + 1)
                } else {
                    MutationState::Escalated
                };
            }
            MutationState::Escalated => {
                debug!(
                    "[noise:engine] record {} unchanged after {} attempts; escalating",
                    streams.index(),
                    max_attempts
                );
                let candidate = escalate(record, descriptor, streams);
                if text_fields_differ(descriptor, record, &candidate) {
                    return ForcedMutation {
                        record: candidate,
                        noise_type: NoiseType::Quality,
                        attempts: max_attempts + 1,
                        escalated: true,
                        exhausted: false,
                    };
                }
                state = MutationState::Exhausted;
            }
            MutationState::Exhausted => {
                return ForcedMutation {
                    record: record.clone(),
                    noise_type: NoiseType::None,
                    attempts: max_attempts + 1,
                    escalated: false,
                    exhausted: true,
                };
            }
        }
    }
}

fn escalate(record: &Record, descriptor: &DatasetDescriptor, streams: &SampleStreams) -> Record {
    let mut mutated = record.clone();
    for (lane, field) in descriptor.text_fields().iter().enumerate() {
        let Some(text) = record.text(field).filter(|text| !text.is_empty()) else {
            continue;
        };
        let mut rng = streams.rng(PURPOSE_ESCALATION, 0, lane as u32);
        let replaced = quality::replace_with_fallback(text, &mut rng);
        mutated.set_existing(field, FieldValue::Text(replaced));
    }
    mutated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str) -> Record {
        Record::from_fields([("question", text), ("answer", "42")])
    }

    #[test]
    fn single_character_text_is_always_changed() {
        let descriptor = DatasetDescriptor::gsm8k();
        let grammar_only = NoiseStrategy::new("grammar_only", [1.0, 0.0, 0.0]).unwrap();
        for index in 0..100 {
            let streams = SampleStreams::new(42, index);
            let outcome = force_apply(&question("x"), &descriptor, &grammar_only, &streams, 3);
            assert_ne!(outcome.record.text("question"), Some("x"));
            // Grammar leaves one-word text alone, so every round escalates.
            assert!(outcome.escalated);
            assert!(!outcome.exhausted);
            assert_eq!(outcome.attempts, 4);
            assert_eq!(outcome.noise_type, NoiseType::Quality);
            assert_eq!(outcome.record.text("answer"), Some("42"));
        }
    }

    #[test]
    fn empty_text_exhausts_without_error() {
        let descriptor = DatasetDescriptor::gsm8k();
        let streams = SampleStreams::new(1, 0);
        let outcome = force_apply(
            &question(""),
            &descriptor,
            &NoiseStrategy::balanced(),
            &streams,
            2,
        );
        assert!(outcome.exhausted);
        assert!(!outcome.escalated);
        assert_eq!(outcome.noise_type, NoiseType::None);
        assert_eq!(outcome.record, question(""));
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn ordinary_text_changes_on_first_attempt() {
        let descriptor = DatasetDescriptor::gsm8k();
        let text = "Natalia sold clips to 48 of her friends in April.";
        for index in 0..50 {
            let streams = SampleStreams::new(9, index);
            let outcome = force_apply(
                &question(text),
                &descriptor,
                &NoiseStrategy::balanced(),
                &streams,
                3,
            );
            assert_eq!(outcome.attempts, 1);
            assert!(!outcome.escalated);
            assert_ne!(outcome.record.text("question"), Some(text));
        }
    }

    #[test]
    fn zero_max_attempts_still_runs_one_round() {
        let descriptor = DatasetDescriptor::gsm8k();
        let streams = SampleStreams::new(3, 3);
        let outcome = force_apply(
            &question("two words"),
            &descriptor,
            &NoiseStrategy::grammar_heavy(),
            &streams,
            0,
        );
        assert!(outcome.attempts >= 1);
        assert_ne!(outcome.record.text("question"), Some("two words"));
    }
}
