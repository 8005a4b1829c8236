#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Post-hoc dataset comparison and profiling.
pub mod analysis;
/// Strategy, request, and engine configuration types.
pub mod config;
/// Centralized constants grouped by component.
pub mod constants;
/// Record, noise type, and change record types.
pub mod data;
/// Per-dataset schema descriptors and the built-in catalog.
pub mod descriptor;
/// Strategy-weighted routing to a noise family.
pub mod dispatcher;
/// Noise-injection orchestrator.
pub mod engine;
/// Reusable CLI runners behind the demo binaries.
pub mod example_apps;
/// Text-noise generator families.
pub mod generators;
/// Forced-mutation state machine.
pub mod guarantor;
mod hash;
/// Ratio arithmetic and report formatting helpers.
pub mod heuristics;
/// Label preservation and flipping.
pub mod label_policy;
/// Aggregate metrics helpers.
pub mod metrics;
/// JSON persistence and output file naming.
pub mod persist;
/// Deterministic rng streams.
pub mod rng;
/// Stratified target selection.
pub mod sampler;
/// Filesystem scanning used by persistence.
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Text helpers.
pub mod utils;
/// Change diffing and run metadata.
pub mod verifier;

mod errors;

pub use config::{EngineConfig, LabelMode, NoiseRequest, NoiseStrategy, RunMode, RunPlan};
pub use data::{ChangeRecord, FieldValue, NoiseType, Record};
pub use descriptor::{DatasetDescriptor, FlipMapping, StrataKey};
pub use engine::{NoiseEngine, NoiseRun};
pub use errors::NoiseError;
pub use guarantor::{ForcedMutation, MutationState, force_apply};
pub use label_policy::{apply_label_policy, verify_label_policy};
pub use rng::{DeterministicRng, SampleStreams};
pub use sampler::{TargetSelection, select_targets};
pub use types::{
    DatasetName, FieldName, FileNameString, PurposeTag, SampleIndex, StrategyName, StratumKey,
};
pub use verifier::{MetadataAccumulator, RunMetadata, build_change_record};
