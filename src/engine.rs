//! Noise-injection orchestrator.
//!
//! [`NoiseEngine::run`] validates everything up front, draws the target set,
//! then transforms each record independently:
//!
//! 1. untargeted records are copied through,
//! 2. targeted records go through the forced-mutation loop (text noise) or the
//!    flip mapping (label flip),
//! 3. the label policy is applied last and re-verified,
//! 4. the change record is built and folded into the run metadata.
//!
//! Per-record work depends only on the record, its target membership, and
//! streams keyed by its index, so the rayon path yields exactly the
//! sequential output.

use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, LabelMode, NoiseRequest, RunMode, RunPlan};
use crate::constants::engine::DEFAULT_EXPERIMENT_RATIOS;
use crate::data::{ChangeRecord, NoiseType, Record};
use crate::descriptor::DatasetDescriptor;
use crate::errors::NoiseError;
use crate::guarantor::{force_apply, text_fields_differ};
use crate::heuristics::{format_percent, format_u128_with_commas};
use crate::label_policy::{apply_label_policy, verify_label_policy};
use crate::rng::SampleStreams;
use crate::sampler::{TargetSelection, select_targets};
use crate::types::SampleIndex;
use crate::utils::join_fields;
use crate::verifier::{MetadataAccumulator, RunMetadata, build_change_record};

/// Output of one run. `records[i]` and `changes[i]` correspond to input `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseRun {
    /// Noisy records, aligned with the input.
    pub records: Vec<Record>,
    /// One change record per input record.
    pub changes: Vec<ChangeRecord>,
    /// Aggregate statistics of the run.
    pub metadata: RunMetadata,
}

impl NoiseRun {
    /// Indices of targeted records, ascending.
    pub fn targeted_indices(&self) -> Vec<SampleIndex> {
        self.changes
            .iter()
            .filter(|change| change.was_targeted)
            .map(|change| change.sample_index)
            .collect()
    }
}

struct ProcessedRecord {
    record: Record,
    change: ChangeRecord,
    escalated: bool,
}

/// Ratios an experiment sweep runs: `ratios`, or the default sweep when empty.
pub fn experiment_ratios(ratios: &[f64]) -> &[f64] {
    if ratios.is_empty() {
        &DEFAULT_EXPERIMENT_RATIOS
    } else {
        ratios
    }
}

/// Runs noise requests against one dataset kind.
#[derive(Clone, Debug)]
pub struct NoiseEngine {
    descriptor: DatasetDescriptor,
    config: EngineConfig,
}

impl NoiseEngine {
    /// Build an engine, rejecting an invalid config.
    pub fn new(descriptor: DatasetDescriptor, config: EngineConfig) -> Result<Self, NoiseError> {
        Ok(Self {
            descriptor,
            config: config.validated()?,
        })
    }

    /// Dataset this engine runs against.
    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    /// Engine knobs.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Apply `request` to `records`.
    ///
    /// Configuration and schema errors are raised before any record is
    /// processed. Invariant failures abort the run; with the parallel path the
    /// reported failure is the one with the lowest record index.
    pub fn run(&self, records: &[Record], request: &NoiseRequest) -> Result<NoiseRun, NoiseError> {
        let started = Instant::now();
        let plan = request.resolve(&self.descriptor)?;
        if records.is_empty() {
            return Err(NoiseError::Configuration(format!(
                "dataset '{}': no records to process",
                self.descriptor.name()
            )));
        }
        for (idx, record) in records.iter().enumerate() {
            self.descriptor.validate_record(idx, record)?;
        }

        info!(
            "[noise:engine] run start dataset={} records={} ratio={} mode={} strategy={} seed={} text_fields={}",
            self.descriptor.name(),
            format_u128_with_commas(records.len() as u128),
            plan.noise_ratio,
            plan.mode.label_mode(),
            plan.mode.strategy().map(|s| s.name.as_str()).unwrap_or("-"),
            plan.seed,
            join_fields(self.descriptor.text_fields())
        );

        let strata = self.descriptor.strata();
        let selection = select_targets(
            records,
            plan.noise_ratio,
            |record| strata.key_for(record),
            plan.seed,
        )?;
        if selection.is_empty() {
            warn!(
                "[noise:engine] ratio {} selects no records across {} strata; output equals input",
                plan.noise_ratio,
                selection.num_strata()
            );
        } else {
            info!(
                "[noise:engine] selected {} targets across {} strata",
                selection.len(),
                selection.num_strata()
            );
        }

        let processed = self.process_all(records, &selection, &plan)?;

        let mut accumulator = MetadataAccumulator::new(
            &self.descriptor,
            &plan,
            self.config.max_attempts,
            selection.num_strata(),
        );
        let mut out_records = Vec::with_capacity(processed.len());
        let mut changes = Vec::with_capacity(processed.len());
        for item in processed {
            if item.change.is_unchangeable() {
                warn!(
                    "[noise:engine] record {} is unchangeable (empty text fields)",
                    item.change.sample_index
                );
            }
            accumulator.observe(&item.change, item.escalated);
            out_records.push(item.record);
            changes.push(item.change);
        }
        let metadata = accumulator.finish();

        for (noise_type, count) in &metadata.noise_type_counts {
            debug!("[noise:engine] {}: {}", noise_type, count);
        }
        info!(
            "[noise:engine] run complete in {:.2}s (targets={}, changed={}, unchangeable={}, escalated={}, effectiveness={})",
            started.elapsed().as_secs_f64(),
            metadata.target_count,
            metadata.changed_count,
            metadata.unchangeable_count,
            metadata.escalated_count,
            format_percent(metadata.effectiveness())
        );

        Ok(NoiseRun {
            records: out_records,
            changes,
            metadata,
        })
    }

    /// Run `base` once per ratio over the same records. An empty `ratios`
    /// slice runs the default 10/20/30 percent sweep.
    pub fn run_experiments(
        &self,
        records: &[Record],
        ratios: &[f64],
        base: &NoiseRequest,
    ) -> Result<Vec<NoiseRun>, NoiseError> {
        experiment_ratios(ratios)
            .iter()
            .map(|ratio| {
                let request = NoiseRequest {
                    noise_ratio: *ratio,
                    ..base.clone()
                };
                self.run(records, &request)
            })
            .collect()
    }

    fn process_all(
        &self,
        records: &[Record],
        selection: &TargetSelection,
        plan: &RunPlan,
    ) -> Result<Vec<ProcessedRecord>, NoiseError> {
        if !self.config.parallel {
            return records
                .iter()
                .enumerate()
                .map(|(idx, record)| {
                    self.process_record(idx, record, selection.contains(idx), plan)
                })
                .collect();
        }
        let results: Vec<Result<ProcessedRecord, NoiseError>> = records
            .par_iter()
            .enumerate()
            .map(|(idx, record)| self.process_record(idx, record, selection.contains(idx), plan))
            .collect();
        // In-order collect surfaces the lowest-index failure.
        results.into_iter().collect()
    }

    fn process_record(
        &self,
        index: SampleIndex,
        original: &Record,
        targeted: bool,
        plan: &RunPlan,
    ) -> Result<ProcessedRecord, NoiseError> {
        let mode = plan.mode.label_mode();
        let (final_record, noise_type, escalated) = match (&plan.mode, targeted) {
            (_, false) => (original.clone(), NoiseType::None, false),
            (RunMode::TextNoise(strategy), true) => {
                let streams = SampleStreams::new(plan.seed, index);
                let forced = force_apply(
                    original,
                    &self.descriptor,
                    strategy,
                    &streams,
                    self.config.max_attempts,
                );
                let final_record = apply_label_policy(
                    original,
                    &forced.record,
                    LabelMode::Preserve,
                    &self.descriptor,
                    index,
                )?;
                self.check_forced_mutation(index, original, &final_record)?;
                (final_record, forced.noise_type, forced.escalated)
            }
            (RunMode::LabelFlip, true) => {
                let final_record = apply_label_policy(
                    original,
                    original,
                    LabelMode::Flip,
                    &self.descriptor,
                    index,
                )?;
                (final_record, NoiseType::LabelFlip, false)
            }
        };
        verify_label_policy(
            original,
            &final_record,
            mode,
            targeted,
            &self.descriptor,
            index,
        )?;
        let change = build_change_record(index, targeted, noise_type, original, &final_record);
        Ok(ProcessedRecord {
            record: final_record,
            change,
            escalated,
        })
    }

    /// A targeted record with any non-empty text field must come out changed.
    fn check_forced_mutation(
        &self,
        index: SampleIndex,
        original: &Record,
        final_record: &Record,
    ) -> Result<(), NoiseError> {
        let has_text = self
            .descriptor
            .text_fields()
            .iter()
            .any(|field| original.text(field).is_some_and(|text| !text.is_empty()));
        if has_text && !text_fields_differ(&self.descriptor, original, final_record) {
            return Err(NoiseError::InvariantViolation {
                index,
                details: "targeted record with non-empty text left unchanged".into(),
            });
        }
        Ok(())
    }
}
