//! Before/after diffing and run-level aggregation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{LabelMode, RunPlan};
use crate::data::{ChangeRecord, NoiseType, Record};
use crate::descriptor::DatasetDescriptor;
use crate::heuristics::share;
use crate::types::{DatasetName, FieldName, SampleIndex, StrategyName};

/// Names of fields whose values differ between `original` and `updated`.
pub fn diff_fields(original: &Record, updated: &Record) -> BTreeSet<FieldName> {
    original
        .iter()
        .filter(|(field, value)| updated.get(field) != Some(*value))
        .map(|(field, _)| field.to_string())
        .collect()
}

/// Sum of character-length changes over all fields (integers count as zero).
pub fn length_delta(original: &Record, updated: &Record) -> i64 {
    original
        .iter()
        .map(|(field, value)| {
            let after = updated.get(field).map(|v| v.char_len()).unwrap_or(0);
            after as i64 - value.char_len() as i64
        })
        .sum()
}

/// Build the change annotation for one sample.
///
/// An unchanged record is always reported with [`NoiseType::None`], whatever
/// the caller passes in `noise_type`.
pub fn build_change_record(
    sample_index: SampleIndex,
    was_targeted: bool,
    noise_type: NoiseType,
    original: &Record,
    updated: &Record,
) -> ChangeRecord {
    let fields_changed = diff_fields(original, updated);
    let noise_type_applied = if fields_changed.is_empty() {
        NoiseType::None
    } else {
        noise_type
    };
    ChangeRecord {
        sample_index,
        was_targeted,
        noise_type_applied,
        fields_changed,
        length_delta: length_delta(original, updated),
    }
}

/// Aggregate description of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Descriptor name of the dataset.
    pub dataset: DatasetName,
    /// `None` for label-flip runs.
    pub strategy: Option<StrategyName>,
    /// Label handling used by the run.
    pub label_mode: LabelMode,
    /// Requested target fraction.
    pub noise_ratio: f64,
    /// Global seed.
    pub seed: u64,
    /// Dispatcher attempts before escalation.
    pub max_attempts: u32,
    /// Records in the input.
    pub total_samples: usize,
    /// Strata the sampler partitioned the input into.
    pub num_strata: usize,
    /// Records selected by the sampler.
    pub target_count: usize,
    /// Targeted records whose final value differs from the original.
    pub changed_count: usize,
    /// Targeted records no generator could alter (empty text fields).
    pub unchangeable_count: usize,
    /// Records changed only by the quality fallback. Unchangeable records
    /// are not included.
    pub escalated_count: usize,
    /// Targeted records per applied noise type.
    pub noise_type_counts: BTreeMap<NoiseType, usize>,
    /// Records in which each field changed.
    pub field_change_counts: BTreeMap<FieldName, usize>,
    /// Records with at least one changed label field.
    pub label_change_count: usize,
    /// Mean length delta over targeted records.
    pub mean_length_delta: f64,
    /// `target_count / total_samples`.
    pub realized_ratio: f64,
}

impl RunMetadata {
    /// Share of targeted records that actually changed.
    pub fn effectiveness(&self) -> f64 {
        share(self.changed_count, self.target_count)
    }
}

/// Streaming builder for [`RunMetadata`]. Feed change records in index order.
#[derive(Debug)]
pub struct MetadataAccumulator<'a> {
    descriptor: &'a DatasetDescriptor,
    plan: &'a RunPlan,
    max_attempts: u32,
    num_strata: usize,
    total: usize,
    targets: usize,
    changed: usize,
    unchangeable: usize,
    escalated: usize,
    noise_type_counts: BTreeMap<NoiseType, usize>,
    field_change_counts: BTreeMap<FieldName, usize>,
    label_changes: usize,
    length_delta_sum: i64,
}

impl<'a> MetadataAccumulator<'a> {
    /// Start an empty accumulator for one run.
    pub fn new(
        descriptor: &'a DatasetDescriptor,
        plan: &'a RunPlan,
        max_attempts: u32,
        num_strata: usize,
    ) -> Self {
        Self {
            descriptor,
            plan,
            max_attempts,
            num_strata,
            total: 0,
            targets: 0,
            changed: 0,
            unchangeable: 0,
            escalated: 0,
            noise_type_counts: BTreeMap::new(),
            field_change_counts: BTreeMap::new(),
            label_changes: 0,
            length_delta_sum: 0,
        }
    }

    /// Fold one record's outcome into the totals.
    pub fn observe(&mut self, change: &ChangeRecord, escalated: bool) {
        self.total += 1;
        if !change.fields_changed.is_empty() {
            self.changed += 1;
        }
        for field in &change.fields_changed {
            *self.field_change_counts.entry(field.clone()).or_default() += 1;
        }
        if change
            .fields_changed
            .iter()
            .any(|field| self.descriptor.is_label_field(field))
        {
            self.label_changes += 1;
        }
        if !change.was_targeted {
            return;
        }
        self.targets += 1;
        self.length_delta_sum += change.length_delta;
        *self
            .noise_type_counts
            .entry(change.noise_type_applied)
            .or_default() += 1;
        if change.is_unchangeable() {
            self.unchangeable += 1;
        }
        if escalated {
            self.escalated += 1;
        }
    }

    /// Final metadata.
    pub fn finish(self) -> RunMetadata {
        let mean_length_delta = if self.targets == 0 {
            0.0
        } else {
            self.length_delta_sum as f64 / self.targets as f64
        };
        RunMetadata {
            dataset: self.descriptor.name().to_string(),
            strategy: self.plan.mode.strategy().map(|s| s.name.clone()),
            label_mode: self.plan.mode.label_mode(),
            noise_ratio: self.plan.noise_ratio,
            seed: self.plan.seed,
            max_attempts: self.max_attempts,
            total_samples: self.total,
            num_strata: self.num_strata,
            target_count: self.targets,
            changed_count: self.changed,
            unchangeable_count: self.unchangeable,
            escalated_count: self.escalated,
            noise_type_counts: self.noise_type_counts,
            field_change_counts: self.field_change_counts,
            label_change_count: self.label_changes,
            mean_length_delta,
            realized_ratio: share(self.targets, self.total),
        }
    }
}
