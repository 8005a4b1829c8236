//! Post-hoc comparison of original and noisy datasets.
//!
//! Everything here works from records on disk as well as from an in-memory
//! [`NoiseRun`](crate::engine::NoiseRun). Only [`compare_samples`] needs
//! change records; the diffs work from records alone.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::analysis::MIN_COMPARED_DATASETS;
use crate::data::{ChangeRecord, FieldValue, NoiseType, Record};
use crate::descriptor::DatasetDescriptor;
use crate::errors::NoiseError;
use crate::heuristics::{ratio_to_percent, share};
use crate::types::{DatasetName, FieldName, SampleIndex, StrategyName};
use crate::utils::sentences;
use crate::verifier::{RunMetadata, diff_fields, length_delta};

fn check_aligned(original: &[Record], noisy: &[Record]) -> Result<(), NoiseError> {
    if original.len() != noisy.len() {
        return Err(NoiseError::Configuration(format!(
            "cannot compare datasets of different sizes ({} vs {})",
            original.len(),
            noisy.len()
        )));
    }
    Ok(())
}

/// Indices whose text fields differ between the two datasets.
pub fn estimate_noisy_indices(
    original: &[Record],
    noisy: &[Record],
    descriptor: &DatasetDescriptor,
) -> Result<Vec<SampleIndex>, NoiseError> {
    check_aligned(original, noisy)?;
    Ok(original
        .iter()
        .zip(noisy)
        .enumerate()
        .filter(|(_, (before, after))| {
            descriptor
                .text_fields()
                .iter()
                .any(|field| before.get(field) != after.get(field))
        })
        .map(|(idx, _)| idx)
        .collect())
}

/// Observed effect of noise, reconstructed by diffing datasets.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoiseImpact {
    /// Records compared.
    pub total_samples: usize,
    /// Records with at least one changed field.
    pub changed_samples: usize,
    /// Changed records over all records.
    pub realized_ratio: f64,
    /// Mean length delta over changed records.
    pub mean_length_delta: f64,
    /// Field -> records whose value differs.
    pub field_changes: BTreeMap<FieldName, usize>,
}

/// Diff two aligned datasets and summarize what changed.
pub fn noise_impact(original: &[Record], noisy: &[Record]) -> Result<NoiseImpact, NoiseError> {
    check_aligned(original, noisy)?;
    let mut changed = 0usize;
    let mut delta_sum = 0i64;
    let mut field_changes: BTreeMap<FieldName, usize> = BTreeMap::new();
    for (before, after) in original.iter().zip(noisy) {
        let fields = diff_fields(before, after);
        if fields.is_empty() {
            continue;
        }
        changed += 1;
        delta_sum += length_delta(before, after);
        for field in fields {
            *field_changes.entry(field).or_default() += 1;
        }
    }
    Ok(NoiseImpact {
        total_samples: original.len(),
        changed_samples: changed,
        realized_ratio: share(changed, original.len()),
        mean_length_delta: if changed == 0 {
            0.0
        } else {
            delta_sum as f64 / changed as f64
        },
        field_changes,
    })
}

/// Per label field: how many records changed that label.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LabelPreservationReport {
    /// Records compared.
    pub compared: usize,
    /// Label field -> records whose label differs.
    pub changed_per_field: BTreeMap<FieldName, usize>,
    /// Declared label fields missing from the data.
    pub missing_fields: Vec<FieldName>,
}

impl LabelPreservationReport {
    /// True when no present label field changed.
    pub fn all_preserved(&self) -> bool {
        self.changed_per_field.values().all(|count| *count == 0)
    }
}

/// Count label changes between two aligned datasets.
pub fn label_preservation(
    original: &[Record],
    noisy: &[Record],
    descriptor: &DatasetDescriptor,
) -> Result<LabelPreservationReport, NoiseError> {
    check_aligned(original, noisy)?;
    let mut report = LabelPreservationReport {
        compared: original.len(),
        ..LabelPreservationReport::default()
    };
    for field in descriptor.label_fields() {
        if original.first().is_some_and(|record| !record.contains(field)) {
            report.missing_fields.push(field.clone());
            continue;
        }
        let changed = original
            .iter()
            .zip(noisy)
            .filter(|(before, after)| before.get(field) != after.get(field))
            .count();
        report.changed_per_field.insert(field.clone(), changed);
    }
    Ok(report)
}

/// Character-length statistics of one text field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LengthStats {
    /// Mean length in characters.
    pub mean: f64,
    /// Shortest length.
    pub min: usize,
    /// Longest length.
    pub max: usize,
    /// Mean sentence count.
    pub mean_sentences: f64,
}

/// Shape of one dataset file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetProfile {
    /// Dataset the profile describes.
    pub dataset: DatasetName,
    /// Record count.
    pub samples: usize,
    /// Length statistics per text field present in the data.
    pub text_lengths: BTreeMap<FieldName, LengthStats>,
    /// Label field -> rendered label value -> count.
    pub label_distribution: BTreeMap<FieldName, BTreeMap<String, usize>>,
}

/// Text length and label statistics for one dataset.
pub fn profile_dataset(records: &[Record], descriptor: &DatasetDescriptor) -> DatasetProfile {
    let mut text_lengths = BTreeMap::new();
    for field in descriptor.text_fields() {
        let texts: Vec<&str> = records.iter().filter_map(|r| r.text(field)).collect();
        if texts.is_empty() {
            continue;
        }
        let lengths: Vec<usize> = texts.iter().map(|text| text.chars().count()).collect();
        let sentence_total: usize = texts.iter().map(|text| sentences(text).len()).sum();
        text_lengths.insert(
            field.clone(),
            LengthStats {
                mean: lengths.iter().sum::<usize>() as f64 / lengths.len() as f64,
                min: lengths.iter().copied().min().unwrap_or(0),
                max: lengths.iter().copied().max().unwrap_or(0),
                mean_sentences: sentence_total as f64 / texts.len() as f64,
            },
        );
    }

    let mut label_distribution = BTreeMap::new();
    for field in descriptor.label_fields() {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in records.iter().filter_map(|r| r.get(field)) {
            *counts.entry(value.to_string()).or_default() += 1;
        }
        label_distribution.insert(field.clone(), counts);
    }

    DatasetProfile {
        dataset: descriptor.name().to_string(),
        samples: records.len(),
        text_lengths,
        label_distribution,
    }
}

/// One row of an experiment summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExperimentRow {
    /// Dataset name.
    pub dataset: DatasetName,
    /// Strategy, `None` for label-flip runs.
    pub strategy: Option<StrategyName>,
    /// Requested ratio.
    pub noise_ratio: f64,
    /// Records selected for noise.
    pub target_count: usize,
    /// Records with at least one changed field.
    pub changed_count: usize,
    /// Targeted records no operation could change.
    pub unchangeable_count: usize,
    /// Changed records over all records.
    pub realized_ratio: f64,
    /// Mean length delta over targeted records.
    pub mean_length_delta: f64,
    /// Changed records over targeted records.
    pub effectiveness: f64,
}

impl From<&RunMetadata> for ExperimentRow {
    fn from(metadata: &RunMetadata) -> Self {
        Self {
            dataset: metadata.dataset.clone(),
            strategy: metadata.strategy.clone(),
            noise_ratio: metadata.noise_ratio,
            target_count: metadata.target_count,
            changed_count: metadata.changed_count,
            unchangeable_count: metadata.unchangeable_count,
            realized_ratio: metadata.realized_ratio,
            mean_length_delta: metadata.mean_length_delta,
            effectiveness: metadata.effectiveness(),
        }
    }
}

/// Summary rows ordered by ratio, then strategy.
pub fn summarize_experiments<'a, I>(runs: I) -> Vec<ExperimentRow>
where
    I: IntoIterator<Item = &'a RunMetadata>,
{
    let mut rows: Vec<ExperimentRow> = runs.into_iter().map(ExperimentRow::from).collect();
    rows.sort_by(|a, b| {
        a.noise_ratio
            .total_cmp(&b.noise_ratio)
            .then_with(|| a.strategy.cmp(&b.strategy))
    });
    rows
}

/// One run per dataset at a shared ratio and strategy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossDatasetComparison {
    /// Compared ratio.
    pub noise_ratio: f64,
    /// Compared strategy; `None` compares label-flip runs.
    pub strategy: Option<StrategyName>,
    /// One row per dataset, in dataset name order.
    pub rows: Vec<ExperimentRow>,
}

impl CrossDatasetComparison {
    /// Rows ordered by realized ratio, then effectiveness, highest first.
    pub fn ranking(&self) -> Vec<&ExperimentRow> {
        let mut ranked: Vec<&ExperimentRow> = self.rows.iter().collect();
        ranked.sort_by(|a, b| {
            b.realized_ratio
                .total_cmp(&a.realized_ratio)
                .then_with(|| b.effectiveness.total_cmp(&a.effectiveness))
                .then_with(|| a.dataset.cmp(&b.dataset))
        });
        ranked
    }
}

/// Line up runs of `strategy` at `noise_ratio` across datasets.
///
/// Ratios match on their whole percent, the precision file names carry. The
/// first matching run of each dataset is used. Returns `None` when fewer than
/// two datasets have a matching run.
pub fn compare_across_datasets<'a, I>(
    runs: I,
    noise_ratio: f64,
    strategy: Option<&str>,
) -> Option<CrossDatasetComparison>
where
    I: IntoIterator<Item = &'a RunMetadata>,
{
    let percent = ratio_to_percent(noise_ratio);
    let mut per_dataset: BTreeMap<DatasetName, ExperimentRow> = BTreeMap::new();
    for metadata in runs {
        if ratio_to_percent(metadata.noise_ratio) != percent
            || metadata.strategy.as_deref() != strategy
        {
            continue;
        }
        per_dataset
            .entry(metadata.dataset.clone())
            .or_insert_with(|| ExperimentRow::from(metadata));
    }
    if per_dataset.len() < MIN_COMPARED_DATASETS {
        return None;
    }
    Some(CrossDatasetComparison {
        noise_ratio,
        strategy: strategy.map(str::to_string),
        rows: per_dataset.into_values().collect(),
    })
}

/// Before and after value of one changed field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldComparison {
    /// Field name.
    pub field: FieldName,
    /// Value in the original dataset.
    pub before: FieldValue,
    /// Value in the noisy dataset.
    pub after: FieldValue,
}

/// Before/after view of one changed record.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleComparison {
    /// Record position.
    pub index: SampleIndex,
    /// Noise family recorded for the record.
    pub noise_type: NoiseType,
    /// Changed fields, in name order.
    pub fields: Vec<FieldComparison>,
}

/// Up to `limit` changed records, in index order, with each changed field
/// shown before and after.
pub fn compare_samples(
    original: &[Record],
    noisy: &[Record],
    changes: &[ChangeRecord],
    limit: usize,
) -> Result<Vec<SampleComparison>, NoiseError> {
    check_aligned(original, noisy)?;
    if changes.len() != original.len() {
        return Err(NoiseError::Configuration(format!(
            "{} change records for {} samples",
            changes.len(),
            original.len()
        )));
    }
    changes
        .iter()
        .filter(|change| !change.fields_changed.is_empty())
        .take(limit)
        .map(|change| {
            let index = change.sample_index;
            let (Some(before), Some(after)) = (original.get(index), noisy.get(index)) else {
                return Err(NoiseError::Configuration(format!(
                    "change record points at sample {index} outside the dataset"
                )));
            };
            let fields = change
                .fields_changed
                .iter()
                .filter_map(|field| {
                    Some(FieldComparison {
                        field: field.clone(),
                        before: before.get(field)?.clone(),
                        after: after.get(field)?.clone(),
                    })
                })
                .collect();
            Ok(SampleComparison {
                index,
                noise_type: change.noise_type_applied,
                fields,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FieldValue;

    fn sst2(sentence: &str, label: i64) -> Record {
        Record::from_fields([
            ("sentence", FieldValue::from(sentence)),
            ("label", FieldValue::Integer(label)),
        ])
    }

    #[test]
    fn noisy_indices_and_impact_come_from_diffs() {
        let descriptor = DatasetDescriptor::sst2();
        let original = vec![sst2("good", 1), sst2("bad", 0), sst2("fine", 1)];
        let noisy = vec![sst2("good", 1), sst2("bad bad", 0), sst2("fien", 0)];
        assert_eq!(
            estimate_noisy_indices(&original, &noisy, &descriptor).unwrap(),
            vec![1, 2]
        );
        let impact = noise_impact(&original, &noisy).unwrap();
        assert_eq!(impact.changed_samples, 2);
        assert!((impact.realized_ratio - 2.0 / 3.0).abs() < 1e-12);
        assert!((impact.mean_length_delta - 2.0).abs() < 1e-12);
        assert_eq!(impact.field_changes.get("label"), Some(&1));
        assert_eq!(impact.field_changes.get("sentence"), Some(&2));
    }

    #[test]
    fn label_report_flags_changes_and_missing_fields() {
        let descriptor = DatasetDescriptor::sst2();
        let original = vec![sst2("a", 1), sst2("b", 0)];
        let preserved = vec![sst2("a!", 1), sst2("b", 0)];
        let report = label_preservation(&original, &preserved, &descriptor).unwrap();
        assert!(report.all_preserved());

        let flipped = vec![sst2("a", 0), sst2("b", 0)];
        let report = label_preservation(&original, &flipped, &descriptor).unwrap();
        assert_eq!(report.changed_per_field.get("label"), Some(&1));
        assert!(!report.all_preserved());

        let unlabeled = vec![Record::from_fields([("sentence", "x")])];
        let report = label_preservation(&unlabeled, &unlabeled, &descriptor).unwrap();
        assert_eq!(report.missing_fields, vec!["label".to_string()]);
    }

    #[test]
    fn misaligned_datasets_are_rejected() {
        let descriptor = DatasetDescriptor::sst2();
        let err = estimate_noisy_indices(&[sst2("a", 1)], &[], &descriptor).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn profile_reports_lengths_and_labels() {
        let descriptor = DatasetDescriptor::sst2();
        let records = vec![
            sst2("One. Two.", 1),
            sst2("abc", 0),
            sst2("Longer sentence!", 1),
        ];
        let profile = profile_dataset(&records, &descriptor);
        assert_eq!(profile.samples, 3);
        let stats = &profile.text_lengths["sentence"];
        assert_eq!(stats.min, 3);
        assert_eq!(stats.max, 16);
        assert!((stats.mean_sentences - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(profile.label_distribution["label"].get("1"), Some(&2));
        assert_eq!(profile.label_distribution["label"].get("0"), Some(&1));
    }

    fn meta(dataset: &str, strategy: Option<&str>, ratio: f64, changed: usize) -> RunMetadata {
        RunMetadata {
            dataset: dataset.into(),
            strategy: strategy.map(str::to_string),
            label_mode: match strategy {
                Some(_) => crate::config::LabelMode::Preserve,
                None => crate::config::LabelMode::Flip,
            },
            noise_ratio: ratio,
            seed: 42,
            max_attempts: 3,
            total_samples: 100,
            num_strata: 2,
            target_count: 20,
            changed_count: changed,
            unchangeable_count: 20 - changed,
            escalated_count: 0,
            noise_type_counts: BTreeMap::new(),
            field_change_counts: BTreeMap::new(),
            label_change_count: 0,
            mean_length_delta: 0.0,
            realized_ratio: changed as f64 / 100.0,
        }
    }

    #[test]
    fn cross_dataset_comparison_picks_one_matching_run_per_dataset() {
        let runs = vec![
            meta("sst2", Some("balanced"), 0.2, 18),
            meta("sst2", Some("balanced"), 0.1, 10),
            meta("mrpc", Some("grammar_heavy"), 0.2, 20),
            meta("alpaca", Some("balanced"), 0.2, 20),
            meta("gsm8k", Some("balanced"), 0.201, 15),
            meta("mrpc", None, 0.2, 20),
        ];
        let comparison = compare_across_datasets(&runs, 0.2, Some("balanced")).unwrap();
        assert_eq!(
            comparison
                .rows
                .iter()
                .map(|row| row.dataset.as_str())
                .collect::<Vec<_>>(),
            vec!["alpaca", "gsm8k", "sst2"]
        );
        assert_eq!(
            comparison
                .ranking()
                .iter()
                .map(|row| row.dataset.as_str())
                .collect::<Vec<_>>(),
            vec!["alpaca", "sst2", "gsm8k"]
        );

        assert!(compare_across_datasets(&runs, 0.2, None).is_none());
        assert!(compare_across_datasets(&runs, 0.3, Some("balanced")).is_none());
    }

    #[test]
    fn sample_comparison_follows_change_records() {
        let original = vec![sst2("good", 1), sst2("bad", 0), sst2("fine", 1)];
        let noisy = vec![sst2("good", 1), sst2("bad bad", 0), sst2("fien", 0)];
        let change = |index: usize, fields: &[&str], noise_type| ChangeRecord {
            sample_index: index,
            was_targeted: !fields.is_empty(),
            noise_type_applied: noise_type,
            fields_changed: fields.iter().map(|field| field.to_string()).collect(),
            length_delta: 0,
        };
        let changes = vec![
            change(0, &[], NoiseType::None),
            change(1, &["sentence"], NoiseType::Semantic),
            change(2, &["label", "sentence"], NoiseType::Grammar),
        ];

        let samples = compare_samples(&original, &noisy, &changes, 5).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].index, 1);
        assert_eq!(samples[0].noise_type, NoiseType::Semantic);
        assert_eq!(samples[0].fields[0].before, FieldValue::from("bad"));
        assert_eq!(samples[0].fields[0].after, FieldValue::from("bad bad"));
        assert_eq!(
            samples[1]
                .fields
                .iter()
                .map(|field| field.field.as_str())
                .collect::<Vec<_>>(),
            vec!["label", "sentence"]
        );

        assert_eq!(compare_samples(&original, &noisy, &changes, 1).unwrap().len(), 1);
        assert!(
            compare_samples(&original, &noisy, &changes[..2], 5)
                .unwrap_err()
                .is_configuration()
        );
    }
}
