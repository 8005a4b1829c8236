//! Stratified target selection.

use rand::seq::IndexedRandom;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::validate_ratio;
use crate::data::Record;
use crate::errors::NoiseError;
use crate::heuristics::stratum_target_count;
use crate::rng::stratum_rng;
use crate::types::{SampleIndex, StratumKey};

/// Size and draw of one stratum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StratumSummary {
    /// Stratum key.
    pub key: StratumKey,
    /// Records in the stratum.
    pub size: usize,
    /// Records drawn from the stratum.
    pub targets: usize,
}

/// Result of a stratified draw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSelection {
    /// Selected record indices, ascending.
    pub targets: BTreeSet<SampleIndex>,
    /// Per-stratum breakdown, ordered by stratum key.
    pub strata: Vec<StratumSummary>,
}

impl TargetSelection {
    /// Number of selected records.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// True when nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Whether `index` was selected.
    pub fn contains(&self, index: SampleIndex) -> bool {
        self.targets.contains(&index)
    }

    /// Number of non-empty strata.
    pub fn num_strata(&self) -> usize {
        self.strata.len()
    }
}

/// Select `round(ratio * stratum_size)` records from every stratum, uniformly
/// without replacement.
///
/// Strata are visited in key order and each draws from its own stream keyed by
/// `(seed, stratum key)`, so the result depends only on the record order,
/// `ratio`, the strata function, and `seed`. Per-stratum rounding means the
/// total can differ from `ratio * records.len()` by at most the number of
/// strata.
pub fn select_targets<F>(
    records: &[Record],
    ratio: f64,
    strata_key_fn: F,
    seed: u64,
) -> Result<TargetSelection, NoiseError>
where
    F: Fn(&Record) -> StratumKey,
{
    validate_ratio(ratio)?;
    if records.is_empty() {
        return Err(NoiseError::Configuration(
            "cannot select targets from an empty record set".to_string(),
        ));
    }

    let mut partitions: BTreeMap<StratumKey, Vec<SampleIndex>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        partitions.entry(strata_key_fn(record)).or_default().push(idx);
    }

    let mut targets = BTreeSet::new();
    let mut strata = Vec::with_capacity(partitions.len());
    for (key, members) in partitions {
        let count = stratum_target_count(members.len(), ratio);
        let mut rng = stratum_rng(seed, &key);
        targets.extend(members.choose_multiple(&mut rng, count).copied());
        debug!(
            "[noise:sampler] stratum '{}' size={} targets={}",
            key,
            members.len(),
            count
        );
        strata.push(StratumSummary {
            key,
            size: members.len(),
            targets: count,
        });
    }

    Ok(TargetSelection { targets, strata })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FieldValue;
    use crate::heuristics::within_ratio_tolerance;

    fn labelled(count: usize, label_of: impl Fn(usize) -> i64) -> Vec<Record> {
        (0..count)
            .map(|idx| {
                Record::from_fields([
                    ("sentence", FieldValue::from(format!("sample {idx}"))),
                    ("label", FieldValue::Integer(label_of(idx))),
                ])
            })
            .collect()
    }

    fn by_label(record: &Record) -> StratumKey {
        record.get("label").map(|v| v.to_string()).unwrap_or_default()
    }

    #[test]
    fn single_stratum_draw_is_exact_and_reproducible() {
        let records = labelled(10, |_| 1);
        let first = select_targets(&records, 0.2, |_| String::new(), 42).unwrap();
        let second = select_targets(&records, 0.2, |_| String::new(), 42).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(first.num_strata(), 1);
    }

    #[test]
    fn different_seeds_draw_different_targets() {
        let records = labelled(200, |idx| (idx % 2) as i64);
        let a = select_targets(&records, 0.3, by_label, 1).unwrap();
        let b = select_targets(&records, 0.3, by_label, 2).unwrap();
        assert_eq!(a.len(), b.len());
        assert_ne!(a.targets, b.targets);
    }

    #[test]
    fn each_stratum_is_sampled_proportionally() {
        let records = labelled(100, |idx| if idx < 80 { 0 } else { 1 });
        let selection = select_targets(&records, 0.25, by_label, 7).unwrap();
        let zeros = selection.targets.iter().filter(|idx| **idx < 80).count();
        let ones = selection.len() - zeros;
        assert_eq!(zeros, 20);
        assert_eq!(ones, 5);
        assert_eq!(
            selection.strata,
            vec![
                StratumSummary {
                    key: "0".into(),
                    size: 80,
                    targets: 20
                },
                StratumSummary {
                    key: "1".into(),
                    size: 20,
                    targets: 5
                },
            ]
        );
    }

    #[test]
    fn realized_ratio_stays_within_strata_tolerance() {
        for (count, modulo, ratio) in [(37, 5, 0.1), (101, 7, 0.33), (9, 9, 0.5), (250, 3, 0.07)] {
            let records = labelled(count, |idx| (idx % modulo) as i64);
            let selection = select_targets(&records, ratio, by_label, 99).unwrap();
            assert!(within_ratio_tolerance(
                selection.len(),
                ratio,
                records.len(),
                selection.num_strata()
            ));
        }
    }

    #[test]
    fn tiny_ratio_can_select_nothing() {
        let records = labelled(3, |idx| idx as i64);
        let selection = select_targets(&records, 0.1, by_label, 5).unwrap();
        assert!(selection.is_empty());
        assert_eq!(selection.num_strata(), 3);
    }

    #[test]
    fn full_ratio_selects_everything() {
        let records = labelled(13, |idx| (idx % 4) as i64);
        let selection = select_targets(&records, 1.0, by_label, 5).unwrap();
        assert_eq!(selection.targets, (0..13).collect());
    }

    #[test]
    fn invalid_inputs_are_configuration_errors() {
        let records = labelled(3, |_| 0);
        assert!(select_targets(&records, 0.0, by_label, 1).unwrap_err().is_configuration());
        assert!(select_targets(&records, 1.5, by_label, 1).is_err());
        assert!(select_targets(&[], 0.5, by_label, 1).is_err());
    }
}
