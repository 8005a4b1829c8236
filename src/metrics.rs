use std::collections::BTreeMap;

use crate::config::NoiseStrategy;
use crate::data::NoiseType;

/// Realized distribution of applied noise types over targeted records.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseTypeDistribution {
    /// Targeted records counted.
    pub total: usize,
    /// Distinct noise types seen.
    pub types: usize,
    /// Largest per-type share.
    pub max_share: f64,
    /// Smallest per-type share.
    pub min_share: f64,
    /// Shares ordered by noise type.
    pub per_type: Vec<NoiseTypeShare>,
}

/// Per-type share of targeted records.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseTypeShare {
    /// Noise family.
    pub noise_type: NoiseType,
    /// Targeted records with this type.
    pub count: usize,
    /// Count over total.
    pub share: f64,
}

impl NoiseTypeDistribution {
    /// Share of `noise_type`, zero when it never occurred.
    pub fn share_of(&self, noise_type: NoiseType) -> f64 {
        self.per_type
            .iter()
            .find(|entry| entry.noise_type == noise_type)
            .map(|entry| entry.share)
            .unwrap_or(0.0)
    }

    /// Largest absolute gap between a realized text-noise share and the
    /// strategy weight. Shares are taken over text-noise records only, so
    /// unchangeable records do not skew the comparison.
    pub fn strategy_deviation(&self, strategy: &NoiseStrategy) -> f64 {
        let text_total: usize = self
            .per_type
            .iter()
            .filter(|entry| NoiseType::TEXT_NOISE.contains(&entry.noise_type))
            .map(|entry| entry.count)
            .sum();
        if text_total == 0 {
            return 0.0;
        }
        NoiseType::TEXT_NOISE
            .iter()
            .map(|noise_type| {
                let count = self
                    .per_type
                    .iter()
                    .find(|entry| entry.noise_type == *noise_type)
                    .map(|entry| entry.count)
                    .unwrap_or(0);
                let realized = count as f64 / text_total as f64;
                (realized - strategy.weight_for(*noise_type)).abs()
            })
            .fold(0.0, f64::max)
    }
}

/// Compute shares from per-type counts (as stored in run metadata).
/// Entries are ordered by count, descending, then by type.
pub fn noise_type_distribution(
    counts: &BTreeMap<NoiseType, usize>,
) -> Option<NoiseTypeDistribution> {
    let max = counts.values().copied().max()?;
    let min = counts.values().copied().min()?;
    let total: usize = counts.values().sum();
    let share = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let mut per_type: Vec<NoiseTypeShare> = counts
        .iter()
        .map(|(noise_type, count)| NoiseTypeShare {
            noise_type: *noise_type,
            count: *count,
            share: share(*count),
        })
        .collect();
    per_type.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.noise_type.cmp(&b.noise_type))
    });
    Some(NoiseTypeDistribution {
        total,
        types: counts.len(),
        max_share: share(max),
        min_share: share(min),
        per_type,
    })
}
