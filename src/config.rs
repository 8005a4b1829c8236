use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::engine::{DEFAULT_MAX_ATTEMPTS, DEFAULT_NOISE_RATIO, DEFAULT_SEED};
use crate::constants::strategy::{
    BALANCED, BALANCED_WEIGHTS, GRAMMAR_HEAVY, GRAMMAR_HEAVY_WEIGHTS, SEMANTIC_HEAVY,
    SEMANTIC_HEAVY_WEIGHTS, WEIGHT_SUM_TOLERANCE,
};
use crate::data::NoiseType;
use crate::descriptor::DatasetDescriptor;
use crate::errors::NoiseError;
use crate::types::StrategyName;

/// Named weighting over the three text-noise families.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseStrategy {
    /// Strategy name used in logs, metadata, and file names.
    pub name: StrategyName,
    /// Probability of drawing grammar noise.
    pub grammar: f64,
    /// Probability of drawing semantic noise.
    pub semantic: f64,
    /// Probability of drawing quality noise.
    pub quality: f64,
}

impl NoiseStrategy {
    /// Build and validate a custom strategy.
    pub fn new(name: impl Into<StrategyName>, weights: [f64; 3]) -> Result<Self, NoiseError> {
        Self::from_weights(name, weights).validated()
    }

    fn from_weights(name: impl Into<StrategyName>, weights: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            grammar: weights[0],
            semantic: weights[1],
            quality: weights[2],
        }
    }

    /// Even split across the three families.
    pub fn balanced() -> Self {
        Self::from_weights(BALANCED, BALANCED_WEIGHTS)
    }

    /// Grammar-weighted strategy.
    pub fn grammar_heavy() -> Self {
        Self::from_weights(GRAMMAR_HEAVY, GRAMMAR_HEAVY_WEIGHTS)
    }

    /// Semantic-weighted strategy.
    pub fn semantic_heavy() -> Self {
        Self::from_weights(SEMANTIC_HEAVY, SEMANTIC_HEAVY_WEIGHTS)
    }

    /// Fixed strategy catalog.
    pub fn catalog() -> [NoiseStrategy; 3] {
        [
            Self::balanced(),
            Self::grammar_heavy(),
            Self::semantic_heavy(),
        ]
    }

    /// Look up a catalog strategy by name (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self, NoiseError> {
        Self::catalog()
            .into_iter()
            .find(|strategy| strategy.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                NoiseError::Configuration(format!(
                    "unknown noise strategy '{name}' (expected one of: {BALANCED}, {GRAMMAR_HEAVY}, {SEMANTIC_HEAVY})"
                ))
            })
    }

    /// Weights in `(grammar, semantic, quality)` order.
    pub fn weights(&self) -> [f64; 3] {
        [self.grammar, self.semantic, self.quality]
    }

    /// Weight of one text-noise family; zero for non-text noise types.
    pub fn weight_for(&self, noise_type: NoiseType) -> f64 {
        match noise_type {
            NoiseType::Grammar => self.grammar,
            NoiseType::Semantic => self.semantic,
            NoiseType::Quality => self.quality,
            NoiseType::LabelFlip | NoiseType::None => 0.0,
        }
    }

    /// Validate that weights are finite, non-negative, and sum to `1.0`
    /// (within 1e-6). Never renormalizes.
    pub fn validated(self) -> Result<Self, NoiseError> {
        if self
            .weights()
            .iter()
            .any(|weight| !weight.is_finite() || *weight < 0.0)
        {
            return Err(NoiseError::Configuration(format!(
                "strategy '{}' has negative or non-finite weights {:?}",
                self.name,
                self.weights()
            )));
        }
        let sum: f64 = self.weights().iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(NoiseError::Configuration(format!(
                "strategy '{}' weights must sum to 1.0 (got {sum})",
                self.name
            )));
        }
        Ok(self)
    }
}

impl Default for NoiseStrategy {
    fn default() -> Self {
        Self::balanced()
    }
}

/// How label fields are treated during a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    /// Corrupt text fields; labels are restored from the original.
    #[default]
    Preserve,
    /// Remap labels through the dataset flip mapping; text is untouched.
    Flip,
}

impl LabelMode {
    /// Name used in metadata and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMode::Preserve => "preserve",
            LabelMode::Flip => "flip",
        }
    }
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing description of one noise run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseRequest {
    /// Fraction of records to target, in `(0, 1]`.
    pub noise_ratio: f64,
    /// Text-noise strategy. `None` selects `balanced` in preserve mode; must
    /// be `None` in flip mode.
    pub strategy: Option<NoiseStrategy>,
    /// Label handling for the run.
    pub label_mode: LabelMode,
    /// Global seed every rng stream is derived from.
    pub seed: u64,
}

impl Default for NoiseRequest {
    fn default() -> Self {
        Self {
            noise_ratio: DEFAULT_NOISE_RATIO,
            strategy: None,
            label_mode: LabelMode::Preserve,
            seed: DEFAULT_SEED,
        }
    }
}

/// What a validated request does to targeted records.
#[derive(Clone, Debug, PartialEq)]
pub enum RunMode {
    /// Corrupt text fields with the given strategy; preserve labels.
    TextNoise(NoiseStrategy),
    /// Flip labels; leave text untouched.
    LabelFlip,
}

impl RunMode {
    /// Label mode this run mode corresponds to.
    pub fn label_mode(&self) -> LabelMode {
        match self {
            RunMode::TextNoise(_) => LabelMode::Preserve,
            RunMode::LabelFlip => LabelMode::Flip,
        }
    }

    /// Strategy for text-noise runs.
    pub fn strategy(&self) -> Option<&NoiseStrategy> {
        match self {
            RunMode::TextNoise(strategy) => Some(strategy),
            RunMode::LabelFlip => None,
        }
    }
}

/// Request after validation against a dataset descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct RunPlan {
    /// Validated ratio in `(0, 1]`.
    pub noise_ratio: f64,
    /// What targeted records receive.
    pub mode: RunMode,
    /// Global seed.
    pub seed: u64,
}

impl NoiseRequest {
    /// Validate the request against `descriptor` and resolve its run mode.
    pub fn resolve(&self, descriptor: &DatasetDescriptor) -> Result<RunPlan, NoiseError> {
        validate_ratio(self.noise_ratio)?;
        let mode = match (self.label_mode, &self.strategy) {
            (LabelMode::Preserve, strategy) => {
                RunMode::TextNoise(strategy.clone().unwrap_or_default().validated()?)
            }
            (LabelMode::Flip, Some(strategy)) => {
                return Err(NoiseError::Configuration(format!(
                    "label flipping and text noise are mutually exclusive (strategy '{}' given with label_mode=flip)",
                    strategy.name
                )));
            }
            (LabelMode::Flip, None) => {
                if !descriptor.supports_label_flip() {
                    return Err(NoiseError::Configuration(format!(
                        "dataset '{}' does not support label flipping",
                        descriptor.name()
                    )));
                }
                RunMode::LabelFlip
            }
        };
        Ok(RunPlan {
            noise_ratio: self.noise_ratio,
            mode,
            seed: self.seed,
        })
    }
}

/// Check that `ratio` lies in `(0, 1]`.
pub fn validate_ratio(ratio: f64) -> Result<f64, NoiseError> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(NoiseError::Configuration(format!(
            "noise ratio must be in (0, 1] (got {ratio})"
        )));
    }
    Ok(ratio)
}

/// Engine-level knobs that do not change which records are targeted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Dispatcher attempts before escalating to the quality fallback.
    pub max_attempts: u32,
    /// Process records on the rayon pool. Output is identical either way.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            parallel: false,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that cannot run.
    pub fn validated(self) -> Result<Self, NoiseError> {
        if self.max_attempts == 0 {
            return Err(NoiseError::Configuration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}
