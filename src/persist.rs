//! JSON persistence and output file naming.
//!
//! File names encode what a file holds so the analysis layer can find runs
//! without an index:
//!
//! ```text
//! sst2_original_500.json
//! sst2_noisy_20percent_balanced_500.json
//! sst2_noisy_20percent_balanced_500_changes.json
//! sst2_flip_10percent_500_meta.json
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{LabelMode, RunMode, RunPlan};
use crate::constants::persist::{
    CHANGES_SUFFIX, DATA_FILE_EXTENSION, FLIP_TAG, META_SUFFIX, NOISY_TAG, ORIGINAL_TAG,
    PERCENT_SUFFIX,
};
use crate::data::{ChangeRecord, Record};
use crate::engine::NoiseRun;
use crate::errors::NoiseError;
use crate::heuristics::ratio_to_percent;
use crate::transport::{DataFileEntry, DataFileScanner};
use crate::types::{DatasetName, FileNameString, StrategyName};
use crate::verifier::RunMetadata;

/// What a data file contains.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataFileKind {
    /// Untouched input dataset.
    Original,
    /// Text-noise run output.
    Noisy {
        /// Whole-percent noise ratio.
        percent: u32,
        /// Strategy name.
        strategy: StrategyName,
    },
    /// Label-flip run output.
    Flip {
        /// Whole-percent noise ratio.
        percent: u32,
    },
}

impl DataFileKind {
    /// Whole-percent ratio, `None` for originals.
    pub fn percent(&self) -> Option<u32> {
        match self {
            DataFileKind::Original => None,
            DataFileKind::Noisy { percent, .. } | DataFileKind::Flip { percent } => Some(*percent),
        }
    }

    /// Strategy name for text-noise files.
    pub fn strategy(&self) -> Option<&str> {
        match self {
            DataFileKind::Noisy { strategy, .. } => Some(strategy),
            _ => None,
        }
    }
}

/// Companion files written next to a noisy dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Companion {
    /// Per-record change records.
    Changes,
    /// Run metadata.
    Meta,
}

impl Companion {
    fn suffix(&self) -> &'static str {
        match self {
            Companion::Changes => CHANGES_SUFFIX,
            Companion::Meta => META_SUFFIX,
        }
    }
}

/// Structured form of an output file name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DataFileName {
    /// Dataset prefix.
    pub dataset: DatasetName,
    /// What the file holds.
    pub kind: DataFileKind,
    /// Record count in the dataset.
    pub samples: usize,
    /// `None` for the records file itself.
    pub companion: Option<Companion>,
}

impl DataFileName {
    /// Name of the untouched dataset file.
    pub fn original(dataset: impl Into<DatasetName>, samples: usize) -> Self {
        Self {
            dataset: dataset.into(),
            kind: DataFileKind::Original,
            samples,
            companion: None,
        }
    }

    /// Name of the records file produced by a run.
    pub fn for_run(metadata: &RunMetadata) -> Self {
        let percent = ratio_to_percent(metadata.noise_ratio);
        let kind = match (metadata.label_mode, &metadata.strategy) {
            (LabelMode::Preserve, strategy) => DataFileKind::Noisy {
                percent,
                strategy: strategy.clone().unwrap_or_default(),
            },
            (LabelMode::Flip, _) => DataFileKind::Flip { percent },
        };
        Self {
            dataset: metadata.dataset.clone(),
            kind,
            samples: metadata.total_samples,
            companion: None,
        }
    }

    /// Name of the records file a resolved plan will produce.
    pub fn for_plan(dataset: impl Into<DatasetName>, plan: &RunPlan, samples: usize) -> Self {
        let percent = ratio_to_percent(plan.noise_ratio);
        let kind = match &plan.mode {
            RunMode::TextNoise(strategy) => DataFileKind::Noisy {
                percent,
                strategy: strategy.name.clone(),
            },
            RunMode::LabelFlip => DataFileKind::Flip { percent },
        };
        Self {
            dataset: dataset.into(),
            kind,
            samples,
            companion: None,
        }
    }

    /// Same file name with a companion suffix.
    pub fn with_companion(&self, companion: Companion) -> Self {
        Self {
            companion: Some(companion),
            ..self.clone()
        }
    }

    /// Name of the records file this file belongs to.
    pub fn base(&self) -> Self {
        Self {
            companion: None,
            ..self.clone()
        }
    }

    /// Rendered file name.
    pub fn file_name(&self) -> FileNameString {
        self.to_string()
    }

    /// Parse a file name produced by [`DataFileName::file_name`].
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{DATA_FILE_EXTENSION}"))?;
        let (stem, companion) = [Companion::Changes, Companion::Meta]
            .into_iter()
            .find_map(|companion| {
                stem.strip_suffix(&format!("_{}", companion.suffix()))
                    .map(|rest| (rest, Some(companion)))
            })
            .unwrap_or((stem, None));

        let (head, samples) = stem.rsplit_once('_')?;
        let samples: usize = samples.parse().ok()?;

        if let Some(dataset) = head.strip_suffix(&format!("_{ORIGINAL_TAG}")) {
            return Some(Self {
                dataset: non_empty(dataset)?,
                kind: DataFileKind::Original,
                samples,
                companion,
            });
        }
        if let Some((dataset, rest)) = head.split_once(&format!("_{NOISY_TAG}_")) {
            let (percent, strategy) = rest.split_once('_')?;
            return Some(Self {
                dataset: non_empty(dataset)?,
                kind: DataFileKind::Noisy {
                    percent: parse_percent(percent)?,
                    strategy: non_empty(strategy)?,
                },
                samples,
                companion,
            });
        }
        let (dataset, percent) = head.split_once(&format!("_{FLIP_TAG}_"))?;
        Some(Self {
            dataset: non_empty(dataset)?,
            kind: DataFileKind::Flip {
                percent: parse_percent(percent)?,
            },
            samples,
            companion,
        })
    }
}

impl fmt::Display for DataFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_", self.dataset)?;
        match &self.kind {
            DataFileKind::Original => write!(f, "{ORIGINAL_TAG}")?,
            DataFileKind::Noisy { percent, strategy } => {
                write!(f, "{NOISY_TAG}_{percent}{PERCENT_SUFFIX}_{strategy}")?
            }
            DataFileKind::Flip { percent } => write!(f, "{FLIP_TAG}_{percent}{PERCENT_SUFFIX}")?,
        }
        write!(f, "_{}", self.samples)?;
        if let Some(companion) = self.companion {
            write!(f, "_{}", companion.suffix())?;
        }
        write!(f, ".{DATA_FILE_EXTENSION}")
    }
}

fn parse_percent(raw: &str) -> Option<u32> {
    raw.strip_suffix(PERCENT_SUFFIX)?.parse().ok()
}

fn non_empty(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Records-file names for `plans`, checked before anything is written.
///
/// File names carry whole percents, so two plans whose ratios round to the
/// same percent would overwrite each other, and a ratio below half a percent
/// would be written as `0percent`. Both are configuration errors.
pub fn plan_output_names(
    dataset: &str,
    plans: &[RunPlan],
    samples: usize,
) -> Result<Vec<DataFileName>, NoiseError> {
    let mut seen: BTreeMap<DataFileName, f64> = BTreeMap::new();
    let mut names = Vec::with_capacity(plans.len());
    for plan in plans {
        let name = DataFileName::for_plan(dataset, plan, samples);
        if name.kind.percent() == Some(0) {
            return Err(NoiseError::Configuration(format!(
                "ratio {} rounds to 0 percent in output file names",
                plan.noise_ratio
            )));
        }
        if let Some(previous) = seen.insert(name.clone(), plan.noise_ratio) {
            return Err(NoiseError::Configuration(format!(
                "ratios {previous} and {} would both write {}",
                plan.noise_ratio,
                name.file_name()
            )));
        }
        names.push(name);
    }
    Ok(names)
}

/// Paths written by [`save_run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunArtifacts {
    /// Noisy records file.
    pub records: PathBuf,
    /// Change records file.
    pub changes: PathBuf,
    /// Run metadata file.
    pub metadata: PathBuf,
}

/// Deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, NoiseError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Serialize `value` as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), NoiseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut payload = serde_json::to_string_pretty(value)?;
    payload.push('\n');
    fs::write(path, payload)?;
    Ok(())
}

/// Load a JSON array of records, keeping at most `head` of them.
pub fn load_records(path: &Path, head: Option<usize>) -> Result<Vec<Record>, NoiseError> {
    let mut records: Vec<Record> = load_json(path)?;
    if let Some(limit) = head {
        records.truncate(limit);
    }
    info!(
        "[noise:persist] loaded {} records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Read a `_changes` companion file.
pub fn load_changes(path: &Path) -> Result<Vec<ChangeRecord>, NoiseError> {
    load_json(path)
}

/// Read a `_meta` companion file.
pub fn load_metadata(path: &Path) -> Result<RunMetadata, NoiseError> {
    load_json(path)
}

/// Write the untouched dataset as `{dataset}_original_{n}.json`.
pub fn save_original(dir: &Path, dataset: &str, records: &[Record]) -> Result<PathBuf, NoiseError> {
    let path = dir.join(DataFileName::original(dataset, records.len()).file_name());
    save_json(&path, records)?;
    info!("[noise:persist] wrote {}", path.display());
    Ok(path)
}

/// Write a run's records, change records, and metadata side by side.
pub fn save_run(dir: &Path, run: &NoiseRun) -> Result<RunArtifacts, NoiseError> {
    let name = DataFileName::for_run(&run.metadata);
    let artifacts = RunArtifacts {
        records: dir.join(name.file_name()),
        changes: dir.join(name.with_companion(Companion::Changes).file_name()),
        metadata: dir.join(name.with_companion(Companion::Meta).file_name()),
    };
    save_json(&artifacts.records, &run.records)?;
    save_json(&artifacts.changes, &run.changes)?;
    save_json(&artifacts.metadata, &run.metadata)?;
    info!(
        "[noise:persist] wrote {} (+ changes, meta)",
        artifacts.records.display()
    );
    Ok(artifacts)
}

/// Scanned data file with its parsed name, if it follows the naming scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedFile {
    /// Scanned file.
    pub entry: DataFileEntry,
    /// `None` when the file name does not follow the naming scheme.
    pub name: Option<DataFileName>,
}

/// JSON files found by `scanner`, grouped by dataset.
///
/// Files that do not follow the naming scheme are grouped under the text
/// before their first underscore.
pub fn list_data_files(
    scanner: &DataFileScanner,
) -> Result<BTreeMap<DatasetName, Vec<ListedFile>>, NoiseError> {
    let mut grouped: BTreeMap<DatasetName, Vec<ListedFile>> = BTreeMap::new();
    for entry in scanner.scan()? {
        let name = DataFileName::parse(&entry.file_name);
        let dataset = match &name {
            Some(parsed) => parsed.dataset.clone(),
            None => entry
                .file_name
                .split(['_', '.'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        grouped
            .entry(dataset)
            .or_default()
            .push(ListedFile { entry, name });
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseStrategy;
    use tempfile::tempdir;

    #[test]
    fn file_names_follow_the_naming_scheme() {
        let noisy = DataFileName {
            dataset: "sst2".into(),
            kind: DataFileKind::Noisy {
                percent: 20,
                strategy: "grammar_heavy".into(),
            },
            samples: 500,
            companion: None,
        };
        assert_eq!(noisy.file_name(), "sst2_noisy_20percent_grammar_heavy_500.json");
        assert_eq!(
            noisy.with_companion(Companion::Changes).file_name(),
            "sst2_noisy_20percent_grammar_heavy_500_changes.json"
        );
        assert_eq!(
            DataFileName::original("alpaca", 1000).file_name(),
            "alpaca_original_1000.json"
        );
    }

    #[test]
    fn parse_inverts_file_name() {
        for raw in [
            "alpaca_original_1000.json",
            "sst2_noisy_20percent_grammar_heavy_500.json",
            "sst2_noisy_20percent_grammar_heavy_500_meta.json",
            "mrpc_flip_10percent_400.json",
            "mrpc_flip_10percent_400_changes.json",
        ] {
            let parsed = DataFileName::parse(raw).unwrap_or_else(|| panic!("parse {raw}"));
            assert_eq!(parsed.file_name(), raw);
        }
        let parsed = DataFileName::parse("mrpc_flip_10percent_400_changes.json").unwrap();
        assert_eq!(parsed.dataset, "mrpc");
        assert_eq!(parsed.kind.percent(), Some(10));
        assert_eq!(parsed.companion, Some(Companion::Changes));
        assert_eq!(parsed.base().file_name(), "mrpc_flip_10percent_400.json");
    }

    #[test]
    fn parse_rejects_foreign_names() {
        for raw in [
            "notes.json",
            "sst2_noisy_twentypercent_balanced_5.json",
            "sst2_original_many.json",
            "_original_5.json",
            "sst2_original_5.txt",
        ] {
            assert_eq!(DataFileName::parse(raw), None, "{raw}");
        }
    }

    fn text_plan(ratio: f64, strategy: NoiseStrategy) -> RunPlan {
        RunPlan {
            noise_ratio: ratio,
            mode: RunMode::TextNoise(strategy),
            seed: 42,
        }
    }

    #[test]
    fn planned_names_match_run_names_and_stay_unique() {
        let plans = vec![
            text_plan(0.1, NoiseStrategy::balanced()),
            text_plan(0.1, NoiseStrategy::grammar_heavy()),
            text_plan(0.2, NoiseStrategy::balanced()),
            RunPlan {
                noise_ratio: 0.1,
                mode: RunMode::LabelFlip,
                seed: 42,
            },
        ];
        let names = plan_output_names("sst2", &plans, 100).unwrap();
        assert_eq!(
            names.iter().map(DataFileName::file_name).collect::<Vec<_>>(),
            vec![
                "sst2_noisy_10percent_balanced_100.json",
                "sst2_noisy_10percent_grammar_heavy_100.json",
                "sst2_noisy_20percent_balanced_100.json",
                "sst2_flip_10percent_100.json",
            ]
        );
    }

    #[test]
    fn colliding_or_zero_percent_names_are_rejected() {
        let colliding = vec![
            text_plan(0.10, NoiseStrategy::balanced()),
            text_plan(0.104, NoiseStrategy::balanced()),
        ];
        let err = plan_output_names("sst2", &colliding, 100).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("sst2_noisy_10percent_balanced_100.json"));

        let tiny = vec![text_plan(0.004, NoiseStrategy::balanced())];
        assert!(
            plan_output_names("sst2", &tiny, 100)
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn records_round_trip_with_head_limit() {
        let temp = tempdir().unwrap();
        let records = vec![
            Record::from_fields([("question", "a"), ("answer", "1")]),
            Record::from_fields([("question", "b"), ("answer", "2")]),
            Record::from_fields([("question", "c"), ("answer", "3")]),
        ];
        let path = save_original(temp.path(), "gsm8k", &records).unwrap();
        assert!(path.ends_with("gsm8k_original_3.json"));
        assert_eq!(load_records(&path, None).unwrap(), records);
        assert_eq!(load_records(&path, Some(2)).unwrap(), records[..2].to_vec());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_records(&path, None).unwrap_err(),
            NoiseError::Serialization(_)
        ));
    }

    #[test]
    fn listing_groups_by_dataset() {
        let temp = tempdir().unwrap();
        for name in [
            "sst2_original_10.json",
            "sst2_flip_20percent_10.json",
            "gsm8k_original_4.json",
            "scratch_notes.json",
        ] {
            fs::write(temp.path().join(name), "[]").unwrap();
        }
        let grouped = list_data_files(&DataFileScanner::new(temp.path())).unwrap();
        assert_eq!(
            grouped.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["gsm8k", "scratch", "sst2"]
        );
        assert_eq!(grouped["sst2"].len(), 2);
        assert!(grouped["scratch"][0].name.is_none());
    }
}
