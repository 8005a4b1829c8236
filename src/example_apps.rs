use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, error::ErrorKind};

use crate::analysis::{
    CrossDatasetComparison, ExperimentRow, SampleComparison, compare_across_datasets,
    compare_samples, label_preservation, noise_impact, profile_dataset, summarize_experiments,
};
use crate::config::{EngineConfig, LabelMode, NoiseRequest, NoiseStrategy, RunPlan};
use crate::constants::analysis::{
    DEFAULT_COMPARISON_RATIO, DEFAULT_COMPARISON_STRATEGY, DEFAULT_SAMPLE_COMPARISONS,
    MIN_COMPARED_DATASETS, PREVIEW_CHARS,
};
use crate::constants::engine::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SEED};
use crate::constants::persist::{DEFAULT_DATA_DIR, FLIP_TAG};
use crate::data::FieldValue;
use crate::descriptor::DatasetDescriptor;
use crate::engine::{NoiseEngine, experiment_ratios};
use crate::heuristics::{format_bytes, format_percent, format_u128_with_commas};
use crate::metrics::noise_type_distribution;
use crate::persist::{
    Companion, DataFileKind, DataFileName, ListedFile, list_data_files, load_changes,
    load_metadata, load_records, plan_output_names, save_original, save_run,
};
use crate::transport::DataFileScanner;
use crate::verifier::RunMetadata;

#[derive(Debug, Parser)]
#[command(
    name = "inject_noise",
    disable_help_subcommand = true,
    about = "Generate noisy dataset variants",
    long_about = "Load a JSON dataset, inject text noise or flip labels for each requested ratio, and write records, change records, and run metadata.",
    after_help = "Without --strategy every catalog strategy is run. --flip runs label flipping instead of text noise."
)]
/// CLI for `inject_noise`.
///
/// Common usage:
/// - Text noise with every strategy: `--input sst2.json --dataset sst2`
/// - One strategy, custom ratios: `--strategy grammar_heavy --ratios 0.05,0.5`
/// - Label flipping: `--flip --ratios 0.1`
struct InjectNoiseCli {
    #[arg(long, value_name = "PATH", help = "JSON array of records to corrupt")]
    input: PathBuf,
    #[arg(
        long,
        value_parser = parse_dataset_arg,
        help = "Dataset kind (alpaca, gsm8k, sst2, mrpc)"
    )]
    dataset: DatasetDescriptor,
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = parse_ratio_arg,
        help = "Comma-separated noise ratios in (0, 1] [default: 0.1,0.2,0.3]"
    )]
    ratios: Vec<f64>,
    #[arg(
        long = "strategy",
        value_parser = parse_strategy_arg,
        conflicts_with = "flip",
        help = "Noise strategy to run, repeat as needed"
    )]
    strategies: Vec<NoiseStrategy>,
    #[arg(long, help = "Flip labels instead of injecting text noise")]
    flip: bool,
    #[arg(long, default_value_t = DEFAULT_SEED, help = "Global seed for every rng stream")]
    seed: u64,
    #[arg(
        long,
        value_parser = parse_positive_usize,
        help = "Only use the first N records"
    )]
    head: Option<usize>,
    #[arg(
        long = "max-attempts",
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        value_parser = parse_positive_u32,
        help = "Dispatcher attempts before escalating to the quality fallback"
    )]
    max_attempts: u32,
    #[arg(long, help = "Process records on the rayon thread pool")]
    parallel: bool,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        default_value = DEFAULT_DATA_DIR,
        help = "Directory for generated files"
    )]
    output_dir: PathBuf,
}

#[derive(Debug, Parser)]
#[command(
    name = "analyze_outputs",
    disable_help_subcommand = true,
    about = "Summarize generated noise datasets",
    long_about = "Scan a data directory, list generated files per dataset, and report noise impact, label preservation, and run metadata."
)]
struct AnalyzeOutputsCli {
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = DEFAULT_DATA_DIR,
        help = "Directory produced by inject_noise"
    )]
    data_dir: PathBuf,
    #[arg(long, help = "Only report this dataset")]
    dataset: Option<String>,
    #[arg(long = "follow-symlinks", help = "Follow symbolic links while scanning")]
    follow_symlinks: bool,
    #[arg(
        long,
        default_value_t = DEFAULT_SAMPLE_COMPARISONS,
        help = "Changed records shown before/after per noisy file (0 disables)"
    )]
    samples: usize,
    #[arg(
        long = "compare-ratio",
        default_value_t = DEFAULT_COMPARISON_RATIO,
        value_parser = parse_ratio_arg,
        help = "Noise ratio compared across datasets"
    )]
    compare_ratio: f64,
    #[arg(
        long = "compare-strategy",
        default_value = DEFAULT_COMPARISON_STRATEGY,
        help = "Strategy compared across datasets, or 'flip' for label-flip runs"
    )]
    compare_strategy: String,
}

/// Entry point of the `inject_noise` demo: load a dataset, run every
/// requested strategy and ratio, and write the results.
pub fn run_inject_noise<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<InjectNoiseCli, _>(
        std::iter::once("inject_noise".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let records = load_records(&cli.input, cli.head)?;
    let engine = NoiseEngine::new(
        cli.dataset.clone(),
        EngineConfig {
            max_attempts: cli.max_attempts,
            parallel: cli.parallel,
        },
    )?;
    let requests: Vec<NoiseRequest> = if cli.flip {
        vec![NoiseRequest {
            label_mode: LabelMode::Flip,
            seed: cli.seed,
            ..NoiseRequest::default()
        }]
    } else {
        let strategies = if cli.strategies.is_empty() {
            NoiseStrategy::catalog().to_vec()
        } else {
            cli.strategies.clone()
        };
        strategies
            .into_iter()
            .map(|strategy| NoiseRequest {
                strategy: Some(strategy),
                seed: cli.seed,
                ..NoiseRequest::default()
            })
            .collect()
    };

    let ratios = experiment_ratios(&cli.ratios);
    let plans = plan_requests(&cli.dataset, &requests, ratios)?;
    plan_output_names(cli.dataset.name(), &plans, records.len())?;
    for (idx, record) in records.iter().enumerate() {
        cli.dataset.validate_record(idx, record)?;
    }

    let original_path = save_original(&cli.output_dir, cli.dataset.name(), &records)?;
    println!("=== inject noise ===");
    println!("dataset: {}", cli.dataset.name());
    println!(
        "records: {}",
        format_u128_with_commas(records.len() as u128)
    );
    println!("seed: {}", cli.seed);
    println!("original: {}", original_path.display());
    println!();

    let mut metadata = Vec::new();
    for request in &requests {
        for run in engine.run_experiments(&records, ratios, request)? {
            let artifacts = save_run(&cli.output_dir, &run)?;
            println!("wrote {}", artifacts.records.display());
            metadata.push(run.metadata);
        }
    }
    println!();
    print_experiment_rows(&summarize_experiments(&metadata));
    Ok(())
}

/// Resolve every `(request, ratio)` pair so configuration errors surface
/// before any file is written.
fn plan_requests(
    descriptor: &DatasetDescriptor,
    requests: &[NoiseRequest],
    ratios: &[f64],
) -> Result<Vec<RunPlan>, Box<dyn Error>> {
    let mut plans = Vec::with_capacity(requests.len() * ratios.len());
    for request in requests {
        for ratio in ratios {
            let request = NoiseRequest {
                noise_ratio: *ratio,
                ..request.clone()
            };
            plans.push(request.resolve(descriptor)?);
        }
    }
    Ok(plans)
}

/// Entry point of the `analyze_outputs` demo.
pub fn run_analyze_outputs<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<AnalyzeOutputsCli, _>(
        std::iter::once("analyze_outputs".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let scanner = DataFileScanner::new(&cli.data_dir).with_follow_symlinks(cli.follow_symlinks);
    let mut grouped = list_data_files(&scanner)?;
    if let Some(wanted) = &cli.dataset {
        grouped.retain(|dataset, _| dataset.eq_ignore_ascii_case(wanted));
    }
    if grouped.is_empty() {
        println!("No data files found in {}.", cli.data_dir.display());
        return Ok(());
    }

    println!("=== data files in {} ===", cli.data_dir.display());
    for (dataset, files) in &grouped {
        println!("[{}]", dataset);
        for file in files {
            print_listed_file(file);
        }
    }
    println!();

    let mut all_metadata = Vec::new();
    for (dataset, files) in &grouped {
        let Ok(descriptor) = DatasetDescriptor::by_name(dataset) else {
            println!("[{}] not a catalog dataset; skipping analysis", dataset);
            continue;
        };
        all_metadata.extend(analyze_dataset(&descriptor, files, cli.samples)?);
    }

    let strategy = (cli.compare_strategy != FLIP_TAG).then_some(cli.compare_strategy.as_str());
    match compare_across_datasets(&all_metadata, cli.compare_ratio, strategy) {
        Some(comparison) => print_cross_dataset(&comparison),
        None => println!(
            "Cross-dataset comparison needs {} @ {} runs for at least {} datasets; skipping.",
            cli.compare_strategy,
            format_percent(cli.compare_ratio),
            MIN_COMPARED_DATASETS
        ),
    }
    Ok(())
}

fn analyze_dataset(
    descriptor: &DatasetDescriptor,
    files: &[ListedFile],
    samples: usize,
) -> Result<Vec<RunMetadata>, Box<dyn Error>> {
    let parsed: BTreeMap<DataFileName, &Path> = files
        .iter()
        .filter_map(|file| Some((file.name.clone()?, file.entry.path.as_path())))
        .collect();

    println!("=== {} ===", descriptor.name());

    let mut metadata: Vec<RunMetadata> = Vec::new();
    for (name, path) in &parsed {
        if name.companion == Some(Companion::Meta) {
            metadata.push(load_metadata(path)?);
        }
    }

    for (name, path) in &parsed {
        if name.companion.is_some() {
            continue;
        }
        if name.kind == DataFileKind::Original {
            let records = load_records(path, None)?;
            let profile = profile_dataset(&records, descriptor);
            println!("[profile] {}", name.file_name());
            println!("  samples: {}", format_u128_with_commas(profile.samples as u128));
            for (field, stats) in &profile.text_lengths {
                println!(
                    "  {}: mean={:.1} min={} max={} sentences/sample={:.2}",
                    field, stats.mean, stats.min, stats.max, stats.mean_sentences
                );
            }
            for (field, counts) in &profile.label_distribution {
                let rendered: Vec<String> = counts
                    .iter()
                    .map(|(value, count)| format!("{value}={count}"))
                    .collect();
                println!("  {} distribution: {}", field, rendered.join(", "));
            }
            continue;
        }

        let original_name = DataFileName::original(name.dataset.clone(), name.samples);
        let Some(original_path) = parsed.get(&original_name) else {
            println!(
                "[{}] no matching {}; skipping diff",
                name.file_name(),
                original_name.file_name()
            );
            continue;
        };
        let original = load_records(original_path, None)?;
        let noisy = load_records(path, None)?;
        let impact = noise_impact(&original, &noisy)?;
        let labels = label_preservation(&original, &noisy, descriptor)?;

        println!("[impact] {}", name.file_name());
        println!(
            "  changed: {} of {} ({})",
            format_u128_with_commas(impact.changed_samples as u128),
            format_u128_with_commas(impact.total_samples as u128),
            format_percent(impact.realized_ratio)
        );
        println!("  mean length delta: {:.1}", impact.mean_length_delta);
        for (field, count) in &impact.field_changes {
            println!("  field '{}': {} changed", field, count);
        }
        for (field, changed) in &labels.changed_per_field {
            let verdict = match (&name.kind, *changed) {
                (DataFileKind::Flip { .. }, _) => "flipped",
                (_, 0) => "preserved",
                _ => "NOT preserved",
            };
            println!("  label '{}': {} changed ({})", field, changed, verdict);
        }
        for field in &labels.missing_fields {
            println!("  label '{}': missing from data", field);
        }

        if samples == 0 {
            continue;
        }
        if let Some(changes_path) = parsed.get(&name.with_companion(Companion::Changes)) {
            let changes = load_changes(changes_path)?;
            print_sample_comparisons(&compare_samples(&original, &noisy, &changes, samples)?);
        }
    }

    if !metadata.is_empty() {
        println!();
        print_experiment_rows(&summarize_experiments(&metadata));
        for meta in &metadata {
            let Some(distribution) = noise_type_distribution(&meta.noise_type_counts) else {
                continue;
            };
            let rendered: Vec<String> = distribution
                .per_type
                .iter()
                .map(|entry| format!("{}={}", entry.noise_type, format_percent(entry.share)))
                .collect();
            println!(
                "  {} @ {}: {}",
                meta.strategy.as_deref().unwrap_or("flip"),
                format_percent(meta.noise_ratio),
                rendered.join(", ")
            );
        }
    }
    println!();
    Ok(metadata)
}

fn print_cross_dataset(comparison: &CrossDatasetComparison) {
    println!(
        "=== cross-dataset comparison: {} @ {} ===",
        comparison.strategy.as_deref().unwrap_or(FLIP_TAG),
        format_percent(comparison.noise_ratio)
    );
    println!(
        "  {:<10} {:>8} {:>8} {:>8} {:>9} {:>10} {:>8}",
        "dataset", "targets", "changed", "unchg", "realized", "len delta", "effect"
    );
    for row in &comparison.rows {
        println!(
            "  {:<10} {:>8} {:>8} {:>8} {:>9} {:>10.1} {:>8}",
            row.dataset,
            format_u128_with_commas(row.target_count as u128),
            format_u128_with_commas(row.changed_count as u128),
            row.unchangeable_count,
            format_percent(row.realized_ratio),
            row.mean_length_delta,
            format_percent(row.effectiveness)
        );
    }
    println!("[RANKING]");
    for (rank, row) in comparison.ranking().iter().enumerate() {
        println!(
            "  {}. {}: {} effective ({} targets -> {} changed)",
            rank + 1,
            row.dataset,
            format_percent(row.effectiveness),
            format_u128_with_commas(row.target_count as u128),
            format_u128_with_commas(row.changed_count as u128)
        );
    }
    println!();
}

fn print_sample_comparisons(samples: &[SampleComparison]) {
    for sample in samples {
        println!("  [sample {}] {}", sample.index, sample.noise_type);
        for field in &sample.fields {
            println!("    {} before: {}", field.field, preview(&field.before));
            println!("    {} after:  {}", field.field, preview(&field.after));
        }
    }
}

fn preview(value: &FieldValue) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= PREVIEW_CHARS {
        return rendered;
    }
    let head: String = rendered.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

fn print_listed_file(file: &ListedFile) {
    let modified = file
        .entry
        .modified
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let (kind, percent, strategy) = match &file.name {
        Some(name) => (
            match (&name.kind, name.companion) {
                (_, Some(Companion::Changes)) => "changes",
                (_, Some(Companion::Meta)) => "meta",
                (DataFileKind::Original, None) => "original",
                (DataFileKind::Noisy { .. }, None) => "noisy",
                (DataFileKind::Flip { .. }, None) => "flip",
            },
            name.kind
                .percent()
                .map(|p| format!("{p}%"))
                .unwrap_or_else(|| "-".to_string()),
            name.kind.strategy().unwrap_or("-").to_string(),
        ),
        None => ("unknown", "-".to_string(), "-".to_string()),
    };
    println!(
        "  {:<56} {:<9} {:>5} {:<15} {:>10} {}",
        file.entry.file_name,
        kind,
        percent,
        strategy,
        format_bytes(file.entry.size_bytes),
        modified
    );
}

fn print_experiment_rows(rows: &[ExperimentRow]) {
    println!("[EXPERIMENTS]");
    println!(
        "  {:<15} {:>6} {:>8} {:>8} {:>8} {:>10} {:>8}",
        "strategy", "ratio", "targets", "changed", "unchg", "len delta", "effect"
    );
    for row in rows {
        println!(
            "  {:<15} {:>6} {:>8} {:>8} {:>8} {:>10.1} {:>8}",
            row.strategy.as_deref().unwrap_or("flip"),
            format_percent(row.noise_ratio),
            row.target_count,
            row.changed_count,
            row.unchangeable_count,
            row.mean_length_delta,
            format_percent(row.effectiveness)
        );
    }
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u32(raw: &str) -> Result<u32, String> {
    let parsed = raw
        .parse::<u32>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_ratio_arg(raw: &str) -> Result<f64, String> {
    let ratio = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Could not parse ratio '{}'", raw))?;
    crate::config::validate_ratio(ratio).map_err(|err| err.to_string())
}

fn parse_dataset_arg(raw: &str) -> Result<DatasetDescriptor, String> {
    DatasetDescriptor::by_name(raw).map_err(|err| err.to_string())
}

fn parse_strategy_arg(raw: &str) -> Result<NoiseStrategy, String> {
    NoiseStrategy::by_name(raw).map_err(|err| err.to_string())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
