/// Name of a record field.
/// Examples: `instruction`, `sentence1`, `label`
pub type FieldName = String;
/// Identifier of a dataset kind in the descriptor catalog.
/// Examples: `alpaca`, `gsm8k`, `sst2`, `mrpc`
pub type DatasetName = String;
/// Name of a noise strategy.
/// Examples: `balanced`, `grammar_heavy`, `semantic_heavy`
pub type StrategyName = String;
/// Stratum key produced by a strata function.
/// Examples: `len<64`, `len>=512`, `label=1`
pub type StratumKey = String;
/// Position of a record within the input sequence.
/// Example: `17`
pub type SampleIndex = usize;
/// Purpose tag mixed into rng stream derivation.
/// Examples: `sampler`, `dispatch`, `grammar`
pub type PurposeTag = &'static str;
/// Components used to build output file names.
/// Example: `sst2_noisy_20percent_balanced_500.json`
pub type FileNameString = String;
