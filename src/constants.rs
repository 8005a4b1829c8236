/// Constants used by rng stream derivation.
pub mod rng {
    /// FNV-1a 64-bit offset basis.
    pub const FNV1A64_OFFSET: u64 = 0xcbf29ce484222325;
    /// FNV-1a 64-bit prime.
    pub const FNV1A64_PRIME: u64 = 0x100000001b3;

    /// Purpose tag for per-stratum target draws.
    pub const PURPOSE_SAMPLER: &str = "sampler";
    /// Purpose tag for the strategy category draw.
    pub const PURPOSE_DISPATCH: &str = "dispatch";
    /// Purpose tag for grammar generator streams.
    pub const PURPOSE_GRAMMAR: &str = "grammar";
    /// Purpose tag for semantic generator streams.
    pub const PURPOSE_SEMANTIC: &str = "semantic";
    /// Purpose tag for quality generator streams.
    pub const PURPOSE_QUALITY: &str = "quality";
    /// Purpose tag for the escalated quality-fallback pass.
    pub const PURPOSE_ESCALATION: &str = "escalation";
}

/// Constants used by the stratified sampler.
pub mod sampler {
    /// Upper bounds (exclusive, in characters) of the length buckets used by
    /// free-text datasets. Lengths at or above the last bound share one bucket.
    pub const LENGTH_BUCKET_BOUNDS: [usize; 5] = [32, 64, 128, 256, 512];
    /// Prefix for length-bucket stratum keys.
    pub const LENGTH_STRATUM_PREFIX: &str = "len";
    /// Prefix for label-value stratum keys.
    pub const LABEL_STRATUM_PREFIX: &str = "label=";
    /// Stratum key for records whose stratum field is missing.
    pub const MISSING_STRATUM: &str = "missing";
}

/// Constants used by noise strategies and their validation.
pub mod strategy {
    /// Allowed deviation of a strategy's weight sum from 1.0.
    pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
    /// Catalog name for the balanced strategy.
    pub const BALANCED: &str = "balanced";
    /// Catalog name for the grammar-heavy strategy.
    pub const GRAMMAR_HEAVY: &str = "grammar_heavy";
    /// Catalog name for the semantic-heavy strategy.
    pub const SEMANTIC_HEAVY: &str = "semantic_heavy";
    /// Weights `(grammar, semantic, quality)` of the balanced strategy.
    pub const BALANCED_WEIGHTS: [f64; 3] = [0.40, 0.35, 0.25];
    /// Weights `(grammar, semantic, quality)` of the grammar-heavy strategy.
    pub const GRAMMAR_HEAVY_WEIGHTS: [f64; 3] = [0.60, 0.25, 0.15];
    /// Weights `(grammar, semantic, quality)` of the semantic-heavy strategy.
    pub const SEMANTIC_HEAVY_WEIGHTS: [f64; 3] = [0.20, 0.60, 0.20];
}

/// Constants used by the grammar generator.
pub mod grammar {
    /// Minimum word count for which a grammar corruption is guaranteed.
    pub const MIN_WORDS: usize = 2;
    /// Letter pairs that are commonly confused; substitution goes both ways.
    pub const CONFUSABLE_PAIRS: [(char, char); 12] = [
        ('a', 'e'),
        ('e', 'i'),
        ('i', 'y'),
        ('o', 'u'),
        ('m', 'n'),
        ('c', 'k'),
        ('s', 'z'),
        ('b', 'v'),
        ('d', 't'),
        ('g', 'j'),
        ('f', 'p'),
        ('l', 'r'),
    ];
    /// Frequent words and their canned misspellings.
    pub const COMMON_MISSPELLINGS: [(&str, [&str; 2]); 8] = [
        ("the", ["teh", "hte"]),
        ("and", ["adn", "nad"]),
        ("you", ["yuo", "oyu"]),
        ("for", ["fro", "ofr"]),
        ("are", ["aer", "rae"]),
        ("with", ["wiht", "whit"]),
        ("this", ["thsi", "tihs"]),
        ("that", ["taht", "htat"]),
    ];
    /// Verb forms swapped to break subject-verb agreement.
    pub const AGREEMENT_SWAPS: [(&str, &str); 7] = [
        ("is", "are"),
        ("was", "were"),
        ("has", "have"),
        ("does", "do"),
        ("doesn't", "don't"),
        ("isn't", "aren't"),
        ("wasn't", "weren't"),
    ];
    /// Appended when no other punctuation corruption applies.
    pub const EXCESS_PUNCTUATION: &str = "???";
}

/// Constants used by the semantic generator.
pub mod semantic {
    /// Standalone sentences with no relation to typical instruction data.
    pub const OUT_OF_CONTEXT_SENTENCES: [&str; 6] = [
        "Octopuses have three hearts and blue blood.",
        "The Eiffel Tower grows a few centimeters taller every summer.",
        "Honey found in ancient tombs is still edible.",
        "A group of flamingos is called a flamboyance.",
        "Venus rotates in the opposite direction to most planets.",
        "Bananas are technically berries, but strawberries are not.",
    ];
    /// Conversational tangents appended after the text.
    pub const TANGENT_SENTENCES: [&str; 5] = [
        "By the way, I have always wanted to learn the accordion.",
        "Speaking of which, the weather has been lovely lately.",
        "Unrelated, but my favorite color is teal.",
        "Anyway, did you know cats sleep for most of the day?",
        "On another note, I still think pineapple belongs on pizza.",
    ];
    /// Clauses spliced after a word to pull the text off topic.
    pub const DRIFT_CLAUSES: [&str; 5] = [
        ", much like the migration patterns of arctic terns,",
        ", which reminds me of an old sailing documentary,",
        ", not unlike the rules of competitive chess,",
        ", as any medieval blacksmith would tell you,",
        ", similar to how sourdough needs time to rise,",
    ];
}

/// Constants used by the quality generator.
pub mod quality {
    /// Lower bound of the kept word-prefix fraction when truncating.
    pub const TRUNCATE_MIN_FRACTION: f64 = 0.3;
    /// Upper bound of the kept word-prefix fraction when truncating.
    pub const TRUNCATE_MAX_FRACTION: f64 = 0.7;
    /// Marker appended to truncated text.
    pub const TRUNCATION_MARKER: &str = "...";
    /// Low-information replacements; at least two distinct entries are required
    /// so one always differs from the input.
    pub const LOW_INFORMATION_RESPONSES: [&str; 6] = [
        "I don't know.",
        "Yes.",
        "No.",
        "Maybe.",
        "Not sure.",
        "N/A",
    ];
}

/// Constants used by the forced-mutation guarantor and engine defaults.
pub mod engine {
    /// Default dispatcher attempts before escalating to the quality fallback.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default global seed.
    pub const DEFAULT_SEED: u64 = 42;
    /// Default fraction of records targeted.
    pub const DEFAULT_NOISE_RATIO: f64 = 0.2;
    /// Ratios run by the experiment runner when none are given.
    pub const DEFAULT_EXPERIMENT_RATIOS: [f64; 3] = [0.1, 0.2, 0.3];
}

/// Constants used by JSON persistence and file naming.
pub mod persist {
    /// Extension of every data file.
    pub const DATA_FILE_EXTENSION: &str = "json";
    /// Kind tag for untouched datasets.
    pub const ORIGINAL_TAG: &str = "original";
    /// Kind tag for text-noise datasets.
    pub const NOISY_TAG: &str = "noisy";
    /// Kind tag for label-flip datasets.
    pub const FLIP_TAG: &str = "flip";
    /// Suffix marker placed after the ratio in file names (`20percent`).
    pub const PERCENT_SUFFIX: &str = "percent";
    /// Companion file suffix for change records.
    pub const CHANGES_SUFFIX: &str = "changes";
    /// Companion file suffix for run metadata.
    pub const META_SUFFIX: &str = "meta";
    /// Default output directory.
    pub const DEFAULT_DATA_DIR: &str = "./data";
}

/// Constants used by the analysis reports.
pub mod analysis {
    /// Ratio compared across datasets by default.
    pub const DEFAULT_COMPARISON_RATIO: f64 = 0.2;
    /// Strategy compared across datasets by default.
    pub const DEFAULT_COMPARISON_STRATEGY: &str = "balanced";
    /// Datasets needed for a cross-dataset comparison.
    pub const MIN_COMPARED_DATASETS: usize = 2;
    /// Changed records shown before/after per noisy file.
    pub const DEFAULT_SAMPLE_COMPARISONS: usize = 3;
    /// Characters of a field value shown in before/after output.
    pub const PREVIEW_CHARS: usize = 160;
}
