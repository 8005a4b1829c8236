//! Per-dataset schema descriptors.
//!
//! Every dataset-specific decision (which fields are text, which are labels,
//! whether and how labels flip, how records are stratified) lives in a
//! [`DatasetDescriptor`] value. Adding a dataset means adding a descriptor, not
//! a new code path.

use std::collections::{BTreeMap, HashSet};

use crate::constants::sampler::{
    LABEL_STRATUM_PREFIX, LENGTH_BUCKET_BOUNDS, LENGTH_STRATUM_PREFIX, MISSING_STRATUM,
};
use crate::data::{FieldValue, Record};
use crate::errors::NoiseError;
use crate::types::{DatasetName, FieldName, SampleIndex, StratumKey};

/// How the stratified sampler partitions a dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrataKey {
    /// Bucket by character length of a text field.
    LengthBucket { field: FieldName },
    /// Bucket by the value of a label field.
    LabelValue { field: FieldName },
    /// Everything in one stratum.
    Single,
}

impl StrataKey {
    /// Stratum key for `record`.
    pub fn key_for(&self, record: &Record) -> StratumKey {
        match self {
            StrataKey::LengthBucket { field } => match record.text(field) {
                Some(text) => length_bucket(text.chars().count()),
                None => MISSING_STRATUM.to_string(),
            },
            StrataKey::LabelValue { field } => match record.get(field) {
                Some(value) => format!("{LABEL_STRATUM_PREFIX}{value}"),
                None => MISSING_STRATUM.to_string(),
            },
            StrataKey::Single => String::new(),
        }
    }
}

/// Length-bucket label for a text of `chars` characters.
pub fn length_bucket(chars: usize) -> StratumKey {
    LENGTH_BUCKET_BOUNDS
        .iter()
        .find(|bound| chars < **bound)
        .map(|bound| format!("{LENGTH_STRATUM_PREFIX}<{bound}"))
        .unwrap_or_else(|| {
            let last = LENGTH_BUCKET_BOUNDS[LENGTH_BUCKET_BOUNDS.len() - 1];
            format!("{LENGTH_STRATUM_PREFIX}>={last}")
        })
}

/// Label remapping used in flip mode.
///
/// Guaranteed to be an involution without fixed points: flipping twice
/// restores the original value, and flipping once always changes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlipMapping {
    map: BTreeMap<FieldValue, FieldValue>,
}

impl FlipMapping {
    /// Build a mapping from explicit `(from, to)` pairs.
    pub fn new<I>(pairs: I) -> Result<Self, NoiseError>
    where
        I: IntoIterator<Item = (FieldValue, FieldValue)>,
    {
        let mut map = BTreeMap::new();
        for (from, to) in pairs {
            if from == to {
                return Err(NoiseError::Configuration(format!(
                    "flip mapping has fixed point {from}"
                )));
            }
            if map.insert(from.clone(), to).is_some() {
                return Err(NoiseError::Configuration(format!(
                    "flip mapping maps {from} more than once"
                )));
            }
        }
        for (from, to) in &map {
            if map.get(to) != Some(from) {
                return Err(NoiseError::Configuration(format!(
                    "flip mapping is not an involution: {from} -> {to} does not map back"
                )));
            }
        }
        if map.is_empty() {
            return Err(NoiseError::Configuration(
                "flip mapping is empty".to_string(),
            ));
        }
        Ok(Self { map })
    }

    /// Mapping that swaps each pair of values.
    pub fn swap_pairs<I>(pairs: I) -> Result<Self, NoiseError>
    where
        I: IntoIterator<Item = (FieldValue, FieldValue)>,
    {
        Self::new(
            pairs
                .into_iter()
                .flat_map(|(a, b)| [(a.clone(), b.clone()), (b, a)]),
        )
    }

    /// Binary `0 <-> 1` mapping used by the GLUE classification datasets.
    pub fn binary() -> Self {
        let mut map = BTreeMap::new();
        map.insert(FieldValue::Integer(0), FieldValue::Integer(1));
        map.insert(FieldValue::Integer(1), FieldValue::Integer(0));
        Self { map }
    }

    /// Flipped value, `None` when `value` is not mapped.
    pub fn flip(&self, value: &FieldValue) -> Option<&FieldValue> {
        self.map.get(value)
    }

    /// Mapping entries in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&FieldValue, &FieldValue)> {
        self.map.iter()
    }
}

/// Immutable schema of one dataset kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetDescriptor {
    name: DatasetName,
    text_fields: Vec<FieldName>,
    label_fields: Vec<FieldName>,
    flip_mapping: Option<FlipMapping>,
    strata: StrataKey,
}

impl DatasetDescriptor {
    /// Build and validate a custom descriptor.
    pub fn new(
        name: impl Into<DatasetName>,
        text_fields: Vec<FieldName>,
        label_fields: Vec<FieldName>,
        flip_mapping: Option<FlipMapping>,
        strata: StrataKey,
    ) -> Result<Self, NoiseError> {
        let descriptor = Self {
            name: name.into(),
            text_fields,
            label_fields,
            flip_mapping,
            strata,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), NoiseError> {
        let invalid = |details: String| {
            NoiseError::Configuration(format!("dataset '{}': {details}", self.name))
        };
        if self.text_fields.is_empty() {
            return Err(invalid("at least one text field is required".into()));
        }
        let mut seen = HashSet::new();
        for field in self.text_fields.iter().chain(&self.label_fields) {
            if !seen.insert(field.as_str()) {
                return Err(invalid(format!(
                    "field '{field}' is declared more than once"
                )));
            }
        }
        if self.flip_mapping.is_some() && self.label_fields.is_empty() {
            return Err(invalid("flip mapping given without label fields".into()));
        }
        Ok(())
    }

    /// Stanford Alpaca instruction data: free text, no labels.
    pub fn alpaca() -> Self {
        Self {
            name: "alpaca".into(),
            text_fields: vec!["instruction".into(), "output".into()],
            label_fields: Vec::new(),
            flip_mapping: None,
            strata: StrataKey::LengthBucket {
                field: "instruction".into(),
            },
        }
    }

    /// GSM8K math word problems: the answer is a preserved text label.
    pub fn gsm8k() -> Self {
        Self {
            name: "gsm8k".into(),
            text_fields: vec!["question".into()],
            label_fields: vec!["answer".into()],
            flip_mapping: None,
            strata: StrataKey::LengthBucket {
                field: "question".into(),
            },
        }
    }

    /// SST-2 binary sentiment.
    pub fn sst2() -> Self {
        Self {
            name: "sst2".into(),
            text_fields: vec!["sentence".into()],
            label_fields: vec!["label".into()],
            flip_mapping: Some(FlipMapping::binary()),
            strata: StrataKey::LabelValue {
                field: "label".into(),
            },
        }
    }

    /// MRPC paraphrase pairs.
    pub fn mrpc() -> Self {
        Self {
            name: "mrpc".into(),
            text_fields: vec!["sentence1".into(), "sentence2".into()],
            label_fields: vec!["label".into()],
            flip_mapping: Some(FlipMapping::binary()),
            strata: StrataKey::LabelValue {
                field: "label".into(),
            },
        }
    }

    /// Built-in descriptor table.
    pub fn catalog() -> Vec<DatasetDescriptor> {
        vec![Self::alpaca(), Self::gsm8k(), Self::sst2(), Self::mrpc()]
    }

    /// Look up a built-in descriptor by name (case-insensitive).
    pub fn by_name(name: &str) -> Result<Self, NoiseError> {
        Self::catalog()
            .into_iter()
            .find(|descriptor| descriptor.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                NoiseError::Configuration(format!("unknown dataset '{name}'"))
            })
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields noise may modify.
    pub fn text_fields(&self) -> &[FieldName] {
        &self.text_fields
    }

    /// Fields preserved in text-noise runs.
    pub fn label_fields(&self) -> &[FieldName] {
        &self.label_fields
    }

    /// Label flip mapping, if the dataset has one.
    pub fn flip_mapping(&self) -> Option<&FlipMapping> {
        self.flip_mapping.as_ref()
    }

    /// Whether label-flip runs are allowed.
    pub fn supports_label_flip(&self) -> bool {
        self.flip_mapping.is_some()
    }

    /// How records are grouped for sampling.
    pub fn strata(&self) -> &StrataKey {
        &self.strata
    }

    /// Whether `field` is a declared text field.
    pub fn is_text_field(&self, field: &str) -> bool {
        self.text_fields.iter().any(|name| name == field)
    }

    /// Whether `field` is a declared label field.
    pub fn is_label_field(&self, field: &str) -> bool {
        self.label_fields.iter().any(|name| name == field)
    }

    /// Check that `record` carries every declared field and that text fields
    /// hold text.
    pub fn validate_record(&self, index: SampleIndex, record: &Record) -> Result<(), NoiseError> {
        for field in &self.text_fields {
            match record.get(field) {
                Some(FieldValue::Text(_)) => {}
                Some(other) => {
                    return Err(NoiseError::SchemaMismatch {
                        index,
                        details: format!("text field '{field}' holds non-text value {other}"),
                    });
                }
                None => {
                    return Err(NoiseError::SchemaMismatch {
                        index,
                        details: format!("missing text field '{field}'"),
                    });
                }
            }
        }
        for field in &self.label_fields {
            if !record.contains(field) {
                return Err(NoiseError::SchemaMismatch {
                    index,
                    details: format!("missing label field '{field}'"),
                });
            }
        }
        Ok(())
    }
}
