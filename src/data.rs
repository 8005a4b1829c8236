use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

pub use crate::types::{FieldName, SampleIndex};

/// Value stored in a record field.
///
/// Text covers free-form fields (and text-valued labels such as GSM8K answers);
/// integers cover class labels. Floats land in `Number` and every other JSON
/// value (booleans, null, arrays, objects) in `Other`; both are carried
/// through unchanged.
///
/// Ordering and equality compare integers and text natively and everything
/// else by its compact JSON rendering, grouped by variant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integral JSON number that fits in `i64`.
    Integer(i64),
    /// JSON string.
    Text(String),
    /// Any other JSON number.
    Number(serde_json::Number),
    /// Boolean, null, array, or object.
    Other(serde_json::Value),
}

impl FieldValue {
    /// Borrow the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Character length of a text value; other values count as zero.
    pub fn char_len(&self) -> usize {
        self.as_text().map(|text| text.chars().count()).unwrap_or(0)
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Integer(_) => 0,
            FieldValue::Text(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Other(_) => 3,
        }
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.to_string().cmp(&b.to_string()),
            (FieldValue::Other(a), FieldValue::Other(b)) => a.to_string().cmp(&b.to_string()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FieldValue::Integer(value) => value.hash(state),
            FieldValue::Text(text) => text.hash(state),
            FieldValue::Number(number) => number.to_string().hash(state),
            FieldValue::Other(value) => value.to_string().hash(state),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            FieldValue::Text(text) => write!(f, "{text:?}"),
            FieldValue::Number(number) => write!(f, "{number}"),
            FieldValue::Other(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

/// One dataset sample: an ordered mapping from field name to value.
///
/// Field order is preserved so serialized output is byte-stable. The key set
/// is fixed once built: [`Record::set_existing`] refuses unknown fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<FieldName, FieldValue>,
}

impl Record {
    /// Build a record from `(field, value)` pairs, keeping their order.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<FieldName>,
        V: Into<FieldValue>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Text payload of `field`, if present and textual.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Whether `field` is present.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Overwrite an existing field. Returns the previous value, or `None`
    /// (and leaves the record untouched) when the field does not exist.
    pub fn set_existing(&mut self, field: &str, value: FieldValue) -> Option<FieldValue> {
        let slot = self.fields.get_mut(field)?;
        Some(std::mem::replace(slot, value))
    }

    /// Field names in document order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Corruption applied to a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    /// Typos, word transpositions, punctuation and agreement errors.
    Grammar,
    /// Out-of-context sentences, tangents, topic drift.
    Semantic,
    /// Truncation, duplication, low-information replacement.
    Quality,
    /// Deterministic label remapping.
    LabelFlip,
    /// Untouched sample.
    None,
}

impl NoiseType {
    /// The three text-noise families, in strategy weight order.
    pub const TEXT_NOISE: [NoiseType; 3] =
        [NoiseType::Grammar, NoiseType::Semantic, NoiseType::Quality];

    /// Name used in change records and metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseType::Grammar => "grammar",
            NoiseType::Semantic => "semantic",
            NoiseType::Quality => "quality",
            NoiseType::LabelFlip => "label_flip",
            NoiseType::None => "none",
        }
    }
}

impl fmt::Display for NoiseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-sample annotation emitted alongside the output records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Position of the sample in the input (and output) sequence.
    pub sample_index: SampleIndex,
    /// Whether the sampler selected this sample.
    pub was_targeted: bool,
    /// Noise family that produced the final record.
    pub noise_type_applied: NoiseType,
    /// Fields whose value differs from the original.
    pub fields_changed: BTreeSet<FieldName>,
    /// Sum of character-length changes over text fields.
    pub length_delta: i64,
}

impl ChangeRecord {
    /// Targeted sample that no generator could alter.
    pub fn is_unchangeable(&self) -> bool {
        self.was_targeted && self.fields_changed.is_empty()
    }
}
