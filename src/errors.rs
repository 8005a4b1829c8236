use std::io;

use thiserror::Error;

use crate::types::{FieldName, SampleIndex};

/// Error type for configuration, record validation, invariant, and IO failures.
#[derive(Debug, Error)]
pub enum NoiseError {
    /// Invalid request, descriptor, strategy, or input set.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A record lacks a declared field or holds the wrong kind of value.
    #[error("record {index} does not match the dataset schema: {details}")]
    SchemaMismatch {
        /// Offending record.
        index: SampleIndex,
        /// What did not match.
        details: String,
    },
    /// A label value outside the flip mapping was met under flip mode.
    #[error("record {index} has label '{field}' = {value} with no flip mapping")]
    UnmappedLabel {
        /// Offending record.
        index: SampleIndex,
        /// Label field holding the value.
        field: FieldName,
        /// Rendered label value.
        value: String,
    },
    /// A post-check on a processed record failed.
    #[error("invariant violated at record {index}: {details}")]
    InvariantViolation {
        /// Offending record.
        index: SampleIndex,
        /// Which check failed.
        details: String,
    },
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// JSON encoding or decoding failure.
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl NoiseError {
    /// True for errors raised before any record is processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            NoiseError::Configuration(_) | NoiseError::SchemaMismatch { .. }
        )
    }

    /// Record index attached to the error, if any.
    pub fn sample_index(&self) -> Option<SampleIndex> {
        match self {
            NoiseError::SchemaMismatch { index, .. }
            | NoiseError::UnmappedLabel { index, .. }
            | NoiseError::InvariantViolation { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NoiseError {
    fn from(err: serde_json::Error) -> Self {
        NoiseError::Serialization(err.to_string())
    }
}
