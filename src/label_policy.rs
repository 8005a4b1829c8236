//! Label preservation and label flipping.
//!
//! The policy is always the last write to a record: in preserve mode label
//! fields are copied back from the original whatever the generators did, and
//! in flip mode the record is rebuilt from the original with remapped labels.

use crate::config::LabelMode;
use crate::data::Record;
use crate::descriptor::DatasetDescriptor;
use crate::errors::NoiseError;
use crate::types::SampleIndex;

/// Build the final record for a targeted sample.
///
/// * `Preserve`: `mutated` with every label field overwritten by the original
///   value.
/// * `Flip`: `original` with every label field remapped through the dataset's
///   flip mapping. A label with no mapping is fatal.
pub fn apply_label_policy(
    original: &Record,
    mutated: &Record,
    mode: LabelMode,
    descriptor: &DatasetDescriptor,
    index: SampleIndex,
) -> Result<Record, NoiseError> {
    match mode {
        LabelMode::Preserve => {
            let mut restored = mutated.clone();
            for field in descriptor.label_fields() {
                if let Some(value) = original.get(field) {
                    restored.set_existing(field, value.clone());
                }
            }
            Ok(restored)
        }
        LabelMode::Flip => {
            let mapping = descriptor.flip_mapping().ok_or_else(|| {
                NoiseError::Configuration(format!(
                    "dataset '{}' does not support label flipping",
                    descriptor.name()
                ))
            })?;
            let mut flipped = original.clone();
            for field in descriptor.label_fields() {
                let Some(value) = original.get(field) else {
                    continue;
                };
                let target = mapping
                    .flip(value)
                    .ok_or_else(|| NoiseError::UnmappedLabel {
                        index,
                        field: field.clone(),
                        value: value.to_string(),
                    })?;
                flipped.set_existing(field, target.clone());
            }
            Ok(flipped)
        }
    }
}

/// Re-check the final record against the policy.
///
/// Always: same field names in the same order, passthrough fields untouched.
/// Preserve: no label changed. Flip: a label changed iff `targeted`, flipping
/// it back restores the original, and no text field changed.
pub fn verify_label_policy(
    original: &Record,
    final_record: &Record,
    mode: LabelMode,
    targeted: bool,
    descriptor: &DatasetDescriptor,
    index: SampleIndex,
) -> Result<(), NoiseError> {
    let violation = |details: String| NoiseError::InvariantViolation { index, details };

    if !original.field_names().eq(final_record.field_names()) {
        return Err(violation("field set changed during noise injection".into()));
    }
    for (field, value) in original.iter() {
        if descriptor.is_text_field(field) || descriptor.is_label_field(field) {
            continue;
        }
        if final_record.get(field) != Some(value) {
            return Err(violation(format!("passthrough field '{field}' was modified")));
        }
    }

    match mode {
        LabelMode::Preserve => {
            for field in descriptor.label_fields() {
                if original.get(field) != final_record.get(field) {
                    return Err(violation(format!(
                        "label '{field}' changed in preserve mode"
                    )));
                }
            }
        }
        LabelMode::Flip => {
            for field in descriptor.text_fields() {
                if original.get(field) != final_record.get(field) {
                    return Err(violation(format!("text field '{field}' changed in flip mode")));
                }
            }
            for field in descriptor.label_fields() {
                let before = original.get(field);
                let after = final_record.get(field);
                let changed = before != after;
                if changed != targeted {
                    return Err(violation(format!(
                        "label '{field}' changed={changed} but targeted={targeted}"
                    )));
                }
                if changed {
                    let restored = descriptor
                        .flip_mapping()
                        .zip(after)
                        .and_then(|(mapping, value)| mapping.flip(value));
                    if restored != before {
                        return Err(violation(format!(
                            "label '{field}' does not flip back to its original value"
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}
