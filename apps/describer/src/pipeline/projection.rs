//! Record → JSON projection.
//!
//! Field-by-field and order-preserving. Value rules live in `Scalar::to_json`:
//! nulls stay `null`, integers become numbers, decimals become strings carrying
//! the exact source text.

use serde_json::{Map, Value};

use crate::pipeline::errors::PipelineError;
use crate::pipeline::join::NormalizedRecord;

/// A flat JSON object, as sent to the model.
pub type JsonRecord = Map<String, Value>;

pub fn project(record: &NormalizedRecord) -> JsonRecord {
    record
        .fields()
        .map(|(name, value)| (name.to_string(), value.to_json()))
        .collect()
}

/// Reads a field the downstream collaborator depends on, as text.
///
/// Fails with `MissingField` when the field is absent or null.
pub fn required_text(
    record: &JsonRecord,
    field: &str,
    article_code: &str,
) -> Result<String, PipelineError> {
    let missing = || PipelineError::MissingField {
        article_code: article_code.to_string(),
        field: field.to_string(),
    };

    match record.get(field) {
        None | Some(Value::Null) => Err(missing()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
    }
}
