//! Decoding and validation of the model's JSON answer.
//!
//! The model is the only source of structure in a turn, so nothing leaves
//! this module unless it has the expected shape. Decoding ([`parse`]) and
//! shape checks ([`validate`]) are separate so either can be exercised alone.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::chart::{build_chart, ChartSpec};
use crate::error::{ReplyError, SchemaError};

/// A validated model answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReply {
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl ModelReply {
    /// A chart is only drawn when the model sent both series.
    pub fn chart(&self) -> Option<ChartSpec> {
        match (&self.data, &self.labels) {
            (Some(data), Some(labels)) => Some(build_chart(data, labels)),
            _ => None,
        }
    }
}

/// Decode `raw` as JSON and validate it.
pub fn parse(raw: &str) -> Result<ModelReply, ReplyError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(validate(value)?)
}

/// Check a decoded value against the reply schema.
///
/// `explanation` is required and must be a string. `data` (numbers) and
/// `labels` (strings) are optional, `null` counts as absent, and when both
/// are present they must have the same length.
pub fn validate(value: Value) -> Result<ModelReply, SchemaError> {
    let Value::Object(mut object) = value else {
        return Err(SchemaError::NotAnObject);
    };

    let explanation = match object.remove("explanation") {
        None => return Err(SchemaError::MissingExplanation),
        Some(Value::String(s)) => s,
        Some(_) => return Err(SchemaError::ExplanationNotString),
    };

    let data = take_array(&mut object, "data", SchemaError::InvalidData)?
        .map(|items| {
            items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .ok_or(SchemaError::InvalidData)
        })
        .transpose()?;

    let labels = take_array(&mut object, "labels", SchemaError::InvalidLabels)?
        .map(|items| {
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect::<Option<Vec<String>>>()
                .ok_or(SchemaError::InvalidLabels)
        })
        .transpose()?;

    if let (Some(data), Some(labels)) = (&data, &labels) {
        if data.len() != labels.len() {
            return Err(SchemaError::LengthMismatch {
                data: data.len(),
                labels: labels.len(),
            });
        }
    }

    Ok(ModelReply {
        explanation,
        data,
        labels,
    })
}

fn take_array(
    object: &mut Map<String, Value>,
    key: &str,
    not_an_array: SchemaError,
) -> Result<Option<Vec<Value>>, SchemaError> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(_) => Err(not_an_array),
    }
}
