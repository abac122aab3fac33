//! Pre-flight validation for drafts.
//!
//! Runs before any request is built: every required field must be present and
//! non-blank, numeric fields must parse as numbers. All violations are
//! reported together, one per field, and numeric strings come back converted
//! so the backend always receives numbers.

use crate::catalog::{Draft, ViewSpec};
use crate::error::{CatalogError, FieldError};
use serde_json::{Map, Number, Value};

/// Validate `draft` against `spec`, returning the normalized field map.
pub fn validate_draft(spec: &ViewSpec, draft: &Draft) -> Result<Map<String, Value>, CatalogError> {
    let mut errors = Vec::new();
    let mut fields = draft.fields().clone();

    if fields.contains_key("id") {
        errors.push(FieldError::new("id", "is assigned by the server"));
    }

    for field in spec.required_fields() {
        if is_blank(fields.get(field)) {
            errors.push(FieldError::new(field, "is required"));
        }
    }

    for field in spec.numeric_fields() {
        let Some(value) = fields.get_mut(field) else {
            continue;
        };
        if is_blank(Some(&*value)) {
            continue;
        }
        match as_number(value) {
            Some(number) => *value = Value::Number(number),
            None => errors.push(FieldError::new(field, "must be a number")),
        }
    }

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(CatalogError::Validation { errors })
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn as_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) if n.is_f64() => n.as_f64().and_then(from_float),
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(int) = trimmed.parse::<i64>() {
                return Some(Number::from(int));
            }
            trimmed.parse::<f64>().ok().and_then(from_float)
        }
        _ => None,
    }
}

/// Whole floats become integers so `3.0` and `3` compare as the same value.
fn from_float(value: f64) -> Option<Number> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}
