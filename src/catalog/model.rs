//! Deserializable representation of `schema/views.json`.
//!
//! The types mirror the views schema so helpers and tests can reason about a
//! screen's endpoint, text field and facet dimensions without ad-hoc JSON
//! handling. Use `ViewRegistry` for validation and key lookup; use these structs
//! directly when building a view in code.

use crate::catalog::identity::{RecordId, ViewKey};
use crate::catalog::record::{Draft, scalar_text};
use crate::error::{self, CatalogError, FieldError};
use anyhow::Result;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Placeholder substituted with the record id in delete paths.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Clone, Debug, Deserialize, Serialize)]
/// Full views file as stored on disk.
pub struct ViewsFile {
    pub schema_version: String,
    pub views: Vec<ViewSpec>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// One catalog screen: where its collection lives and how it is filtered.
pub struct ViewSpec {
    pub key: ViewKey,
    pub title: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_path: Option<String>,
    pub text_field: String,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub numeric: Vec<String>,
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub add_policy: AddPolicy,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// Categorical filter dimension.
pub struct Dimension {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub domain: Domain,
    #[serde(default)]
    pub numeric: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Where a dimension's selectable values come from.
pub enum Domain {
    /// Fixed enumeration (departments, semesters, units).
    Fixed { values: Vec<Value> },
    /// Values observed in the current collection.
    Observed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
/// What a view does with its collection after a successful add.
pub enum AddPolicy {
    /// Refetch the whole collection; the create response body is ignored.
    #[default]
    Refetch,
    /// Append the created record returned by the backend.
    Append,
}

impl ViewSpec {
    /// Minimal spec with default endpoints and no dimensions.
    pub fn new(key: &str, endpoint: &str, text_field: &str) -> Self {
        Self {
            key: ViewKey(key.to_string()),
            title: key.to_string(),
            endpoint: endpoint.to_string(),
            list_path: None,
            create_path: None,
            delete_path: None,
            text_field: text_field.to_string(),
            dimensions: Vec::new(),
            required: Vec::new(),
            numeric: Vec::new(),
            defaults: Map::new(),
            add_policy: AddPolicy::default(),
        }
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn with_add_policy(mut self, policy: AddPolicy) -> Self {
        self.add_policy = policy;
        self
    }

    pub fn list_path(&self) -> &str {
        self.list_path.as_deref().unwrap_or(&self.endpoint)
    }

    pub fn create_path(&self) -> &str {
        self.create_path.as_deref().unwrap_or(&self.endpoint)
    }

    /// Delete path for one record, with the id encoded as one path segment.
    ///
    /// Ids that URL normalization would rewrite (`.`, `..`, or text holding
    /// tabs or newlines) are refused instead of being sent to another resource.
    pub fn delete_path(&self, id: &RecordId) -> error::Result<String> {
        let segment = encode_path_segment(&id.to_string())?;
        Ok(match &self.delete_path {
            Some(template) => template.replace(ID_PLACEHOLDER, &segment),
            None => format!("{}/{segment}", self.endpoint.trim_end_matches('/')),
        })
    }

    pub fn dimension(&self, field: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.field == field)
    }

    /// Fields a draft must fill: the text field, every dimension, then extras.
    pub fn required_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let candidates = std::iter::once(self.text_field.as_str())
            .chain(self.dimensions.iter().map(|dim| dim.field.as_str()))
            .chain(self.required.iter().map(String::as_str));
        for field in candidates {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// Fields that must parse as numbers in a draft.
    pub fn numeric_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let candidates = self
            .dimensions
            .iter()
            .filter(|dim| dim.numeric)
            .map(|dim| dim.field.as_str())
            .chain(self.numeric.iter().map(String::as_str));
        for field in candidates {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    /// The form state restored after a successful add.
    pub fn empty_form(&self) -> Draft {
        Draft::from_fields(self.defaults.clone())
    }
}

impl Dimension {
    pub fn observed(field: &str) -> Self {
        Self {
            field: field.to_string(),
            label: None,
            domain: Domain::Observed,
            numeric: false,
        }
    }

    pub fn fixed(field: &str, values: impl IntoIterator<Item = Value>) -> Self {
        let values: Vec<Value> = values.into_iter().collect();
        let numeric = !values.is_empty() && values.iter().all(Value::is_number);
        Self {
            field: field.to_string(),
            label: None,
            domain: Domain::Fixed { values },
            numeric,
        }
    }

    /// Text forms of a fixed domain, in declaration order; `None` when observed.
    pub fn fixed_values(&self) -> Option<Vec<String>> {
        match &self.domain {
            Domain::Fixed { values } => Some(
                values
                    .iter()
                    .filter_map(|v| scalar_text(v).map(|s| s.into_owned()))
                    .collect(),
            ),
            Domain::Observed => None,
        }
    }
}

fn encode_path_segment(raw: &str) -> error::Result<String> {
    let unusable = || CatalogError::Validation {
        errors: vec![FieldError::new(
            "id",
            format!("'{raw}' cannot be used as a URL path segment"),
        )],
    };
    if matches!(raw, "" | "." | "..") || raw.contains(['\t', '\n', '\r']) {
        return Err(unusable());
    }
    // `push` escapes `/`, `%`, `?` and `#` in addition to the path set.
    let mut scratch = Url::parse("http://localhost/").map_err(|_| unusable())?;
    scratch
        .path_segments_mut()
        .map_err(|_| unusable())?
        .push(raw);
    Ok(scratch.path().trim_start_matches('/').to_string())
}

/// Read and parse a views file from disk without additional validation.
pub fn load_views_from_path(path: &Path) -> Result<ViewsFile> {
    let data = fs::read_to_string(path)?;
    let views: ViewsFile = serde_json::from_str(&data)?;
    Ok(views)
}
