//! Validated registry of view definitions.
//!
//! The registry enforces the views schema and version, then cross-checks what
//! the schema cannot express: unique keys, unique dimension fields, delete
//! templates that carry an id placeholder, and defaults that agree with
//! numeric fields. Helpers never construct a view from an unchecked file.

use crate::catalog::identity::ViewKey;
use crate::catalog::model::{Domain, ID_PLACEHOLDER, ViewSpec, ViewsFile, load_views_from_path};
use crate::schema_loader::{is_identifier, load_json_schema};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

// Only one views format exists; reject anything else rather than guess at
// field meanings.
pub const VIEWS_SCHEMA_VERSION: &str = "catalog_views_v1";

const VIEWS_SCHEMA_FILE: &str = "schema/views.schema.json";

#[derive(Debug)]
/// Views file plus an index keyed by view key.
pub struct ViewRegistry {
    schema_version: String,
    by_key: BTreeMap<ViewKey, ViewSpec>,
}

impl ViewRegistry {
    /// Load and validate a views file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        validate_against_schema(path)?;
        let file =
            load_views_from_path(path).with_context(|| format!("loading {}", path.display()))?;
        Self::from_file(file)
    }

    /// Validate an already-parsed views file (skips JSON Schema validation).
    pub fn from_file(file: ViewsFile) -> Result<Self> {
        if file.schema_version != VIEWS_SCHEMA_VERSION {
            bail!(
                "schema_version '{}' not supported (expected {VIEWS_SCHEMA_VERSION})",
                file.schema_version
            );
        }
        let by_key = build_index(&file.views)?;
        Ok(Self {
            schema_version: file.schema_version,
            by_key,
        })
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Resolve a view by key.
    ///
    /// Returns `None` instead of erroring; callers surface errors with the CLI
    /// context that referenced the missing key.
    pub fn view(&self, key: &str) -> Option<&ViewSpec> {
        self.by_key.get(&ViewKey(key.to_string()))
    }

    /// Iterates views in stable key order.
    pub fn views(&self) -> impl Iterator<Item = &ViewSpec> {
        self.by_key.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ViewKey> {
        self.by_key.keys()
    }
}

fn build_index(views: &[ViewSpec]) -> Result<BTreeMap<ViewKey, ViewSpec>> {
    if views.is_empty() {
        bail!("views file defines no views");
    }

    let mut map = BTreeMap::new();
    for view in views {
        validate_view(view)?;
        if map.contains_key(&view.key) {
            bail!("duplicate view key {}", view.key);
        }
        map.insert(view.key.clone(), view.clone());
    }
    Ok(map)
}

fn validate_view(view: &ViewSpec) -> Result<()> {
    let key = &view.key;
    if !is_identifier(key.as_str()) {
        bail!("view key must match ^[A-Za-z0-9_.-]+$, got '{key}'");
    }
    if view.endpoint.trim().is_empty() {
        bail!("view {key} has an empty endpoint");
    }
    if view.text_field.trim().is_empty() {
        bail!("view {key} has an empty text_field");
    }
    if let Some(template) = &view.delete_path {
        if !template.contains(ID_PLACEHOLDER) {
            bail!("view {key} delete_path '{template}' lacks the {ID_PLACEHOLDER} placeholder");
        }
    }

    let mut fields: BTreeSet<&str> = BTreeSet::new();
    for dim in &view.dimensions {
        if dim.field.trim().is_empty() {
            bail!("view {key} has a dimension with no field");
        }
        if dim.field == view.text_field {
            bail!("view {key} uses '{}' as both text field and dimension", dim.field);
        }
        if !fields.insert(dim.field.as_str()) {
            bail!("view {key} declares dimension '{}' twice", dim.field);
        }
        if let Domain::Fixed { values } = &dim.domain {
            if values.is_empty() {
                bail!("view {key} dimension '{}' has an empty fixed domain", dim.field);
            }
            if dim.numeric && !values.iter().all(Value::is_number) {
                bail!(
                    "view {key} dimension '{}' is numeric but lists non-numeric values",
                    dim.field
                );
            }
        }
    }

    let numeric = view.numeric_fields();
    for (field, value) in &view.defaults {
        if numeric.contains(&field.as_str()) && !value.is_number() {
            bail!("view {key} default for numeric field '{field}' must be a number");
        }
    }
    Ok(())
}

fn validate_against_schema(views_path: &Path) -> Result<()> {
    let views_file =
        File::open(views_path).with_context(|| format!("opening views {}", views_path.display()))?;
    let views_value: Value = serde_json::from_reader(BufReader::new(views_file))
        .with_context(|| format!("parsing views {}", views_path.display()))?;

    let declared = views_value
        .get("schema_version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let schema_path = resolve_views_schema_path(views_path);
    let allowed = BTreeSet::from([VIEWS_SCHEMA_VERSION.to_string()]);
    let schema = load_json_schema(&schema_path, &allowed)
        .with_context(|| format!("loading views schema {}", schema_path.display()))?;

    if declared != schema.schema_version {
        bail!(
            "views file {} declares schema_version '{declared}', expected '{}'",
            views_path.display(),
            schema.schema_version
        );
    }

    schema.validate(&views_value, &format!("views file {}", views_path.display()))
}

/// Prefer a schema shipped next to the views file, else the crate's copy.
fn resolve_views_schema_path(views_path: &Path) -> PathBuf {
    if let Some(dir) = views_path.parent() {
        let sibling = dir.join("views.schema.json");
        if sibling.exists() {
            return sibling;
        }
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(VIEWS_SCHEMA_FILE)
}
