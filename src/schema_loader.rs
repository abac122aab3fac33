//! Shared JSON Schema loader.
//!
//! Loads a schema file, checks its `schema_version` const against the allowed
//! set, and compiles a validator. Views files are validated through here
//! before any semantic checks run.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const SCHEMA_VERSION_POINTER: &str = "/properties/schema_version/const";

/// Result of loading and compiling a JSON Schema.
pub(crate) struct SchemaLoadResult {
    pub schema_version: String,
    pub compiled: JSONSchema,
}

impl SchemaLoadResult {
    /// Validate `instance`, joining every violation into one error.
    pub fn validate(&self, instance: &Value, label: &str) -> Result<()> {
        if let Err(errors) = self.compiled.validate(instance) {
            let details = errors
                .map(|err| format!("{}: {err}", err.instance_path))
                .collect::<Vec<_>>()
                .join("\n");
            bail!("{label} failed schema validation:\n{details}");
        }
        Ok(())
    }
}

pub(crate) fn load_json_schema(path: &Path, allowed_versions: &BTreeSet<String>) -> Result<SchemaLoadResult> {
    let file = File::open(path).with_context(|| format!("opening schema {}", path.display()))?;
    let schema_value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing schema {}", path.display()))?;

    let schema_version = extract_schema_version(&schema_value)
        .ok_or_else(|| anyhow!("schema {} missing schema_version const", path.display()))?;
    if !allowed_versions.contains(&schema_version) {
        bail!(
            "schema_version '{}' not in allowed set {:?}",
            schema_version,
            allowed_versions
        );
    }

    // The compile error borrows the schema value, so render it before it drops.
    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|err| anyhow!("compiling schema {}: {err}", path.display()))?;

    Ok(SchemaLoadResult {
        schema_version,
        compiled,
    })
}

pub(crate) fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn extract_schema_version(schema: &Value) -> Option<String> {
    let version = schema.pointer(SCHEMA_VERSION_POINTER).and_then(Value::as_str)?;
    is_identifier(version).then(|| version.to_string())
}
