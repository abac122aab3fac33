//! Client library for catalog views.
//!
//! The crate exposes the catalog data model, filter and facet derivation, draft
//! validation, and [`CatalogView`], which binds one view definition to a
//! remote collection. Public functions here form the contract the binaries
//! depend on: views file discovery and record stream parsing.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub mod catalog;
pub mod config;
pub mod error;
pub mod facets;
pub mod filter;
pub mod remote;
mod schema_loader;
pub mod session;
pub mod validation;
pub mod view;

pub use catalog::{
    AddPolicy, Attachment, Collection, Department, Dimension, Domain, Draft, Lecture, Record,
    RecordId, Resource, ResourceFile, Role, Subject, ViewKey, ViewRegistry, ViewSpec,
};
pub use config::ClientConfig;
pub use error::{CatalogError, FieldError};
pub use facets::{FacetCache, dimension_options, facet_options, facet_table};
pub use filter::{ALL, FilterState, FilterUpdate, Selection, derived_list};
pub use remote::{FetchOutcome, HttpSource, RemoteSource};
pub use session::{AuthClient, Session, SessionContext};
pub use validation::validate_draft;
pub use view::{AddOutcome, CatalogView, LoadStatus, Notice, NoticeKind};

const VIEWS_FILE: &str = "schema/views.json";

fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut dir = fs::canonicalize(start).ok()?;
    loop {
        let candidate = dir.join(VIEWS_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Locate the views definition file.
///
/// An explicit `hint` (usually `CATALOG_VIEWS`) must name an existing file.
/// Without one, search upwards from the working directory, then from the
/// current executable, and finally fall back to the copy shipped with the
/// crate sources.
pub fn find_views_config(hint: Option<&str>) -> Result<PathBuf> {
    if let Some(hint) = hint {
        let path = PathBuf::from(hint);
        if !path.is_file() {
            bail!("Views file not found: {}", path.display());
        }
        return Ok(path);
    }

    if let Ok(cwd) = env::current_dir() {
        if let Some(found) = search_upwards(&cwd) {
            return Ok(found);
        }
    }

    if let Ok(exe_path) = env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            if let Some(found) = search_upwards(exe_dir) {
                return Ok(found);
            }
        }
    }

    let shipped = Path::new(env!("CARGO_MANIFEST_DIR")).join(VIEWS_FILE);
    if shipped.is_file() {
        return Ok(shipped);
    }

    bail!("Unable to locate {VIEWS_FILE}. Set CATALOG_VIEWS to a views definition file.");
}

/// Split comma- or whitespace-delimited lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a record dump, accepting a JSON array, a single record, or NDJSON.
///
/// Empty input is an error. Unlike collection fetches, a malformed element
/// fails the whole parse with its position so dumps can be fixed by hand.
pub fn parse_record_stream(input: &str) -> Result<Vec<Record>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        bail!("No input provided");
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| {
                    Record::from_value(item)
                        .map_err(anyhow::Error::msg)
                        .with_context(|| format!("Unable to parse record at index {idx}"))
                })
                .collect(),
            Value::Object(_) => Record::from_value(value)
                .map(|record| vec![record])
                .map_err(anyhow::Error::msg)
                .context("Unable to parse record"),
            _ => bail!("Unsupported JSON input; expected object or array"),
        };
    }

    let mut records = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Unable to parse JSON on line {}", idx + 1))?;
        let record = Record::from_value(value)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Unable to parse record on line {}", idx + 1))?;
        records.push(record);
    }

    if records.is_empty() {
        bail!("No records found in input stream");
    }

    Ok(records)
}
