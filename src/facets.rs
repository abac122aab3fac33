//! Facet option lists derived from a collection.
//!
//! Options are the sentinel followed by each distinct value of a field, in
//! the order values first appear. [`FacetCache`] memoizes them per collection
//! revision so selectors can be redrawn without rescanning the records.

use crate::catalog::{Collection, Dimension, Record};
use crate::filter::ALL;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sentinel plus the distinct text values of `field`, first-seen order.
///
/// Records lacking the field contribute nothing. A literal "All" value is
/// absorbed by the sentinel rather than listed twice.
pub fn facet_options(records: &[Record], field: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut options = vec![ALL.to_string()];
    seen.insert(ALL.to_string());
    for record in records {
        if let Some(value) = record.field_text(field) {
            if !seen.contains(value.as_ref()) {
                seen.insert(value.to_string());
                options.push(value.into_owned());
            }
        }
    }
    options
}

/// Option lists for several fields at once, keyed by field name.
///
/// Always computed over the whole collection: narrowing the list with a filter
/// must not remove the choices that would undo it.
pub fn facet_table<S: AsRef<str>>(records: &[Record], fields: &[S]) -> BTreeMap<String, Vec<String>> {
    fields
        .iter()
        .map(|field| {
            let field = field.as_ref();
            (field.to_string(), facet_options(records, field))
        })
        .collect()
}

/// Options for a configured dimension: the fixed domain when it has one,
/// otherwise the values observed in `records`.
pub fn dimension_options(dimension: &Dimension, records: &[Record]) -> Vec<String> {
    match dimension.fixed_values() {
        Some(values) => std::iter::once(ALL.to_string()).chain(values).collect(),
        None => facet_options(records, &dimension.field),
    }
}

#[derive(Debug, Default)]
/// Facet options memoized against a collection revision.
pub struct FacetCache {
    revision: Option<u64>,
    by_field: HashMap<String, Vec<String>>,
}

impl FacetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&mut self, collection: &Collection, field: &str) -> Vec<String> {
        if self.revision != Some(collection.revision()) {
            self.by_field.clear();
            self.revision = Some(collection.revision());
        }
        self.by_field
            .entry(field.to_string())
            .or_insert_with(|| facet_options(collection.records(), field))
            .clone()
    }
}
