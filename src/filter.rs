//! Filter state and the derived display list.
//!
//! A display list is a pure function of a collection and a [`FilterState`]:
//! the order-preserving subsequence of records that pass every active
//! predicate. Nothing here touches the network or mutates its inputs.

use crate::catalog::Record;
use std::collections::BTreeMap;

/// Sentinel option meaning "no filter on this dimension".
pub const ALL: &str = "All";

static ALL_SELECTION: Selection = Selection::All;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Current choice for one categorical dimension.
pub enum Selection {
    #[default]
    All,
    Value(String),
}

impl Selection {
    /// Interpret a selector value.
    ///
    /// Both the sentinel and an empty string mean "All"; the subject form uses
    /// an empty placeholder option for its unselected state.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw == ALL {
            Selection::All
        } else {
            Selection::Value(raw.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    /// Exact match against a field's text form; a missing field never matches
    /// a concrete value.
    pub fn matches(&self, candidate: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Value(expected) => candidate == Some(expected.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Selection::All => ALL,
            Selection::Value(value) => value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// One change to a filter state.
pub enum FilterUpdate {
    Query(String),
    Category { field: String, selection: Selection },
}

impl FilterUpdate {
    pub fn query(text: impl Into<String>) -> Self {
        FilterUpdate::Query(text.into())
    }

    pub fn category(field: impl Into<String>, value: &str) -> Self {
        FilterUpdate::Category {
            field: field.into(),
            selection: Selection::parse(value),
        }
    }

    /// Parse a `field=value` pair as typed on a command line.
    pub fn parse_pair(pair: &str) -> Option<Self> {
        let (field, value) = pair.split_once('=')?;
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(FilterUpdate::category(field, value.trim()))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
/// Free-text query plus categorical selections, keyed by field name.
pub struct FilterState {
    query: String,
    categories: BTreeMap<String, Selection>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, update: FilterUpdate) -> Self {
        self.apply(update);
        self
    }

    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Query(text) => self.query = text,
            FilterUpdate::Category { field, selection } => {
                if selection.is_all() {
                    self.categories.remove(&field);
                } else {
                    self.categories.insert(field, selection);
                }
            }
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selection(&self, field: &str) -> &Selection {
        self.categories.get(field).unwrap_or(&ALL_SELECTION)
    }

    /// True when every record passes (empty query, every dimension at "All").
    pub fn is_identity(&self) -> bool {
        self.query.is_empty() && self.categories.is_empty()
    }

    pub fn matches(&self, record: &Record, text_field: &str) -> bool {
        if !self.query.is_empty() {
            let Some(text) = record.field_text(text_field) else {
                return false;
            };
            if !text.to_lowercase().contains(&self.query.to_lowercase()) {
                return false;
            }
        }
        self.categories
            .iter()
            .all(|(field, selection)| selection.matches(record.field_text(field).as_deref()))
    }
}

/// Records passing every active predicate, in collection order.
pub fn derived_list<'a>(
    records: &'a [Record],
    text_field: &str,
    filter: &FilterState,
) -> Vec<&'a Record> {
    if filter.is_identity() {
        return records.iter().collect();
    }
    records
        .iter()
        .filter(|record| filter.matches(record, text_field))
        .collect()
}
