//! A filterable, mutable view over one remote collection.
//!
//! [`CatalogView`] owns its collection, filter state, facet cache and form
//! draft behind a single lock that is never held across an await. Remote
//! operations are one-shot; their failures land in the view's [`Notice`] and
//! are also returned to the caller.
//!
//! Fetches are sequenced: each `load` takes a ticket when it is issued and a
//! response is applied only if its ticket is newer than the last applied one.
//! Successful mutations also take a ticket, so a fetch issued before a delete
//! cannot resurrect the deleted record.

use crate::catalog::{AddPolicy, Attachment, Collection, Domain, Draft, Record, RecordId, ViewSpec};
use crate::error::{CatalogError, FieldError, Result};
use crate::facets::{FacetCache, dimension_options};
use crate::filter::{FilterState, FilterUpdate, derived_list};
use crate::remote::{FetchOutcome, RemoteSource};
use crate::validation::validate_draft;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const LOAD_FAILED: &str = "Failed to load records.";
const ADD_FAILED: &str = "Failed to add record.";
const DELETE_FAILED: &str = "Failed to delete record.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Last user-facing message produced by the view.
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    /// Per-field problems when a draft failed validation.
    pub field_errors: Vec<FieldError>,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    fn from_error(err: &CatalogError, fallback: &str) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: err.user_message(fallback),
            field_errors: err.field_errors().to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
/// What a `load` call did to the collection.
pub enum LoadStatus {
    /// Collection replaced. `skipped` counts malformed or duplicate elements.
    Applied { records: usize, skipped: usize },
    /// Payload was not a sequence; the collection is now empty.
    Degraded { message: String },
    /// A newer response was already applied; this one was discarded.
    Stale,
    /// Request failed; the collection is unchanged.
    Failed(CatalogError),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AddOutcome {
    /// Backend echoed the created record and it was appended locally.
    Appended(Record),
    /// Collection was refetched after the create.
    Refetched(LoadStatus),
}

struct ViewState {
    collection: Collection,
    filter: FilterState,
    facets: FacetCache,
    notice: Option<Notice>,
    issued: u64,
    applied: u64,
    loads_in_flight: usize,
    form: Draft,
}

impl ViewState {
    fn ticket(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Mark local state as reflecting the newest server response.
    fn advance(&mut self) {
        self.applied = self.ticket();
    }
}

/// Filterable list of records backed by a [`RemoteSource`].
pub struct CatalogView<S> {
    spec: ViewSpec,
    source: S,
    state: Mutex<ViewState>,
}

impl<S: RemoteSource> CatalogView<S> {
    pub fn new(spec: ViewSpec, source: S) -> Self {
        let form = spec.empty_form();
        Self {
            spec,
            source,
            state: Mutex::new(ViewState {
                collection: Collection::new(),
                filter: FilterState::new(),
                facets: FacetCache::new(),
                notice: None,
                issued: 0,
                applied: 0,
                loads_in_flight: 0,
                form,
            }),
        }
    }

    pub fn spec(&self) -> &ViewSpec {
        &self.spec
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the full collection and replace the local one wholesale.
    pub async fn load(&self) -> LoadStatus {
        let ticket = {
            let mut state = self.state();
            state.loads_in_flight += 1;
            state.ticket()
        };
        debug!(view = %self.spec.key, ticket, "fetching collection");
        let result = self.source.fetch_all().await;

        let mut state = self.state();
        state.loads_in_flight = state.loads_in_flight.saturating_sub(1);
        if ticket <= state.applied {
            warn!(
                view = %self.spec.key,
                ticket,
                applied = state.applied,
                "discarding stale fetch response"
            );
            return LoadStatus::Stale;
        }

        match result {
            Ok(FetchOutcome::Records { records, skipped }) => {
                state.applied = ticket;
                let skipped = skipped + state.collection.replace(records);
                let count = state.collection.len();
                state.notice = if skipped > 0 {
                    warn!(view = %self.spec.key, skipped, "collection contained unusable records");
                    Some(Notice::warning(format!(
                        "{skipped} malformed record(s) were skipped."
                    )))
                } else {
                    None
                };
                debug!(view = %self.spec.key, records = count, "collection applied");
                LoadStatus::Applied {
                    records: count,
                    skipped,
                }
            }
            Ok(FetchOutcome::NotASequence { message }) => {
                state.applied = ticket;
                state.collection.replace(Vec::new());
                warn!(view = %self.spec.key, %message, "collection payload was not a list");
                state.notice = Some(Notice::warning(message.clone()));
                LoadStatus::Degraded { message }
            }
            Err(err) => {
                warn!(view = %self.spec.key, error = %err, "collection fetch failed");
                state.notice = Some(Notice::from_error(&err, LOAD_FAILED));
                LoadStatus::Failed(err)
            }
        }
    }

    /// Apply one filter change and return the new display list.
    pub fn set_filter(&self, update: FilterUpdate) -> Vec<Record> {
        let mut state = self.state();
        state.filter.apply(update);
        self.derive(&state)
    }

    pub fn filter(&self) -> FilterState {
        self.state().filter.clone()
    }

    /// Records passing the current filter, in collection order.
    pub fn derived_list(&self) -> Vec<Record> {
        let state = self.state();
        self.derive(&state)
    }

    fn derive(&self, state: &ViewState) -> Vec<Record> {
        derived_list(state.collection.records(), &self.spec.text_field, &state.filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Sentinel plus the distinct values of `field` in the current collection.
    pub fn facet_options(&self, field: &str) -> Vec<String> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.facets.options(&state.collection, field)
    }

    /// Selector options for `field`, honoring a fixed domain when the view
    /// declares one.
    pub fn dimension_options(&self, field: &str) -> Vec<String> {
        match self.spec.dimension(field) {
            Some(dimension) if matches!(dimension.domain, Domain::Fixed { .. }) => {
                dimension_options(dimension, &[])
            }
            _ => self.facet_options(field),
        }
    }

    /// Delete `id` remotely, then drop it locally.
    ///
    /// Returns whether a local record was removed. A 404 means the record is
    /// already gone and is treated as success.
    pub async fn delete_record(&self, id: &RecordId) -> Result<bool> {
        debug!(view = %self.spec.key, %id, "deleting record");
        let result = self.source.delete(id).await;

        let mut state = self.state();
        match result {
            Ok(()) => {}
            Err(CatalogError::RemoteRejection { status: 404, .. }) => {
                debug!(view = %self.spec.key, %id, "record already absent remotely");
            }
            Err(err) => {
                warn!(view = %self.spec.key, %id, error = %err, "delete failed");
                state.notice = Some(Notice::from_error(&err, DELETE_FAILED));
                return Err(err);
            }
        }
        let removed = state.collection.remove(id).is_some();
        state.advance();
        state.notice = Some(Notice::success("Record deleted."));
        Ok(removed)
    }

    /// Validate and create a record, then update the collection per the
    /// view's add policy.
    ///
    /// Validation failures never reach the network. The form draft is reset to
    /// the view's defaults on success and left untouched on failure.
    pub async fn add_record(&self, draft: Draft) -> Result<AddOutcome> {
        let fields = match validate_draft(&self.spec, &draft) {
            Ok(fields) => fields,
            Err(err) => {
                debug!(view = %self.spec.key, error = %err, "draft rejected locally");
                self.set_notice(Notice::from_error(&err, ADD_FAILED));
                return Err(err);
            }
        };
        let mut normalized = Draft::from_fields(fields);
        if let Some(attachment) = draft.attachment() {
            normalized = normalized.with_attachment(attachment.clone());
        }

        let created = match self.source.create(normalized).await {
            Ok(created) => created,
            Err(err) => {
                warn!(view = %self.spec.key, error = %err, "create failed");
                self.set_notice(Notice::from_error(&err, ADD_FAILED));
                return Err(err);
            }
        };

        let outcome = match (self.spec.add_policy, created) {
            (AddPolicy::Append, Some(record)) => {
                self.append(record.clone());
                AddOutcome::Appended(record)
            }
            (policy, _) => {
                if policy == AddPolicy::Append {
                    debug!(view = %self.spec.key, "create acknowledged without a record; refetching");
                }
                AddOutcome::Refetched(self.load().await)
            }
        };

        let mut state = self.state();
        state.form = self.spec.empty_form();
        let refetch_failed = matches!(
            outcome,
            AddOutcome::Refetched(LoadStatus::Failed(_) | LoadStatus::Degraded { .. })
        );
        if !refetch_failed {
            state.notice = Some(Notice::success("Record added."));
        }
        Ok(outcome)
    }

    fn append(&self, record: Record) {
        let mut state = self.state();
        state.collection.upsert(record);
        state.advance();
    }

    /// Submit the current form draft.
    pub async fn submit_form(&self) -> Result<AddOutcome> {
        let draft = self.form();
        self.add_record(draft).await
    }

    pub fn form(&self) -> Draft {
        self.state().form.clone()
    }

    pub fn set_form_field(&self, name: &str, value: impl Into<Value>) {
        self.state().form.set(name, value);
    }

    pub fn set_form_attachment(&self, attachment: Attachment) {
        let mut state = self.state();
        let form = std::mem::take(&mut state.form);
        state.form = form.with_attachment(attachment);
    }

    pub fn reset_form(&self) {
        self.state().form = self.spec.empty_form();
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state().notice.clone()
    }

    pub fn clear_notice(&self) {
        self.state().notice = None;
    }

    fn set_notice(&self, notice: Notice) {
        self.state().notice = Some(notice);
    }

    /// True while any `load` is outstanding.
    pub fn is_loading(&self) -> bool {
        self.state().loads_in_flight > 0
    }

    /// Snapshot of the unfiltered collection.
    pub fn records(&self) -> Vec<Record> {
        self.state().collection.records().to_vec()
    }

    pub fn len(&self) -> usize {
        self.state().collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().collection.is_empty()
    }
}
