//! Remote collection sources.
//!
//! [`RemoteSource`] is the seam between a view and its backend: fetch the
//! whole collection, create one record, delete one record. [`HttpSource`]
//! speaks JSON over HTTP to the REST backend; tests substitute in-memory
//! sources. Response shapes are interpreted here so views only ever see a
//! tagged [`FetchOutcome`] or a [`CatalogError`].

use crate::catalog::record::json_kind;
use crate::catalog::{Attachment, Draft, Record, RecordId, ViewSpec};
use crate::error::{CatalogError, FieldError, Result};
use crate::session::SessionContext;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq)]
/// Interpreted body of a successful collection fetch.
pub enum FetchOutcome {
    /// The body was a sequence. Elements that are not records are skipped and
    /// counted.
    Records { records: Vec<Record>, skipped: usize },
    /// The body was valid JSON but not a sequence (e.g. `{"message": ...}`).
    NotASequence { message: String },
}

/// Backend operations a catalog view depends on.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the full collection.
    async fn fetch_all(&self) -> Result<FetchOutcome>;

    /// Create a record from an already-validated draft.
    ///
    /// Returns the created record when the backend echoes one back, `None` for
    /// a bare acknowledgement.
    async fn create(&self, draft: Draft) -> Result<Option<Record>>;

    /// Delete one record by id.
    async fn delete(&self, id: &RecordId) -> Result<()>;
}

#[async_trait]
impl<S: RemoteSource + ?Sized> RemoteSource for Arc<S> {
    async fn fetch_all(&self) -> Result<FetchOutcome> {
        (**self).fetch_all().await
    }

    async fn create(&self, draft: Draft) -> Result<Option<Record>> {
        (**self).create(draft).await
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        (**self).delete(id).await
    }
}

/// Interpret a success body from a collection endpoint.
///
/// Non-JSON bodies are transport errors; JSON that is not an array degrades to
/// [`FetchOutcome::NotASequence`] carrying the best message available.
pub fn interpret_collection(body: &[u8]) -> Result<FetchOutcome> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FetchOutcome::NotASequence {
            message: "empty response".to_string(),
        });
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| CatalogError::transport(format!("malformed response: {e}")))?;

    match value {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            let mut skipped = 0usize;
            for (idx, item) in items.into_iter().enumerate() {
                match Record::from_value(item) {
                    Ok(record) => records.push(record),
                    Err(reason) => {
                        warn!(index = idx, %reason, "skipping collection element");
                        skipped += 1;
                    }
                }
            }
            Ok(FetchOutcome::Records { records, skipped })
        }
        Value::String(message) => Ok(FetchOutcome::NotASequence { message }),
        other => {
            let message = other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("expected an array, got {}", json_kind(&other)));
            Ok(FetchOutcome::NotASequence { message })
        }
    }
}

/// Interpret a create acknowledgement; `None` unless it carries a record.
pub fn interpret_created(body: &[u8]) -> Option<Record> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match Record::from_value(value) {
        Ok(record) => Some(record),
        Err(reason) => {
            debug!(%reason, "create acknowledgement carries no record");
            None
        }
    }
}

/// First non-blank string among `keys` in a JSON object body.
pub fn body_message(body: &[u8], keys: &[&str]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}

/// Message for a non-success response: the body's `message`/`error` field,
/// else the plain-text body, else the status line.
pub fn rejection_message(status: StatusCode, body: &[u8]) -> String {
    if let Some(message) = body_message(body, &["message", "error"]) {
        return message;
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if !text.is_empty() && !text.starts_with('{') && !text.starts_with('<') {
        return text.to_string();
    }
    format!(
        "Error {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown status")
    )
}

/// Collection source backed by the REST API.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
    spec: ViewSpec,
    session: Option<SessionContext>,
    token: Option<String>,
}

impl HttpSource {
    /// Source for `spec` using a client with transport defaults.
    pub fn new(base_url: impl Into<String>, spec: &ViewSpec) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, spec)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, spec: &ViewSpec) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            spec: spec.clone(),
            session: None,
            token: None,
        }
    }

    /// Attach the active session's id as a bearer token on every request.
    pub fn with_session(mut self, session: SessionContext) -> Self {
        self.session = Some(session);
        self
    }

    /// Fixed bearer token used when no session is signed in.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .as_ref()
            .and_then(SessionContext::token)
            .or_else(|| self.token.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<(StatusCode, Vec<u8>)> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| CatalogError::transport(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::transport(format!("failed reading response from {url}: {e}")))?;
        debug!(view = %self.spec.key, %url, %status, bytes = body.len(), "response received");
        Ok((status, body.to_vec()))
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch_all(&self) -> Result<FetchOutcome> {
        let url = self.url(self.spec.list_path());
        let (status, body) = self.send(self.client.get(&url), &url).await?;
        if !status.is_success() {
            return Err(CatalogError::RemoteRejection {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }
        interpret_collection(&body)
    }

    async fn create(&self, draft: Draft) -> Result<Option<Record>> {
        let url = self.url(self.spec.create_path());
        let (fields, attachment) = draft.into_parts();
        let request = match attachment {
            Some(attachment) => self.client.post(&url).multipart(multipart_form(fields, attachment)?),
            None => self.client.post(&url).json(&fields),
        };
        let (status, body) = self.send(request, &url).await?;
        if !status.is_success() {
            return Err(CatalogError::RemoteRejection {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }
        Ok(interpret_created(&body))
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let url = self.url(&self.spec.delete_path(id)?);
        let (status, body) = self.send(self.client.delete(&url), &url).await?;
        if status.is_success() {
            return Ok(());
        }
        Err(CatalogError::RemoteRejection {
            status: status.as_u16(),
            message: rejection_message(status, &body),
        })
    }
}

fn multipart_form(fields: Map<String, Value>, attachment: Attachment) -> Result<Form> {
    let mut form = Form::new();
    for (name, value) in fields {
        let text = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        form = form.text(name, text);
    }
    let mut part = Part::bytes(attachment.bytes).file_name(attachment.file_name);
    if let Some(content_type) = &attachment.content_type {
        part = part.mime_str(content_type).map_err(|_| CatalogError::Validation {
            errors: vec![FieldError::new(
                attachment.part_name.clone(),
                format!("invalid content type '{content_type}'"),
            )],
        })?;
    }
    Ok(form.part(attachment.part_name, part))
}
