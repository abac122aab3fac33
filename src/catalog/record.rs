//! Generic catalog records plus the typed entity shapes served by the backend.
//!
//! Views operate on [`Record`] so one filter/facet implementation covers every
//! screen. Typed structs (`Subject`, `Lecture`, ...) exist for callers that
//! want named fields; they convert through serde and keep camelCase wire names.

use crate::catalog::identity::{Department, RecordId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// One catalog entity: a stable id plus every other field the backend sent.
///
/// Fields not used for filtering (`tutorName`, `videoUrl`, ...) ride along in
/// `fields` untouched so they serialize back out exactly as received.
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Convert one element of a collection payload.
    ///
    /// Returns a short reason instead of a serde error so callers can log which
    /// element was skipped.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(mut map) = value else {
            return Err(format!("expected object, got {}", json_kind(&value)));
        };
        let raw_id = map
            .remove("id")
            .ok_or_else(|| "record is missing an id".to_string())?;
        let id = RecordId::from_value(&raw_id)
            .ok_or_else(|| format!("record id must be an integer or non-empty string, got {raw_id}"))?;
        Ok(Self { id, fields: map })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Scalar text form of a field, used for matching and facet values.
    ///
    /// `id` resolves to the record id. Arrays, objects and nulls have no text
    /// form and are treated as absent.
    pub fn field_text(&self, name: &str) -> Option<Cow<'_, str>> {
        if name == "id" {
            return Some(Cow::Owned(self.id.to_string()));
        }
        self.fields.get(name).and_then(scalar_text)
    }

    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(entity)?)
    }

    pub fn to_entity<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

/// Text form of a scalar JSON value.
pub fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// File part submitted alongside a draft as multipart form data.
pub struct Attachment {
    pub part_name: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
/// A record awaiting creation; the backend assigns the id.
pub struct Draft {
    fields: Map<String, Value>,
    attachment: Option<Attachment>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            attachment: None,
        }
    }

    /// Build a draft from a typed entity, dropping whatever id it carries.
    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self, serde_json::Error> {
        match serde_json::to_value(entity)? {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(Self::from_fields(map))
            }
            other => Err(serde::de::Error::custom(format!(
                "draft entity must serialize to an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Map<String, Value>, Option<Attachment>) {
        (self.fields, self.attachment)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: RecordId,
    pub title: String,
    pub tutor_name: String,
    pub semester: u8,
    pub department: Department,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: RecordId,
    pub title: String,
    pub instructor: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub video_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// External link resource attached to a lecture.
pub struct Resource {
    pub id: RecordId,
    pub title: String,
    pub resource_link: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Uploaded file resource; the bytes live behind the download endpoint.
pub struct ResourceFile {
    pub id: RecordId,
    pub file_name: String,
    pub file_type: String,
}
