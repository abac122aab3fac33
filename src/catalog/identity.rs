use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key naming one configured view (e.g., `subjects`, `lectures`).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewKey(pub String);

impl ViewKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned record identifier.
///
/// The backend hands out numeric ids on some collections and string ids on
/// others. Both forms are preserved on the wire, but identity is decided on
/// the canonical text form so `1` and `"1"` name the same record; ids typed
/// on a command line can then be matched against numeric ids from JSON.
#[derive(Clone, Debug)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    /// Parse an id typed by a user: all-digit input becomes numeric.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => RecordId::Number(n),
            Err(_) => RecordId::Text(trimmed.to_string()),
        }
    }

    /// Read an id out of a JSON value, accepting integers and non-empty strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordId::Number),
            Value::String(s) if !s.trim().is_empty() => Some(RecordId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Number(n) => Value::from(*n),
            RecordId::Text(s) => Value::String(s.clone()),
        }
    }

    fn canonical(&self) -> Cow<'_, str> {
        match self {
            RecordId::Number(n) => Cow::Owned(n.to_string()),
            RecordId::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Number(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::Text(value)
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RecordId::Number(n) => serializer.serialize_i64(*n),
            RecordId::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_value(&value).ok_or_else(|| {
            serde::de::Error::custom(format!("id must be an integer or non-empty string, got {value}"))
        })
    }
}

/// Academic department attached to subjects.
///
/// Known variants keep serialization consistent; `Other` keeps departments the
/// backend introduces later without failing the whole collection.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Department {
    Mca,
    Mba,
    BTech,
    MTech,
    Cse,
    Ece,
    Other(String),
}

impl Department {
    pub fn as_str(&self) -> &str {
        match self {
            Department::Mca => "MCA",
            Department::Mba => "MBA",
            Department::BTech => "BTech",
            Department::MTech => "MTech",
            Department::Cse => "CSE",
            Department::Ece => "ECE",
            Department::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "MCA" => Department::Mca,
            "MBA" => Department::Mba,
            "BTech" => Department::BTech,
            "MTech" => Department::MTech,
            "CSE" => Department::Cse,
            "ECE" => Department::Ece,
            other => Department::Other(other.to_string()),
        }
    }
}

impl Serialize for Department {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Department {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

/// Account role returned by the login endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Faculty => "FACULTY",
            Role::Student => "STUDENT",
        }
    }

    /// Whether this role may add or delete catalog entries.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Admin | Role::Faculty)
    }
}

impl TryFrom<&str> for Role {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "ADMIN" => Ok(Role::Admin),
            "FACULTY" => Ok(Role::Faculty),
            "STUDENT" => Ok(Role::Student),
            other => anyhow::bail!("Unknown role: {other}"),
        }
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Role::try_from(value.as_str()).map_err(serde::de::Error::custom)
    }
}
