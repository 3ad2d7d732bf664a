use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::field::ID_COLUMN;

/// Application-side value of a single field.
///
/// This is the closed set of value kinds the mapping layer understands. Each
/// kind deduces to exactly one [`FieldType`](crate::FieldType), except
/// [`Value::Null`] (no type) and [`Value::Record`] (only meaningful for a
/// declared reference field).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value, stored as NULL.
    Null,
    /// Whole number. Identifiers are always read back as `Integer`.
    Integer(i64),
    /// Floating point number.
    Number(f64),
    /// Text.
    Text(String),
    /// Boolean.
    Boolean(bool),
    /// Point in time, millisecond precision once stored.
    Date(DateTime<Utc>),
    /// Structured value stored as JSON.
    Object(serde_json::Map<String, serde_json::Value>),
    /// List stored as JSON.
    Array(Vec<serde_json::Value>),
    /// A record of another table, used for reference fields.
    Record(Record),
}

impl Value {
    /// Returns the identifier this value denotes, if any: an integral number
    /// or a record carrying an `id`.
    #[must_use]
    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::Integer(id) => Some(*id),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            Self::Record(record) => record.id(),
            _ => None,
        }
    }

    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the nested record, if this is a record value.
    #[must_use]
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Converts to plain JSON. Dates become epoch milliseconds and records
    /// become objects.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(v) => serde_json::Value::from(*v),
            Self::Number(v) => serde_json::Value::from(*v),
            Self::Text(v) => serde_json::Value::from(v.as_str()),
            Self::Boolean(v) => serde_json::Value::from(*v),
            Self::Date(v) => serde_json::Value::from(v.timestamp_millis()),
            Self::Object(v) => serde_json::Value::Object(v.clone()),
            Self::Array(v) => serde_json::Value::Array(v.clone()),
            Self::Record(record) => serde_json::Value::Object(
                record.iter().map(|(key, value)| (key.clone(), value.to_json())).collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => {
                n.as_i64().map_or_else(|| Self::Number(n.as_f64().unwrap_or(f64::NAN)), Self::Integer)
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => Self::Array(items),
            serde_json::Value::Object(map) => Self::Object(map),
        }
    }
}

/// A row of a table as seen by the application: logical field name to value.
///
/// The identifier lives under the `id` key. Fields keep the order they were
/// inserted in, which is the column order of tables created from the record.
/// Equality ignores order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Creates a record holding only an identifier.
    #[must_use]
    pub fn with_id(id: i64) -> Self {
        let mut record = Self::new();
        record.insert(ID_COLUMN, id);
        record
    }

    /// The record's identifier, if it has one.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self.0.get(ID_COLUMN)? {
            Value::Record(_) => None,
            value => value.as_id(),
        }
    }

    /// Sets a field, returning the previous value. A replaced field keeps its
    /// position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Returns a field's value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }

    /// Whether the record has a value under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields, including the identifier.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Record {
    type IntoIter = indexmap::map::IntoIter<String, Value>;
    type Item = (String, Value);

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Builds a [`Record`] from `name => value` pairs.
///
/// # Examples
///
/// ```ignore
/// let filter = record! { "one" => record! { "id" => 1 }, "field" => "%ess" };
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(record.insert($name, $value);)+
        record
    }};
}
