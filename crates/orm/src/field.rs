//! # Field metadata and type codec
//!
//! The single source of truth for how each logical type is stored: its
//! physical storage class, how an application [`Value`] is cast into a
//! storable `sea_query::Value`, and how a stored [`DataType`] is parsed back.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use sea_query::Value as SqlValue;
use tessera_sql::DataType;

use crate::error::{Error, Result};
use crate::value::{Record, Value};

/// Name of the implicit identifier column every managed table carries.
pub const ID_COLUMN: &str = "id";

/// Logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Stored as `REAL`.
    Number,
    /// Stored as `TEXT`.
    String,
    /// Stored as `INTEGER` 0/1.
    Boolean,
    /// Stored as `INTEGER` epoch milliseconds.
    Date,
    /// Stored as JSON `TEXT`.
    Object,
    /// Stored as JSON `TEXT`.
    Array,
    /// Stored as the `INTEGER` identifier of a row in another table.
    Reference,
}

impl FieldType {
    /// Every logical type, in lookup order.
    pub const ALL: [Self; 7] = [
        Self::Number,
        Self::String,
        Self::Boolean,
        Self::Date,
        Self::Object,
        Self::Array,
        Self::Reference,
    ];

    /// The physical storage class used for this type.
    #[must_use]
    pub const fn storage_class(self) -> StorageClass {
        match self {
            Self::Number => StorageClass::Real,
            Self::String | Self::Object | Self::Array => StorageClass::Text,
            Self::Boolean | Self::Date | Self::Reference => StorageClass::Integer,
        }
    }

    /// Whether values of this type are stored under their bare name.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(self, Self::Number | Self::String)
    }

    /// Tag used in physical column names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Object => "object",
            Self::Array => "array",
            Self::Reference => "reference",
        }
    }

    /// Deduces the logical type of an application value.
    ///
    /// Returns `Ok(None)` for [`Value::Null`], which carries no type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for values no type applies to. A
    /// [`Value::Record`] only has a type when the field is declared as a
    /// reference.
    pub fn deduce(value: &Value) -> Result<Option<Self>> {
        let field_type = match value {
            Value::Null => return Ok(None),
            Value::Integer(_) | Value::Number(_) => Self::Number,
            Value::Text(_) => Self::String,
            Value::Boolean(_) => Self::Boolean,
            Value::Date(_) => Self::Date,
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::Record(_) => {
                return Err(Error::UnsupportedType {
                    value: format!("{value:?}"),
                });
            }
        };
        Ok(Some(field_type))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or_else(|| Error::UnsupportedType {
            value: s.to_string(),
        })
    }
}

/// Physical storage class of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// `INTEGER`
    Integer,
    /// `REAL`
    Real,
    /// `TEXT`
    Text,
}

impl StorageClass {
    /// Column type keyword used in DDL.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
        }
    }

    /// Maps a declared column type to a storage class using SQLite's affinity
    /// rules. Returns `None` for blob or numeric-affinity declarations, which
    /// no logical type uses.
    #[must_use]
    pub fn from_declared(declared: &str) -> Option<Self> {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            Some(Self::Integer)
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
            Some(Self::Text)
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
            Some(Self::Real)
        } else {
            None
        }
    }
}

/// Metadata for one logical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Logical field name.
    pub name: String,
    /// Logical type.
    pub field_type: FieldType,
    /// Required fields join with `INNER JOIN` and decode NULL as
    /// [`Value::Null`] rather than omitting the key.
    pub required: bool,
    /// Target table of a reference field. Declared references always name
    /// their target. References recovered from a live table do not.
    pub reference: Option<String>,
    /// Physical column name when it is not derived from the name and type,
    /// as for untagged legacy columns.
    pub physical: Option<String>,
}

impl FieldSpec {
    /// A required field of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            reference: None,
            physical: None,
        }
    }

    /// A required reference to a row of `table`.
    #[must_use]
    pub fn reference(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            reference: Some(table.into()),
            ..Self::new(name, FieldType::Reference)
        }
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Casts an application value into its storable form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the value cannot be stored under
    /// this field's type, such as a reference record without an identifier.
    pub fn cast(&self, value: &Value) -> Result<SqlValue> {
        cast(&self.name, self.field_type, value)
    }

    /// Parses a stored value back into an application value.
    ///
    /// `Ok(None)` means the value is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] when the stored value does not fit the
    /// field type.
    pub fn parse(&self, value: &DataType) -> Result<Option<Value>> {
        parse(&self.name, self.field_type, value)
    }
}

/// Casts `value` for storage in a column of logical type `field_type`.
///
/// The value's kind must match the field type. Numbers accept integers, and
/// references accept an identifier or a record carrying one.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] when the value does not fit the field
/// type, including a reference without an identifier.
#[allow(clippy::cast_precision_loss)]
pub fn cast(name: &str, field_type: FieldType, value: &Value) -> Result<SqlValue> {
    let cast = match (field_type, value) {
        (_, Value::Null) => null_of(field_type.storage_class()),
        (FieldType::Number, Value::Integer(i)) => SqlValue::Double(Some(*i as f64)),
        (FieldType::Number, Value::Number(n)) => SqlValue::Double(Some(*n)),
        (FieldType::String, Value::Text(s)) => SqlValue::String(Some(Box::new(s.clone()))),
        (FieldType::Boolean, Value::Boolean(b)) => SqlValue::BigInt(Some(i64::from(*b))),
        (FieldType::Date, Value::Date(d)) => SqlValue::BigInt(Some(d.timestamp_millis())),
        (FieldType::Object, value @ Value::Object(_)) | (FieldType::Array, value @ Value::Array(_)) => {
            SqlValue::String(Some(Box::new(value.to_json().to_string())))
        }
        (FieldType::Reference, value) => {
            let id = value.as_id().ok_or_else(|| Error::invalid(name, "record identifier", value))?;
            SqlValue::BigInt(Some(id))
        }
        (field_type, value) => return Err(Error::invalid(name, field_type.as_str(), value)),
    };
    Ok(cast)
}

/// Parses a stored value of logical type `field_type`.
///
/// Objects and arrays tolerate NULL by yielding an empty value. A reference
/// stored as a bare identifier yields a record holding only that `id`; an
/// embedded JSON projection must be resolved through the referenced table's
/// fields (see the record codec).
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] when the stored value does not fit.
#[allow(clippy::cast_precision_loss)]
pub fn parse(name: &str, field_type: FieldType, value: &DataType) -> Result<Option<Value>> {
    if value.is_null() {
        return Ok(match field_type {
            FieldType::Object => Some(Value::Object(serde_json::Map::new())),
            FieldType::Array => Some(Value::Array(Vec::new())),
            _ => None,
        });
    }

    let parsed = match field_type {
        FieldType::Number => match value {
            DataType::Int64(Some(i)) => Value::Number(*i as f64),
            DataType::Int32(Some(i)) => Value::Number(f64::from(*i)),
            DataType::Double(Some(f)) => Value::Number(*f),
            DataType::Float(Some(f)) => Value::Number(f64::from(*f)),
            other => passthrough(other),
        },
        FieldType::String => passthrough(value),
        FieldType::Boolean => match value {
            DataType::Boolean(Some(b)) => Value::Boolean(*b),
            DataType::Int64(Some(i)) => Value::Boolean(*i == 1),
            DataType::Int32(Some(i)) => Value::Boolean(*i == 1),
            other => return Err(Error::invalid(name, "boolean", other)),
        },
        FieldType::Date => {
            let millis = integer(value).ok_or_else(|| Error::invalid(name, "epoch milliseconds", value))?;
            let date = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| Error::invalid(name, "epoch milliseconds in range", value))?;
            Value::Date(date)
        }
        FieldType::Object | FieldType::Array => match value {
            DataType::Str(Some(text)) => {
                let json: serde_json::Value =
                    serde_json::from_str(text).map_err(|source| Error::Decode {
                        column: name.to_string(),
                        source,
                    })?;
                Value::from(json)
            }
            other => return Err(Error::invalid(name, "JSON text", other)),
        },
        FieldType::Reference => {
            let id = integer(value).ok_or_else(|| Error::invalid(name, "record identifier", value))?;
            Value::Record(Record::with_id(id))
        }
    };
    Ok(Some(parsed))
}

/// Reads an integral physical value.
pub(crate) fn integer(value: &DataType) -> Option<i64> {
    match value {
        DataType::Int64(Some(i)) => Some(*i),
        DataType::Int32(Some(i)) => Some(i64::from(*i)),
        DataType::Uint32(Some(u)) => Some(i64::from(*u)),
        DataType::Uint64(Some(u)) => i64::try_from(*u).ok(),
        #[allow(clippy::cast_possible_truncation)]
        DataType::Double(Some(f)) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

fn passthrough(value: &DataType) -> Value {
    match value {
        DataType::Boolean(Some(b)) => Value::Boolean(*b),
        DataType::Int32(Some(i)) => Value::Integer(i64::from(*i)),
        DataType::Int64(Some(i)) => Value::Integer(*i),
        DataType::Uint32(Some(u)) => Value::Integer(i64::from(*u)),
        #[allow(clippy::cast_possible_wrap)]
        DataType::Uint64(Some(u)) => Value::Integer(*u as i64),
        DataType::Float(Some(f)) => Value::Number(f64::from(*f)),
        DataType::Double(Some(f)) => Value::Number(*f),
        DataType::Str(Some(s)) => Value::Text(s.clone()),
        DataType::Binary(Some(b)) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        _ => Value::Null,
    }
}

const fn null_of(class: StorageClass) -> SqlValue {
    match class {
        StorageClass::Integer => SqlValue::BigInt(None),
        StorageClass::Real => SqlValue::Double(None),
        StorageClass::Text => SqlValue::String(None),
    }
}

/// An ordered set of fields, unique by name.
///
/// Order is significant: it is the order columns are created in and the
/// order values are encoded in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSet(Vec<FieldSpec>);

impl FieldSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Deduces a field set from a record's values, skipping the identifier
    /// and null values. Deduced fields are optional.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] if any value has no logical type.
    pub fn deduce(record: &Record) -> Result<Self> {
        let mut fields = Self::new();
        for (name, value) in record.iter() {
            if name == ID_COLUMN {
                continue;
            }
            if let Some(field_type) = FieldType::deduce(value)? {
                fields.insert(FieldSpec::new(name.clone(), field_type).optional());
            }
        }
        Ok(fields)
    }

    /// Adds a field, replacing any field of the same name in place.
    pub fn insert(&mut self, field: FieldSpec) {
        if let Some(existing) = self.0.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.0.push(field);
        }
    }

    /// Returns the named field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.0.iter().find(|f| f.name == name)
    }

    /// Whether the named field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields of `required` absent from this set, in `required` order.
    #[must_use]
    pub fn missing(&self, required: &Self) -> Self {
        required.iter().filter(|f| !self.contains(&f.name)).cloned().collect()
    }

    /// This set with `declared` specs replacing same-named fields, followed
    /// by declared fields this set lacks.
    #[must_use]
    pub fn overlay(&self, declared: &Self) -> Self {
        let mut merged = self.clone();
        for field in declared.iter() {
            let mut field = field.clone();
            if field.physical.is_none() {
                field.physical = self.get(&field.name).and_then(|live| live.physical.clone());
            }
            merged.insert(field);
        }
        merged
    }

    /// Iterates over fields in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldSpec> {
        self.0.iter()
    }

    /// Field names in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.name.clone()).collect()
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<FieldSpec> for FieldSet {
    fn from_iter<I: IntoIterator<Item = FieldSpec>>(iter: I) -> Self {
        let mut fields = Self::new();
        for field in iter {
            fields.insert(field);
        }
        fields
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type IntoIter = std::slice::Iter<'a, FieldSpec>;
    type Item = &'a FieldSpec;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
