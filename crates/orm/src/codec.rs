//! # Record codec
//!
//! Converts application [`Record`]s into physical column values for writes,
//! and result [`Row`]s back into records, using a table's [`FieldSet`].

use sea_query::{Value as SqlValue, Values};
use tessera_sql::{DataType, Row};

use crate::error::{Error, Result};
use crate::field::{FieldSet, FieldSpec, ID_COLUMN, integer};
use crate::value::{Record, Value};

/// A reference field whose target record is embedded in a result row as a
/// JSON object.
///
/// Produced by the relational query compiler so rows can be decoded without
/// consulting the registry again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embedded {
    /// Logical name of the reference field. The JSON projection is aliased to
    /// this name.
    pub field: String,
    /// Fields of the referenced table.
    pub fields: FieldSet,
    /// Embedded references of the referenced table.
    pub nested: Vec<Self>,
}

/// Casts the values of `record` that `fields` knows about, in field order.
///
/// Keys without a field are ignored, as is the identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] if a value cannot be cast to its field's
/// type.
pub fn encode(fields: &FieldSet, record: &Record) -> Result<Vec<(String, SqlValue)>> {
    fields
        .iter()
        .filter_map(|field| record.get(&field.name).map(|value| (field, value)))
        .map(|(field, value)| Ok((field.column(), field.cast(value)?)))
        .collect()
}

/// Decodes a result row into a record.
///
/// Optional fields with a NULL or absent column are omitted. Required fields
/// are set to [`Value::Null`].
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] or [`Error::Decode`] when a column does not
/// fit its field.
pub fn decode(fields: &FieldSet, embedded: &[Embedded], mut row: Row) -> Result<Record> {
    let mut record = Record::new();
    if let Some(id) = row.take(ID_COLUMN).as_ref().and_then(integer) {
        record.insert(ID_COLUMN, id);
    }

    for field in fields {
        let physical = row.take(&field.column());
        let value = match embedded.iter().find(|e| e.field == field.name) {
            Some(embedded) => match row.take(&embedded.field) {
                Some(DataType::Str(Some(text))) => {
                    let json = serde_json::from_str(&text).map_err(|source| Error::Decode {
                        column: embedded.field.clone(),
                        source,
                    })?;
                    Some(Value::Record(decode_json(embedded, json)?))
                }
                _ => None,
            },
            None => match physical {
                Some(physical) => field.parse(&physical)?,
                None => None,
            },
        };
        assign(&mut record, field, value);
    }

    Ok(record)
}

// Embedded objects are keyed by physical column name, except nested
// embeddings which are keyed by field name.
fn decode_json(embedded: &Embedded, json: serde_json::Value) -> Result<Record> {
    let serde_json::Value::Object(mut object) = json else {
        return Err(Error::invalid(&embedded.field, "embedded JSON object", json));
    };

    let mut record = Record::new();
    if let Some(id) = object.remove(ID_COLUMN).as_ref().map(json_to_datatype).as_ref().and_then(integer)
    {
        record.insert(ID_COLUMN, id);
    }

    for field in &embedded.fields {
        let value = if let Some(nested) = embedded.nested.iter().find(|n| n.field == field.name) {
            match object.remove(&field.name) {
                None | Some(serde_json::Value::Null) => None,
                // the engine may hand nested objects back as text
                Some(serde_json::Value::String(text)) => {
                    let json = serde_json::from_str(&text).map_err(|source| Error::Decode {
                        column: field.name.clone(),
                        source,
                    })?;
                    Some(Value::Record(decode_json(nested, json)?))
                }
                Some(json) => Some(Value::Record(decode_json(nested, json)?)),
            }
        } else {
            match object.remove(&field.column()) {
                Some(json) => field.parse(&json_to_datatype(&json))?,
                None => None,
            }
        };
        assign(&mut record, field, value);
    }

    Ok(record)
}

fn assign(record: &mut Record, field: &FieldSpec, value: Option<Value>) {
    match value {
        Some(value) => {
            record.insert(field.name.clone(), value);
        }
        None if field.required => {
            record.insert(field.name.clone(), Value::Null);
        }
        None => {}
    }
}

/// Maps a scalar read out of an embedded JSON object to its physical form.
fn json_to_datatype(json: &serde_json::Value) -> DataType {
    match json {
        serde_json::Value::Null => DataType::Str(None),
        serde_json::Value::Bool(b) => DataType::Int64(Some(i64::from(*b))),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map_or_else(|| DataType::Double(n.as_f64()), |i| DataType::Int64(Some(i))),
        serde_json::Value::String(s) => DataType::Str(Some(s.clone())),
        other => DataType::Str(Some(other.to_string())),
    }
}

/// Converts statement parameters into the engine's physical values.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] for a parameter kind the engine
/// boundary has no representation for.
pub fn values_to_datatypes(values: Values) -> Result<Vec<DataType>> {
    values.into_iter().map(value_to_datatype).collect()
}

pub(crate) fn value_to_datatype(value: SqlValue) -> Result<DataType> {
    let data_type = match value {
        SqlValue::Bool(v) => DataType::Boolean(v),
        SqlValue::TinyInt(v) => DataType::Int32(v.map(i32::from)),
        SqlValue::SmallInt(v) => DataType::Int32(v.map(i32::from)),
        SqlValue::Int(v) => DataType::Int32(v),
        SqlValue::BigInt(v) => DataType::Int64(v),
        SqlValue::TinyUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        SqlValue::SmallUnsigned(v) => DataType::Uint32(v.map(u32::from)),
        SqlValue::Unsigned(v) => DataType::Uint32(v),
        SqlValue::BigUnsigned(v) => DataType::Uint64(v),
        SqlValue::Float(v) => DataType::Float(v),
        SqlValue::Double(v) => DataType::Double(v),
        SqlValue::String(v) => DataType::Str(v.map(|value| *value)),
        SqlValue::Char(v) => DataType::Str(v.map(|ch| ch.to_string())),
        SqlValue::Bytes(v) => DataType::Binary(v.map(|bytes| *bytes)),
        SqlValue::ChronoDateTimeUtc(v) => DataType::Int64(v.map(|dt| dt.timestamp_millis())),
        other => {
            return Err(Error::UnsupportedType {
                value: format!("{other:?}"),
            });
        }
    };
    Ok(data_type)
}
