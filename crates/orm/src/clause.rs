//! # Where-clause compiler
//!
//! Turns a filter record (logical field name to desired value) into local
//! predicates plus the reference fields the caller must resolve with a join.

use crate::error::{Error, Result};
use crate::field::{FieldSet, FieldSpec, FieldType, ID_COLUMN};
use crate::filter::Filter;
use crate::value::{Record, Value};

/// Marks a text filter value as a LIKE pattern.
pub const WILDCARD: char = '%';

/// Compiled form of one table's slice of a filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    /// Predicates on the table's own columns, unqualified.
    pub predicates: Vec<Filter>,
    /// Reference fields named by the filter.
    pub joins: Vec<ReferenceJoin>,
}

/// A reference field to resolve through a join.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceJoin {
    /// The reference field.
    pub field: FieldSpec,
    /// Filter on the referenced table. Empty when the join only embeds the
    /// referenced record.
    pub filter: Record,
}

impl WhereClause {
    /// Whether the clause neither filters nor joins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.joins.is_empty()
    }
}

/// Compiles `filter` against `fields`.
///
/// Keys with no matching field are ignored. `id` always targets the
/// identifier column. A `Null` value matches NULL columns, and a text value
/// containing `%` compiles to `LIKE`.
///
/// # Errors
///
/// Returns [`Error::InvalidValue`] when a value cannot be cast to its field's
/// type.
pub fn compile(fields: &FieldSet, filter: &Record) -> Result<WhereClause> {
    let mut clause = WhereClause::default();

    for (name, value) in filter.iter() {
        if name == ID_COLUMN {
            clause.predicates.push(identifier(value)?);
            continue;
        }

        let Some(field) = fields.get(name) else {
            tracing::debug!(field = %name, "ignoring filter on unknown field");
            continue;
        };

        if field.field_type == FieldType::Reference {
            clause.joins.push(ReferenceJoin {
                field: field.clone(),
                filter: reference_filter(field, value)?,
            });
            continue;
        }

        let column = field.column();
        let predicate = match value {
            Value::Null => Filter::is_null(column),
            Value::Text(text) if text.contains(WILDCARD) => Filter::like(column, text.clone()),
            value => Filter::eq(column, field.cast(value)?),
        };
        clause.predicates.push(predicate);
    }

    Ok(clause)
}

fn identifier(value: &Value) -> Result<Filter> {
    match value {
        Value::Null => Ok(Filter::is_null(ID_COLUMN)),
        value => value
            .as_id()
            .map(|id| Filter::eq(ID_COLUMN, id))
            .ok_or_else(|| Error::invalid(ID_COLUMN, "record identifier", value)),
    }
}

fn reference_filter(field: &FieldSpec, value: &Value) -> Result<Record> {
    match value {
        Value::Null => Ok(Record::new()),
        Value::Record(record) => Ok(record.clone()),
        value => value
            .as_id()
            .map(Record::with_id)
            .ok_or_else(|| Error::invalid(&field.name, "nested filter or identifier", value)),
    }
}

#[cfg(test)]
mod tests {
    use sea_query::Value as SqlValue;

    use super::*;
    use crate::record;

    fn fields() -> FieldSet {
        [
            FieldSpec::new("test", FieldType::Number),
            FieldSpec::new("field", FieldType::String),
            FieldSpec::new("success", FieldType::Boolean),
            FieldSpec::reference("one", "One"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn empty_filter_compiles_to_nothing() {
        let clause = compile(&fields(), &Record::new()).unwrap();
        assert!(clause.is_empty());
    }

    #[test]
    fn equality_uses_cast_values() {
        let clause = compile(&fields(), &record! { "success" => false, "test" => 2 }).unwrap();
        assert_eq!(
            clause.predicates,
            vec![
                Filter::eq("success::boolean", SqlValue::BigInt(Some(0))),
                Filter::eq("test", SqlValue::Double(Some(2.0))),
            ]
        );
    }

    #[test]
    fn wildcard_text_compiles_to_like() {
        let clause = compile(&fields(), &record! { "field" => "%ess" }).unwrap();
        assert_eq!(clause.predicates, vec![Filter::like("field", "%ess")]);

        let clause = compile(&fields(), &record! { "field" => "success" }).unwrap();
        assert_eq!(
            clause.predicates,
            vec![Filter::eq("field", SqlValue::String(Some(Box::new("success".to_string()))))]
        );
    }

    #[test]
    fn null_compiles_to_is_null() {
        let clause = compile(&fields(), &record! { "field" => Value::Null }).unwrap();
        assert_eq!(clause.predicates, vec![Filter::is_null("field")]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let clause = compile(&fields(), &record! { "nope" => 1 }).unwrap();
        assert!(clause.is_empty());
    }

    #[test]
    fn identifier_targets_id_column() {
        let clause = compile(&fields(), &record! { "id" => 3 }).unwrap();
        assert_eq!(clause.predicates, vec![Filter::eq("id", 3_i64)]);
        compile(&fields(), &record! { "id" => "three" }).unwrap_err();
    }

    #[test]
    fn reference_fields_become_joins() {
        let clause = compile(
            &fields(),
            &record! { "one" => record! { "id" => 1 }, "test" => 1 },
        )
        .unwrap();

        assert_eq!(clause.predicates.len(), 1);
        assert_eq!(clause.joins.len(), 1);
        assert_eq!(clause.joins[0].field.name, "one");
        assert_eq!(clause.joins[0].filter, Record::with_id(1));
    }

    #[test]
    fn reference_shorthand_and_projection_only() {
        let clause = compile(&fields(), &record! { "one" => 5 }).unwrap();
        assert_eq!(clause.joins[0].filter, Record::with_id(5));

        let clause = compile(&fields(), &record! { "one" => Record::new() }).unwrap();
        assert!(clause.joins[0].filter.is_empty());

        let clause = compile(&fields(), &record! { "one" => Value::Null }).unwrap();
        assert!(clause.joins[0].filter.is_empty());

        compile(&fields(), &record! { "one" => "x" }).unwrap_err();
    }
}
