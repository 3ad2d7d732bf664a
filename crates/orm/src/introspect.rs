//! # Schema introspection
//!
//! Rebuilds a table's [`FieldSet`] from its live column metadata. This is the
//! inverse of [`physical_name`](crate::naming::physical_name).

use tessera_sql::{ColumnInfo, Connection, DataType};

use crate::error::{Error, Result};
use crate::field::{FieldSet, FieldSpec, FieldType, ID_COLUMN, StorageClass};
use crate::naming;

/// Reads the live field set of `table`.
///
/// Returns `Ok(None)` when the table does not exist.
///
/// # Errors
///
/// Returns [`Error::Statement`] if the engine cannot report the columns.
pub async fn introspect(conn: &dyn Connection, table: &str) -> Result<Option<FieldSet>> {
    let columns = conn.table_info(table.to_string()).await.map_err(|source| Error::Statement {
        sql: "pragma_table_info".to_string(),
        params: vec![DataType::Str(Some(table.to_string()))],
        source,
    })?;

    if columns.is_empty() {
        return Ok(None);
    }
    Ok(Some(fields_from_columns(table, &columns)))
}

/// Maps column metadata to logical fields, excluding the identifier.
///
/// Introspected fields are optional and references carry no target; callers
/// overlay declared specs to restore both.
#[must_use]
pub fn fields_from_columns(table: &str, columns: &[ColumnInfo]) -> FieldSet {
    let mut fields = FieldSet::new();

    for column in columns {
        if column.name == ID_COLUMN {
            continue;
        }

        let (name, tag) = naming::split(&column.name);
        let mut physical = None;
        let field_type = match tag {
            Some(field_type) => field_type,
            None => match StorageClass::from_declared(&column.declared_type) {
                Some(StorageClass::Real) => FieldType::Number,
                Some(StorageClass::Text) => FieldType::String,
                Some(StorageClass::Integer) => {
                    tracing::warn!(
                        table,
                        column = %column.name,
                        "untagged integer column read as a reference; rename it with a type tag"
                    );
                    physical = Some(column.name.clone());
                    FieldType::Reference
                }
                None => {
                    tracing::warn!(
                        table,
                        column = %column.name,
                        declared_type = %column.declared_type,
                        "skipping column with unsupported declared type"
                    );
                    continue;
                }
            },
        };

        fields.insert(FieldSpec {
            physical,
            ..FieldSpec::new(name, field_type).optional()
        });
    }

    fields
}
