//! Errors

use tessera_sql::DataType;
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the mapping layer.
#[derive(Error, Debug)]
pub enum Error {
    /// A value (or field type) cannot be mapped to a physical column type.
    #[error("unsupported type for value {value}")]
    UnsupportedType {
        /// Debug rendering of the value.
        value: String,
    },

    /// A value does not fit the type of the field it is read from or written to.
    #[error("invalid value for field '{field}': expected {expected}, found {found}")]
    InvalidValue {
        /// Logical field name.
        field: String,
        /// What the field accepts.
        expected: &'static str,
        /// Debug rendering of the rejected value.
        found: String,
    },

    /// DDL failed and the table still lacks required fields afterwards.
    #[error("migration of table '{table}' left fields missing: {}", fields.join(", "))]
    MigrationConflict {
        /// Table being migrated.
        table: String,
        /// Fields still missing after the attempt.
        fields: Vec<String>,
        /// The first DDL failure, or why the confirmation failed.
        #[source]
        source: anyhow::Error,
    },

    /// A reference field points at a table that cannot be resolved.
    #[error("reference '{table}.{field}' targets unresolved table {}", target.as_deref().unwrap_or("<unknown>"))]
    ReferenceResolution {
        /// Table owning the reference field.
        table: String,
        /// Reference field name.
        field: String,
        /// Target table, when the field names one.
        target: Option<String>,
    },

    /// A nested reference filter was given to a single-table query.
    #[error("nested filter on '{table}.{field}' requires a relational query")]
    NestedFilter {
        /// Queried table.
        table: String,
        /// Reference field carrying the nested filter.
        field: String,
    },

    /// Reference joins nest deeper than allowed, most likely a cycle.
    #[error("reference joins from '{table}' exceed the maximum depth of {depth}")]
    JoinDepthExceeded {
        /// Table at which the limit was reached.
        table: String,
        /// The maximum depth.
        depth: usize,
    },

    /// The storage engine rejected a statement.
    #[error("statement failed: {sql} (params: {params:?})")]
    Statement {
        /// The rejected statement.
        sql: String,
        /// Its parameters.
        params: Vec<DataType>,
        /// Engine error.
        #[source]
        source: anyhow::Error,
    },

    /// An embedded JSON projection could not be read.
    #[error("cannot decode column '{column}'")]
    Decode {
        /// Column or field holding the JSON.
        column: String,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A statement with a `RETURNING` clause produced no row.
    #[error("no row returned from table '{table}'")]
    MissingRow {
        /// Table written to.
        table: String,
    },
}

impl Error {
    pub(crate) fn invalid(field: &str, expected: &'static str, found: impl std::fmt::Debug) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            expected,
            found: format!("{found:?}"),
        }
    }
}
