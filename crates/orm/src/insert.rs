use anyhow::anyhow;
use sea_query::{Alias, SimpleExpr, SqliteQueryBuilder, Value};

use crate::codec::values_to_datatypes;
use crate::error::{Error, Result};
use crate::query::Query;

/// Builder for constructing `INSERT … RETURNING *` queries.
pub struct InsertBuilder {
    table: String,
    values: Vec<(String, Value)>,
}

impl InsertBuilder {
    /// Creates a new INSERT query builder.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Sets a column value for the insert.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Sets every column value in `values`.
    #[must_use]
    pub fn values(mut self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.values.extend(values);
        self
    }

    /// Build the INSERT query. With no values the row takes column defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if any query values cannot be converted to engine
    /// data types.
    pub fn build(self) -> Result<Query> {
        let mut statement = sea_query::Query::insert();
        statement.into_table(Alias::new(&self.table)).returning_all();

        if self.values.is_empty() {
            statement.or_default_values();
        } else {
            let columns: Vec<_> = self.values.iter().map(|(column, _)| Alias::new(column)).collect();
            let row: Vec<SimpleExpr> =
                self.values.into_iter().map(|(_, value)| SimpleExpr::Value(value)).collect();

            statement.columns(columns);
            statement.values(row).map_err(|err| Error::Statement {
                sql: format!("INSERT INTO {}", self.table),
                params: Vec::new(),
                source: anyhow!("{err:?}"),
            })?;
        }

        let (sql, values) = statement.build(SqliteQueryBuilder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = %self.table,
            sql = %sql,
            param_count = params.len(),
            "InsertBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }
}
