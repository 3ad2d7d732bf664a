use sea_query::{Alias, SqliteQueryBuilder, Value};

use crate::codec::values_to_datatypes;
use crate::error::Result;
use crate::filter::Filter;
use crate::query::Query;

/// Builder for constructing `UPDATE … RETURNING *` queries.
pub struct UpdateBuilder {
    table: String,
    set_clauses: Vec<(String, Value)>,
    filters: Vec<Filter>,
}

impl UpdateBuilder {
    /// Creates a new UPDATE query builder.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set_clauses: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Sets a column to a new value.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_clauses.push((column.into(), value.into()));
        self
    }

    /// Sets every column value in `values`.
    #[must_use]
    pub fn values(mut self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.set_clauses.extend(values);
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Build the UPDATE query.
    ///
    /// # Errors
    ///
    /// Returns an error if query values cannot be converted to engine data
    /// types.
    pub fn build(self) -> Result<Query> {
        let mut statement = sea_query::Query::update();
        statement.table(Alias::new(&self.table));

        for (column, value) in self.set_clauses {
            statement.value(Alias::new(column), value);
        }

        for filter in self.filters {
            statement.and_where(filter.into_expr(&self.table));
        }

        statement.returning_all();

        let (sql, values) = statement.build(SqliteQueryBuilder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = %self.table,
            sql = %sql,
            param_count = params.len(),
            "UpdateBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }
}
