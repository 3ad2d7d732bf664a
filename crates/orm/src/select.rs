use sea_query::{Alias, ColumnRef, IntoIden, Order, SimpleExpr, SqliteQueryBuilder};

use crate::codec::values_to_datatypes;
use crate::error::Result;
use crate::filter::Filter;
use crate::join::{Join, JoinSpec};
use crate::query::Query;

/// Builder for constructing SELECT queries.
///
/// Projects every column of the primary table, plus any extra expressions.
pub struct SelectBuilder {
    table: String,
    alias: Option<String>,
    exprs: Vec<(SimpleExpr, String)>,
    filters: Vec<Filter>,
    order: Vec<(Option<String>, String, Order)>,
    limit: Option<u64>,
    joins: Vec<Join>,
}

impl SelectBuilder {
    /// Creates a new SELECT query builder.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            exprs: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            joins: Vec::new(),
        }
    }

    /// Selects from the primary table under an alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Adds a projected expression named `alias`.
    #[must_use]
    pub fn expr_as(mut self, expr: SimpleExpr, alias: impl Into<String>) -> Self {
        self.exprs.push((expr, alias.into()));
        self
    }

    /// Adds a WHERE clause filter.
    #[must_use]
    pub fn r#where(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Adds ascending ORDER BY clause.
    #[must_use]
    pub fn order_by(mut self, table: Option<&str>, column: impl Into<String>) -> Self {
        self.order.push((table.map(ToString::to_string), column.into(), Order::Asc));
        self
    }

    /// Adds a JOIN clause to the query.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Build the SELECT query.
    ///
    /// # Errors
    ///
    /// Returns an error if query values cannot be converted to engine data
    /// types.
    pub fn build(self) -> Result<Query> {
        let source = self.alias.clone().unwrap_or_else(|| self.table.clone());
        let mut statement = sea_query::Query::select();

        statement.column(ColumnRef::TableAsterisk(Alias::new(&source).into_iden()));
        for (expr, alias) in self.exprs {
            statement.expr_as(expr, Alias::new(alias));
        }

        match &self.alias {
            Some(alias) => statement.from_as(Alias::new(&self.table), Alias::new(alias)),
            None => statement.from(Alias::new(&self.table)),
        };

        for JoinSpec {
            table,
            alias,
            on,
            kind,
        } in self.joins.into_iter().map(|join| join.into_join_spec(&source))
        {
            statement.join_as(kind, Alias::new(table), Alias::new(alias), on);
        }

        for filter in self.filters {
            statement.and_where(filter.into_expr(&source));
        }

        for (table, column, order) in self.order {
            statement.order_by(table_column(table.as_deref().unwrap_or(&source), &column), order);
        }

        if let Some(limit) = self.limit {
            statement.limit(limit);
        }

        let (sql, values) = statement.build(SqliteQueryBuilder);
        let params = values_to_datatypes(values)?;

        tracing::debug!(
            table = %self.table,
            sql = %sql,
            param_count = params.len(),
            "SelectBuilder generated SQL"
        );

        Ok(Query { sql, params })
    }
}

pub fn table_column(table: &str, column: &str) -> ColumnRef {
    ColumnRef::TableColumn(Alias::new(table).into_iden(), Alias::new(column).into_iden())
}
