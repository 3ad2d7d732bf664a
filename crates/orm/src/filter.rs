use sea_query::{Expr, ExprTrait, SimpleExpr, Value};

use crate::select::table_column;

/// A compiled predicate over physical columns.
///
/// For variants with an optional table: `None` qualifies the column with the
/// table (or alias) the predicate is rendered against, `Some(alias)` names it
/// explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// [table.]column = value
    Eq(Option<String>, String, Value),
    /// [table.]column LIKE pattern
    Like(Option<String>, String, String),
    /// [table.]column IS NULL
    IsNull(Option<String>, String),
    /// Column-to-column comparison: table1.col1 = table2.col2
    ColEq(String, String, String, String),
    /// Logical AND of multiple filters
    And(Vec<Self>),
}

impl Filter {
    fn resolve_column(tbl: Option<&str>, col: &str, default_table: &str) -> SimpleExpr {
        Expr::col(table_column(tbl.unwrap_or(default_table), col)).into()
    }

    /// Convert to a ``SeaQuery`` expression, qualifying unqualified columns
    /// with `default_table`.
    #[must_use]
    pub fn into_expr(self, default_table: &str) -> SimpleExpr {
        match self {
            Self::Eq(tbl, col, val) => {
                Self::resolve_column(tbl.as_deref(), &col, default_table).eq(val)
            }
            Self::Like(tbl, col, pattern) => {
                Self::resolve_column(tbl.as_deref(), &col, default_table).like(pattern)
            }
            Self::IsNull(tbl, col) => {
                Self::resolve_column(tbl.as_deref(), &col, default_table).is_null()
            }
            Self::ColEq(tbl1, col1, tbl2, col2) => {
                Expr::col(table_column(&tbl1, &col1)).eq(Expr::col(table_column(&tbl2, &col2)))
            }
            Self::And(filters) => {
                let mut exprs = filters.into_iter().map(|f| f.into_expr(default_table));
                exprs.next().map_or_else(
                    || Expr::value(true), // no filters, so all conditions satisfied, hence `true`
                    |first| exprs.fold(first, SimpleExpr::and),
                )
            }
        }
    }

    /// Creates an equality filter (column = value).
    #[must_use]
    pub fn eq(col: impl Into<String>, val: impl Into<Value>) -> Self {
        Self::Eq(None, col.into(), val.into())
    }

    /// Creates a LIKE filter with pattern matching.
    #[must_use]
    pub fn like(col: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like(None, col.into(), pattern.into())
    }

    /// Creates an IS NULL filter.
    #[must_use]
    pub fn is_null(col: impl Into<String>) -> Self {
        Self::IsNull(None, col.into())
    }

    /// Compare two columns for equality.
    #[must_use]
    pub fn col_eq(
        table1: impl Into<String>, col1: impl Into<String>, table2: impl Into<String>,
        col2: impl Into<String>,
    ) -> Self {
        Self::ColEq(table1.into(), col1.into(), table2.into(), col2.into())
    }

    /// Qualifies an unqualified column filter with `table`.
    #[must_use]
    pub fn on(self, table: impl Into<String>) -> Self {
        let table = table.into();
        match self {
            Self::Eq(None, col, val) => Self::Eq(Some(table), col, val),
            Self::Like(None, col, pattern) => Self::Like(Some(table), col, pattern),
            Self::IsNull(None, col) => Self::IsNull(Some(table), col),
            Self::And(filters) => Self::And(filters.into_iter().map(|f| f.on(table.clone())).collect()),
            other => other,
        }
    }
}
