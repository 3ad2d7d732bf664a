use sea_query::{JoinType, SimpleExpr};

use crate::filter::Filter;

/// A join against an aliased table.
#[derive(Debug, Clone)]
pub struct Join {
    table: String,
    alias: String,
    on: Filter,
    kind: JoinKind,
}

/// Join types used by the relational query compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Drops rows without a match.
    Inner,
    /// Keeps rows without a match, with NULL columns.
    Left,
}

impl Join {
    /// Creates an INNER JOIN of `table` under `alias`.
    #[must_use]
    pub fn inner(table: impl Into<String>, alias: impl Into<String>, on: Filter) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            on,
            kind: JoinKind::Inner,
        }
    }

    /// Creates a LEFT JOIN of `table` under `alias`.
    #[must_use]
    pub fn left(table: impl Into<String>, alias: impl Into<String>, on: Filter) -> Self {
        Self {
            kind: JoinKind::Left,
            ..Self::inner(table, alias, on)
        }
    }

    /// The join type.
    #[must_use]
    pub const fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Converts this Join into a ``JoinSpec`` for ``SeaQuery``.
    pub(crate) fn into_join_spec(self, default_table: &str) -> JoinSpec {
        JoinSpec {
            table: self.table,
            alias: self.alias,
            on: self.on.into_expr(default_table),
            kind: self.kind.into_join_type(),
        }
    }
}

impl JoinKind {
    const fn into_join_type(self) -> JoinType {
        match self {
            Self::Inner => JoinType::InnerJoin,
            Self::Left => JoinType::LeftJoin,
        }
    }
}

/// Internal representation used by ``SeaQuery``.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub table: String,
    pub alias: String,
    pub on: SimpleExpr,
    pub kind: JoinType,
}
