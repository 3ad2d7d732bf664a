use tessera_sql::{Connection, DataType, Row};

use crate::error::{Error, Result};

/// A generated statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<DataType>,
}

impl Query {
    /// Runs a statement that returns rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] carrying the SQL and parameters when the
    /// engine rejects the statement.
    pub async fn fetch(self, conn: &dyn Connection) -> Result<Vec<Row>> {
        let Self { sql, params } = self;
        conn.query(sql.clone(), params.clone()).await.map_err(|source| Error::Statement {
            sql,
            params,
            source,
        })
    }

    /// Runs a statement that returns at most one row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] when the engine rejects the statement.
    pub async fn fetch_optional(self, conn: &dyn Connection) -> Result<Option<Row>> {
        Ok(self.fetch(conn).await?.into_iter().next())
    }
}
