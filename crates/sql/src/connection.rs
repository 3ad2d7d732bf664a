use std::fmt::Debug;

use anyhow::Context;
use futures::FutureExt;

use crate::traits::FutureResult;
use crate::types::{ColumnInfo, DataType, Row};

/// SQL providers implement the [`Connection`] trait to allow the mapping
/// layer to execute statements against a backend (SQLite, libSQL, etc).
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a query and return the resulting rows.
    ///
    /// Used for `SELECT`, `PRAGMA` and any statement with a `RETURNING` clause.
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>>;

    /// Execute a statement that does not return rows (e.g. `CREATE TABLE` or
    /// `ALTER TABLE`).
    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u32>;

    /// Return the live column list of `table`. A table that does not exist
    /// has no columns.
    fn table_info(&self, table: String) -> FutureResult<Vec<ColumnInfo>> {
        let rows = self.query(
            "SELECT name, type, pk FROM pragma_table_info(?) ORDER BY cid".to_string(),
            vec![DataType::Str(Some(table.clone()))],
        );

        async move {
            let rows = rows.await.with_context(|| format!("failed to read table info for {table}"))?;
            rows.iter().map(ColumnInfo::try_from).collect()
        }
        .boxed()
    }
}
