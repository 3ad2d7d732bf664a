//! # Table migration
//!
//! A [`Migrator`] reconciles the fields a caller requires with the columns a
//! table actually has. Missing fields are added with CREATE TABLE or ALTER
//! TABLE ADD COLUMN. Columns are never dropped or retyped.
//!
//! The live field set of an existing table is cached per migrator and cleared
//! after every DDL attempt, successful or not, so the next read
//! re-introspects. A missing table is never cached, since another handle may
//! create it at any time.

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use sea_query::{Alias, ColumnDef, SqliteQueryBuilder, Table};
use tessera_sql::Connection;

use crate::error::{Error, Result};
use crate::field::{FieldSet, ID_COLUMN};
use crate::introspect::introspect;
use crate::naming::column_def;

#[derive(Debug, Clone)]
struct TableState {
    exists: bool,
    fields: FieldSet,
}

/// Keeps one table's columns in step with the fields its callers require.
#[derive(Debug)]
pub struct Migrator {
    table: String,
    cache: Mutex<Option<TableState>>,
}

impl Migrator {
    /// Creates a migrator for `table`. Nothing is read until first use.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            cache: Mutex::new(None),
        }
    }

    /// Name of the managed table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Ensures the table exists with a column for every field in `required`
    /// and returns the live field set.
    ///
    /// A missing table is created even when `required` is empty, holding only
    /// the identifier. Issues no I/O when the cached set already covers
    /// `required`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MigrationConflict`] if fields are still missing after
    /// migrating, and [`Error::Statement`] if the table cannot be inspected.
    pub async fn ensure(&self, conn: &dyn Connection, required: &FieldSet) -> Result<FieldSet> {
        let state = self.state(conn).await?;
        let missing = state.fields.missing(required);
        if state.exists && missing.is_empty() {
            return Ok(state.fields);
        }

        let failure = self.migrate(conn, &state, &missing).await;
        self.invalidate();

        // confirm against the live table; another handle may have won a race
        let state = self.state(conn).await?;
        let missing = state.fields.missing(required);
        if state.exists && missing.is_empty() {
            if let Some(err) = failure {
                tracing::warn!(
                    table = %self.table,
                    error = %err,
                    "migration failed but the table already has the required columns"
                );
            }
            return Ok(state.fields);
        }

        let fields = if state.exists { missing.names() } else { required.names() };
        tracing::warn!(table = %self.table, ?fields, "columns still missing after migration");
        Err(Error::MigrationConflict {
            table: self.table.clone(),
            fields,
            source: failure.unwrap_or_else(|| anyhow!("columns still missing after migration")),
        })
    }

    /// The live field set, or `None` when the table does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Statement`] if the table cannot be inspected.
    pub async fn current(&self, conn: &dyn Connection) -> Result<Option<FieldSet>> {
        let state = self.state(conn).await?;
        Ok(state.exists.then_some(state.fields))
    }

    /// Discards the cached field set.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    async fn state(&self, conn: &dyn Connection) -> Result<TableState> {
        let cached = self.cache.lock().clone();
        if let Some(state) = cached {
            return Ok(state);
        }

        let Some(fields) = introspect(conn, &self.table).await? else {
            return Ok(TableState {
                exists: false,
                fields: FieldSet::new(),
            });
        };
        let state = TableState { exists: true, fields };
        *self.cache.lock() = Some(state.clone());
        Ok(state)
    }

    // Runs the DDL for `missing`, returning the first failure. Every ALTER is
    // attempted even when an earlier one fails.
    async fn migrate(
        &self, conn: &dyn Connection, state: &TableState, missing: &FieldSet,
    ) -> Option<anyhow::Error> {
        if !state.exists {
            let sql = self.create_sql(missing);
            tracing::info!(table = %self.table, sql = %sql, "creating table");
            return run(conn, sql).await.err();
        }

        let mut failure = None;
        for field in missing {
            let sql = Table::alter()
                .table(Alias::new(&self.table))
                .add_column(column_def(field))
                .to_owned()
                .build(SqliteQueryBuilder);
            tracing::info!(table = %self.table, column = %field.column(), sql = %sql, "adding column");

            if let Err(err) = run(conn, sql).await {
                tracing::warn!(table = %self.table, column = %field.column(), error = %err, "failed to add column");
                failure.get_or_insert(err);
            }
        }
        failure
    }

    fn create_sql(&self, fields: &FieldSet) -> String {
        let mut statement = Table::create();
        statement.table(Alias::new(&self.table)).col(
            ColumnDef::new(Alias::new(ID_COLUMN)).integer().not_null().primary_key().auto_increment(),
        );
        for field in fields {
            statement.col(column_def(field));
        }
        statement.build(SqliteQueryBuilder)
    }
}

async fn run(conn: &dyn Connection, sql: String) -> anyhow::Result<()> {
    conn.exec(sql.clone(), Vec::new()).await.with_context(|| format!("failed to execute: {sql}"))?;
    Ok(())
}
