//! # Table gateway
//!
//! CRUD over one managed table. Every operation first ensures the table has
//! the columns it needs, so tables and columns appear on first use.

use std::sync::Arc;

use tessera_sql::{Connection, DataType};
use tracing::instrument;

use crate::clause::{ReferenceJoin, compile};
use crate::codec::{decode, encode};
use crate::error::{Error, Result};
use crate::field::{FieldSet, FieldSpec, ID_COLUMN};
use crate::filter::Filter;
use crate::insert::InsertBuilder;
use crate::migrate::Migrator;
use crate::query::Query;
use crate::registry::Registry;
use crate::relation::compile_relational;
use crate::select::SelectBuilder;
use crate::update::UpdateBuilder;
use crate::value::{Record, Value};

/// Gateway to one table.
///
/// A table is either schema-declared ([`Table::with_fields`]), or schemaless
/// ([`Table::new`]), in which case each write deduces the fields it needs
/// from the record being written. Declared fields apply in both modes and
/// take precedence over what introspection reports.
#[derive(Debug)]
pub struct Table {
    name: String,
    conn: Arc<dyn Connection>,
    declared: FieldSet,
    migrator: Migrator,
}

impl Table {
    /// A schemaless table.
    pub fn new(conn: Arc<dyn Connection>, name: impl Into<String>) -> Self {
        Self::with_fields(conn, name, [])
    }

    /// A table with declared fields.
    pub fn with_fields(
        conn: Arc<dyn Connection>, name: impl Into<String>, fields: impl IntoIterator<Item = FieldSpec>,
    ) -> Self {
        let name = name.into();
        Self {
            migrator: Migrator::new(name.clone()),
            name,
            conn,
            declared: fields.into_iter().collect(),
        }
    }

    /// The table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared fields.
    #[must_use]
    pub const fn declared(&self) -> &FieldSet {
        &self.declared
    }

    /// Ensures the table exists with the declared fields and returns the
    /// effective field set.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be migrated.
    pub async fn schema(&self) -> Result<FieldSet> {
        self.ensure(&self.declared).await
    }

    /// Inserts a record and returns the stored row.
    ///
    /// Any `id` in the record is ignored; the engine assigns one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for an undeclared value with no
    /// logical type, or any migration or statement error.
    #[instrument(skip_all, fields(table = %self.name))]
    pub async fn insert(&self, record: &Record) -> Result<Record> {
        let fields = self.ensure(&self.required_for(record)?).await?;
        let values = encode(&fields, record)?;

        let row = InsertBuilder::new(&self.name)
            .values(values)
            .build()?
            .fetch_optional(&*self.conn)
            .await?
            .ok_or_else(|| Error::MissingRow {
                table: self.name.clone(),
            })?;

        decode(&fields, &[], row)
    }

    /// Returns the rows matching `filter`, ordered by identifier.
    ///
    /// A reference field may be filtered by identifier, either bare or as
    /// `{id: n}`. Other nested filters need [`Table::find_related`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NestedFilter`] for a nested reference filter, or any
    /// migration, cast, or statement error.
    #[instrument(skip_all, fields(table = %self.name))]
    pub async fn find(&self, filter: &Record) -> Result<Vec<Record>> {
        let Some(fields) = self.live().await? else {
            return Ok(Vec::new());
        };

        let clause = compile(&fields, filter)?;
        let mut select = SelectBuilder::new(&self.name).order_by(None, ID_COLUMN);
        for predicate in clause.predicates {
            select = select.r#where(predicate);
        }
        for join in clause.joins {
            if let Some(predicate) = self.local_reference(join)? {
                select = select.r#where(predicate);
            }
        }

        let rows = select.build()?.fetch(&*self.conn).await?;
        rows.into_iter().map(|row| decode(&fields, &[], row)).collect()
    }

    /// Returns the row with identifier `id`.
    ///
    /// A value that is not an identifier finds nothing and issues no query.
    ///
    /// # Errors
    ///
    /// Returns any migration or statement error.
    #[instrument(skip_all, fields(table = %self.name))]
    pub async fn find_by_id(&self, id: impl Into<Value> + Send) -> Result<Option<Record>> {
        let Some(id) = identifier(&id.into()) else {
            return Ok(None);
        };
        let Some(fields) = self.live().await? else {
            return Ok(None);
        };

        let row = SelectBuilder::new(&self.name)
            .r#where(Filter::eq(ID_COLUMN, id))
            .limit(1)
            .build()?
            .fetch_optional(&*self.conn)
            .await?;

        row.map(|row| decode(&fields, &[], row)).transpose()
    }

    /// Applies `changes` to the row with identifier `id` and returns the
    /// updated row, or `None` when no such row exists.
    ///
    /// # Errors
    ///
    /// Returns any migration, cast, or statement error.
    #[instrument(skip_all, fields(table = %self.name))]
    pub async fn update(
        &self, id: impl Into<Value> + Send, changes: &Record,
    ) -> Result<Option<Record>> {
        let Some(id) = identifier(&id.into()) else {
            return Ok(None);
        };

        let fields = self.ensure(&self.required_for(changes)?).await?;
        let values = encode(&fields, changes)?;
        if values.is_empty() {
            return self.find_by_id(id).await;
        }

        let row = UpdateBuilder::new(&self.name)
            .values(values)
            .r#where(Filter::eq(ID_COLUMN, id))
            .build()?
            .fetch_optional(&*self.conn)
            .await?;

        row.map(|row| decode(&fields, &[], row)).transpose()
    }

    /// Returns the rows matching a nested filter, embedding every referenced
    /// record the filter names.
    ///
    /// A reference field given an empty record or `Null` is joined and
    /// embedded without filtering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceResolution`] when a reference cannot be
    /// resolved through `registry`, or any migration, cast, or statement
    /// error.
    #[instrument(skip_all, fields(table = %self.name))]
    pub async fn find_related(&self, registry: &Registry, filter: &Record) -> Result<Vec<Record>> {
        let Some(fields) = self.live().await? else {
            return Ok(Vec::new());
        };

        let compiled = compile_relational(registry, &self.name, fields.clone(), filter.clone()).await?;
        let rows = compiled.query.fetch(&*self.conn).await?;
        rows.into_iter().map(|row| decode(&fields, &compiled.embedded, row)).collect()
    }

    /// Runs a caller-supplied statement and decodes every returned row with
    /// this table's fields.
    ///
    /// Columns the table does not know are dropped. An embedded projection is
    /// left undecoded, so `sql` should select this table's own columns.
    ///
    /// # Errors
    ///
    /// Returns any migration error, [`Error::Statement`] when the engine
    /// rejects the statement, or a decode error for a column that does not
    /// fit its field.
    #[instrument(skip_all, fields(table = %self.name))]
    pub async fn sql(&self, sql: impl Into<String> + Send, params: Vec<DataType>) -> Result<Vec<Record>> {
        let fields = self.schema().await?;
        let query = Query {
            sql: sql.into(),
            params,
        };
        let rows = query.fetch(&*self.conn).await?;
        rows.into_iter().map(|row| decode(&fields, &[], row)).collect()
    }

    /// Discards the cached field set so the next operation re-reads the live
    /// table.
    pub fn invalidate(&self) {
        self.migrator.invalidate();
    }

    // Live fields overlaid with declared ones, or `None` when the table does
    // not exist. Only a declared table is created here.
    async fn live(&self) -> Result<Option<FieldSet>> {
        if !self.declared.is_empty() {
            self.schema().await?;
        }
        let live = self.migrator.current(&*self.conn).await?;
        Ok(live.map(|fields| fields.overlay(&self.declared)))
    }

    async fn ensure(&self, required: &FieldSet) -> Result<FieldSet> {
        let live = self.migrator.ensure(&*self.conn, required).await?;
        Ok(live.overlay(&self.declared))
    }

    // Declared fields plus fields deduced from undeclared values.
    fn required_for(&self, record: &Record) -> Result<FieldSet> {
        let undeclared: Record = record
            .iter()
            .filter(|(name, _)| !self.declared.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(self.declared.overlay(&FieldSet::deduce(&undeclared)?))
    }

    // An identifier-only reference filter becomes a local equality.
    fn local_reference(&self, join: ReferenceJoin) -> Result<Option<Filter>> {
        let nested = || Error::NestedFilter {
            table: self.name.clone(),
            field: join.field.name.clone(),
        };

        if join.filter.is_empty() {
            return Ok(None);
        }
        if join.filter.len() > 1 {
            return Err(nested());
        }
        match join.filter.get(ID_COLUMN) {
            Some(Value::Null) => Ok(Some(Filter::is_null(join.field.column()))),
            Some(value) => {
                let id = value.as_id().ok_or_else(nested)?;
                Ok(Some(Filter::eq(join.field.column(), id)))
            }
            None => Err(nested()),
        }
    }
}

fn identifier(value: &Value) -> Option<i64> {
    match value {
        Value::Text(text) => text.trim().parse().ok(),
        value => value.as_id(),
    }
}
