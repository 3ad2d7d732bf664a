//! Self-migrating table mapping for embedded SQL databases.
//!
//! Stores records with dates, booleans, JSON objects, arrays and references
//! to other tables in an engine that only understands integers, reals and
//! text. Tables and columns are created on first use, and nested filters
//! compile to a single SELECT with the referenced records embedded as JSON.
//!
//! # Quick Start
//!
//! ## Declare tables
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use tessera_orm::{FieldSpec, FieldType, Registry, Table};
//! use tessera_sql::{Backend, Sqlite};
//!
//! let conn = Arc::new(Sqlite::connect().await?);
//!
//! let mut registry = Registry::new();
//! let one = registry.register(Table::with_fields(conn.clone(), "One", [
//!     FieldSpec::new("test", FieldType::Number),
//! ]));
//! let two = registry.register(Table::with_fields(conn.clone(), "Two", [
//!     FieldSpec::new("another", FieldType::String),
//!     FieldSpec::reference("one", "One"),
//! ]));
//! ```
//!
//! ## CRUD Operations
//!
//! ```ignore
//! use tessera_orm::record;
//!
//! let first = one.insert(&record! { "test" => 1 }).await?;
//! let second = two.insert(&record! { "another" => "x", "one" => first.clone() }).await?;
//!
//! // `%` makes a LIKE pattern
//! let rows = two.find(&record! { "another" => "%x" }).await?;
//!
//! let row = two.find_by_id(2).await?;
//! let row = two.update(2, &record! { "another" => "y" }).await?;
//! ```
//!
//! ## Schemaless tables
//!
//! ```ignore
//! // `success` is stored in the column `success::boolean`
//! let log = Table::new(conn.clone(), "log");
//! log.insert(&record! { "success" => true, "at" => Utc::now() }).await?;
//! let failures = log.find(&record! { "success" => false }).await?;
//! ```
//!
//! ## Relational queries
//!
//! ```ignore
//! // every `Two` whose `one` has id 1, with `one` embedded as a record
//! let rows = two.find_related(&registry, &record! { "one" => record! { "id" => 1 } }).await?;
//!
//! // embed `one` without filtering on it
//! let rows = two.find_related(&registry, &record! { "one" => record! {} }).await?;
//! ```

mod clause;
mod codec;
mod error;
mod field;
mod filter;
mod insert;
mod introspect;
mod join;
mod migrate;
mod naming;
mod query;
mod registry;
mod relation;
mod select;
mod table;
mod update;
mod value;

pub use clause::{ReferenceJoin, WILDCARD, WhereClause, compile as compile_where};
pub use codec::{Embedded, decode, encode, values_to_datatypes};
pub use error::{Error, Result};
pub use field::{FieldSet, FieldSpec, FieldType, ID_COLUMN, StorageClass, cast, parse};
pub use filter::Filter;
pub use insert::InsertBuilder;
pub use introspect::{fields_from_columns, introspect};
pub use join::{Join, JoinKind};
pub use migrate::Migrator;
pub use naming::{TAG_DELIMITER, column_def, physical_name};
pub use query::Query;
pub use registry::Registry;
pub use relation::{MAX_JOIN_DEPTH, RelationalQuery, compile_relational};
pub use select::SelectBuilder;
pub use table::Table;
// Re-export the storage boundary types that appear in this crate's API.
pub use tessera_sql::{ColumnInfo, Connection, DataType, Field, Row};
pub use update::UpdateBuilder;
pub use value::{Record, Value};
