#![doc = include_str!("../README.md")]

//! # SQL storage boundary
//!
//! The contract between the tessera mapping layer and a relational storage
//! engine. A [`Connection`] runs statements and reports a table's live
//! columns in terms of the physical [`DataType`]s defined here.

#![forbid(unsafe_code)]

mod connection;
pub mod sqlite;
mod traits;
mod types;

pub use self::connection::Connection;
pub use self::sqlite::{ConnectOptions, Sqlite};
pub use self::traits::*;
pub use self::types::{ColumnInfo, DataType, Field, Row};
