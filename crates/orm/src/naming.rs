//! # Physical column naming
//!
//! Primitive types keep their bare name. Every other type appends its tag:
//! `success::boolean`, `created::date`, `one::reference`.

use sea_query::{Alias, ColumnDef};

use crate::field::{FieldSpec, FieldType};

/// Separates a logical name from its type tag in a physical column name.
pub const TAG_DELIMITER: &str = "::";

/// Physical column name for a logical field.
#[must_use]
pub fn physical_name(name: &str, field_type: FieldType) -> String {
    if field_type.is_primitive() {
        name.to_string()
    } else {
        format!("{name}{TAG_DELIMITER}{field_type}")
    }
}

/// Splits a physical column name into its logical name and type tag.
///
/// A suffix after the last delimiter that is not a known tag is treated as
/// part of the name.
#[must_use]
pub fn split(column: &str) -> (&str, Option<FieldType>) {
    column
        .rsplit_once(TAG_DELIMITER)
        .and_then(|(name, tag)| tag.parse::<FieldType>().ok().map(|t| (name, Some(t))))
        .unwrap_or((column, None))
}

/// Column definition used by CREATE and ALTER statements.
#[must_use]
pub fn column_def(field: &FieldSpec) -> ColumnDef {
    ColumnDef::new(Alias::new(field.column()))
        .custom(Alias::new(field.field_type.storage_class().as_str()))
        .to_owned()
}

impl FieldSpec {
    /// Physical column name of this field.
    #[must_use]
    pub fn column(&self) -> String {
        self.physical.clone().unwrap_or_else(|| physical_name(&self.name, self.field_type))
    }
}
