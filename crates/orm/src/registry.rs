use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::field::FieldSpec;
use crate::table::Table;

/// Tables addressable by name, used to resolve reference fields.
///
/// Populated at setup time and read-only while queries run.
#[derive(Debug, Default)]
pub struct Registry {
    tables: HashMap<String, Arc<Table>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under its name, replacing any earlier registration.
    pub fn register(&mut self, table: impl Into<Arc<Table>>) -> Arc<Table> {
        let table = table.into();
        self.tables.insert(table.name().to_string(), Arc::clone(&table));
        table
    }

    /// Returns the named table.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.get(name)
    }

    /// Discards the cached field set of every registered table.
    pub fn reset(&self) {
        for table in self.tables.values() {
            table.invalidate();
        }
    }

    /// Resolves the target table of reference field `field` on table `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReferenceResolution`] when the field names no target
    /// or the target is not registered.
    pub fn resolve(&self, owner: &str, field: &FieldSpec) -> Result<&Arc<Table>> {
        let unresolved = || Error::ReferenceResolution {
            table: owner.to_string(),
            field: field.name.clone(),
            target: field.reference.clone(),
        };
        let target = field.reference.as_deref().ok_or_else(unresolved)?;
        self.tables.get(target).ok_or_else(unresolved)
    }
}
