use anyhow::{Result, anyhow, bail};

/// A physical value as exchanged with the storage engine. `None` is SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// Boolean, stored by SQLite as an integer.
    Boolean(Option<bool>),
    /// 32-bit signed integer.
    Int32(Option<i32>),
    /// 64-bit signed integer.
    Int64(Option<i64>),
    /// 32-bit unsigned integer.
    Uint32(Option<u32>),
    /// 64-bit unsigned integer.
    Uint64(Option<u64>),
    /// Single precision float.
    Float(Option<f32>),
    /// Double precision float.
    Double(Option<f64>),
    /// UTF-8 text.
    Str(Option<String>),
    /// Raw bytes.
    Binary(Option<Vec<u8>>),
}

impl DataType {
    /// Returns `true` for any NULL variant.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Boolean(None)
                | Self::Int32(None)
                | Self::Int64(None)
                | Self::Uint32(None)
                | Self::Uint64(None)
                | Self::Float(None)
                | Self::Double(None)
                | Self::Str(None)
                | Self::Binary(None)
        )
    }
}

/// A named column value within a [`Row`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name as reported by the engine.
    pub name: String,
    /// Column value.
    pub value: DataType,
}

/// A single result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Position of the row within its result set.
    pub index: String,
    /// Column values, in projection order.
    pub fields: Vec<Field>,
}

impl Row {
    /// Returns the value of the named column, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DataType> {
        self.fields.iter().find(|field| field.name == name).map(|field| &field.value)
    }

    /// Removes and returns the value of the named column, if present.
    pub fn take(&mut self, name: &str) -> Option<DataType> {
        let position = self.fields.iter().position(|field| field.name == name)?;
        Some(self.fields.remove(position).value)
    }
}

/// Live metadata for one column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Physical column name.
    pub name: String,
    /// Declared column type, verbatim (e.g. `REAL`, `integer`).
    pub declared_type: String,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

impl TryFrom<&Row> for ColumnInfo {
    type Error = anyhow::Error;

    fn try_from(row: &Row) -> Result<Self> {
        let name = match row.get("name") {
            Some(DataType::Str(Some(name))) => name.clone(),
            _ => bail!("table info row is missing column name"),
        };
        let declared_type = match row.get("type") {
            Some(DataType::Str(Some(declared))) => declared.clone(),
            Some(value) if value.is_null() => String::new(),
            _ => bail!("table info row for '{name}' is missing declared type"),
        };
        let primary_key = match row.get("pk") {
            Some(DataType::Int64(Some(pk))) => *pk > 0,
            Some(DataType::Int32(Some(pk))) => *pk > 0,
            Some(DataType::Boolean(Some(pk))) => *pk,
            _ => return Err(anyhow!("table info row for '{name}' is missing primary key flag")),
        };

        Ok(Self {
            name,
            declared_type,
            primary_key,
        })
    }
}
