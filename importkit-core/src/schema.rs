//! Declarative row shapes for physical tables.
//!
//! Each base table carries a column list with nullability and an
//! importable flag. Projection enumerates these columns instead of
//! discovering them at runtime.

use serde::{Deserialize, Serialize};

use crate::property::DataType;

/// One physical column of a table's row shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Columns marked `false` are never projected
    #[serde(default = "default_true")]
    pub importable: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnSchema {
    /// Creates a nullable, importable column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
            importable: true,
        }
    }

    /// Builder method to mark the column non-nullable.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Builder method to exclude the column from every projection.
    pub fn not_importable(mut self) -> Self {
        self.importable = false;
        self
    }

    /// A non-nullable column is required in the projection plan.
    pub fn is_required(&self) -> bool {
        !self.nullable
    }
}

/// Row shape of one physical table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a table schema from its columns in physical order.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Columns that may appear in a projection, in physical order.
    pub fn importable_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.importable)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}
