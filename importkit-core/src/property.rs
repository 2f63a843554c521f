//! Column-level import behavior.
//!
//! A [`Property`] describes how one destination column is populated during an
//! import: which source table/column it maps to, its required data type, how
//! its value is sourced, and which features must be enabled for it to be
//! usable. Identity is the `(table, column)` pair; the same property may be
//! declared by several features.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

use crate::transfer::PropertyDto;

/// Destination data type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Byte,
    DateTime,
    Decimal,
    Double,
    Short,
    Int,
    Long,
    String,
}

impl DataType {
    pub(crate) const ALL: [DataType; 9] = [
        DataType::Boolean,
        DataType::Byte,
        DataType::DateTime,
        DataType::Decimal,
        DataType::Double,
        DataType::Short,
        DataType::Int,
        DataType::Long,
        DataType::String,
    ];

    /// Canonical name used in transfer payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Byte => "Byte",
            DataType::DateTime => "DateTime",
            DataType::Decimal => "Decimal",
            DataType::Double => "Double",
            DataType::Short => "Short",
            DataType::Int => "Int",
            DataType::Long => "Long",
            DataType::String => "String",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// How a property's value is obtained during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceOption {
    /// Pulled from the source database column
    #[default]
    FromTable,
    /// Constant literal supplied by configuration
    FixedValue,
    /// Existing destination value is left untouched
    KeepValue,
    /// Destination value is reset; never projected
    ClearValue,
}

impl SourceOption {
    pub(crate) const ALL: [SourceOption; 4] = [
        SourceOption::FromTable,
        SourceOption::FixedValue,
        SourceOption::KeepValue,
        SourceOption::ClearValue,
    ];

    /// Canonical name used in transfer payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOption::FromTable => "FromTable",
            SourceOption::FixedValue => "FixedValue",
            SourceOption::KeepValue => "KeepValue",
            SourceOption::ClearValue => "ClearValue",
        }
    }
}

impl fmt::Display for SourceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceOption {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

/// Returned when an enum name from an external payload is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

/// Identity of a property: the destination table and column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyKey {
    pub table_name: String,
    pub column_name: String,
}

impl PropertyKey {
    /// Creates a new property key.
    pub fn new(table_name: impl Into<String>, column_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table_name, self.column_name)
    }
}

/// One column mapping owned (possibly jointly) by one or more features.
///
/// Table, column, data type and dependencies are fixed at construction.
/// Only the source option, fixed value and external identifier change
/// afterwards, through [`Property::update`] or [`Property::set_source`].
#[derive(Debug, Clone)]
pub struct Property {
    key: PropertyKey,
    data_type: DataType,
    required_for_feature: bool,
    source_option: SourceOption,
    fixed_value: String,
    feature_dependencies: BTreeSet<String>,
    external_id: Option<Uuid>,
}

impl Property {
    /// Creates a property sourced from its table column.
    ///
    /// The property's own table is always recorded as a feature dependency.
    pub fn new(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: DataType,
        required_for_feature: bool,
    ) -> Self {
        let key = PropertyKey::new(table_name, column_name);
        let mut feature_dependencies = BTreeSet::new();
        feature_dependencies.insert(key.table_name.clone());
        Self {
            key,
            data_type,
            required_for_feature,
            source_option: SourceOption::FromTable,
            fixed_value: String::new(),
            feature_dependencies,
            external_id: None,
        }
    }

    /// Adds further features this property requires.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Sets the compiled-in source option and fixed value.
    pub fn with_source(mut self, source_option: SourceOption, fixed_value: impl Into<String>) -> Self {
        self.source_option = source_option;
        self.fixed_value = fixed_value.into();
        self
    }

    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    pub fn table_name(&self) -> &str {
        &self.key.table_name
    }

    pub fn column_name(&self) -> &str {
        &self.key.column_name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn required_for_feature(&self) -> bool {
        self.required_for_feature
    }

    pub fn source_option(&self) -> SourceOption {
        self.source_option
    }

    pub fn fixed_value(&self) -> &str {
        &self.fixed_value
    }

    pub fn external_id(&self) -> Option<Uuid> {
        self.external_id
    }

    /// Feature names this property requires, its own table included.
    pub fn feature_dependencies(&self) -> &BTreeSet<String> {
        &self.feature_dependencies
    }

    /// Whether the property contributes a value to an import.
    ///
    /// `ClearValue` never does; `FixedValue` only with a non-blank literal.
    pub fn is_enabled_for_import(&self) -> bool {
        match self.source_option {
            SourceOption::FromTable | SourceOption::KeepValue => true,
            SourceOption::FixedValue => !self.fixed_value.trim().is_empty(),
            SourceOption::ClearValue => false,
        }
    }

    /// Replaces the source option and fixed value.
    pub fn set_source(&mut self, source_option: SourceOption, fixed_value: impl Into<String>) {
        self.source_option = source_option;
        self.fixed_value = fixed_value.into();
    }

    /// Copies the mutable settings from a transported record.
    ///
    /// Absent or unrecognised fields leave the current value in place.
    pub fn update(&mut self, record: &PropertyDto) {
        if let Some(fixed_value) = &record.fixed_value {
            self.fixed_value.clone_from(fixed_value);
        }
        if let Some(source_option) = record.source_option {
            self.source_option = source_option;
        }
        if record.id.is_some() {
            self.external_id = record.id;
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Property {}

impl Hash for Property {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
