//! The feature catalog as plain data.
//!
//! A [`Catalog`] lists every feature with its property descriptors and one
//! [`TableSchema`] per base table. It is validated once, then turned into a
//! [`FeatureRegistry`] for a configuration session.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::Result;
use crate::error::ImportKitError;
use crate::feature::{Feature, FeatureCategory};
use crate::property::{DataType, Property, SourceOption};
use crate::registry::FeatureRegistry;
use crate::schema::TableSchema;

mod baseline;

/// Declaration of one property inside a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub table: String,
    pub column: String,
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    /// Features required beyond the property's own table
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub source_option: SourceOption,
    #[serde(default)]
    pub fixed_value: String,
}

impl PropertyDescriptor {
    /// Creates an optional descriptor sourced from its table.
    pub fn new(table: impl Into<String>, column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            data_type,
            required: false,
            dependencies: Vec::new(),
            source_option: SourceOption::FromTable,
            fixed_value: String::new(),
        }
    }

    /// Builder method to mark the property required for its feature.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder method to add feature dependencies.
    pub fn depends_on<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(features.into_iter().map(Into::into));
        self
    }

    fn to_property(&self) -> Property {
        Property::new(
            self.table.clone(),
            self.column.clone(),
            self.data_type,
            self.required,
        )
        .with_dependencies(self.dependencies.iter().cloned())
        .with_source(self.source_option, self.fixed_value.clone())
    }
}

/// Declaration of one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub name: String,
    pub category: FeatureCategory,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub object_types: Vec<String>,
    #[serde(default)]
    pub distinct: Option<bool>,
    #[serde(default)]
    pub auto_delete: Option<bool>,
    pub properties: Vec<PropertyDescriptor>,
}

impl FeatureDescriptor {
    /// Creates a disabled feature descriptor.
    pub fn new(
        name: impl Into<String>,
        category: FeatureCategory,
        properties: Vec<PropertyDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            enabled: false,
            step: None,
            object_types: Vec::new(),
            distinct: None,
            auto_delete: None,
            properties,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    /// Instantiates the feature with fresh property copies.
    pub fn to_feature(&self) -> Feature {
        let properties = self.properties.iter().map(PropertyDescriptor::to_property).collect();
        let mut feature = Feature::new(self.name.clone(), self.category, properties)
            .with_enabled(self.enabled)
            .with_object_types(self.object_types.iter().cloned());
        if let Some(step) = self.step {
            feature = feature.with_step(step);
        }
        if let Some(distinct) = self.distinct {
            feature = feature.with_distinct(distinct);
        }
        if let Some(auto_delete) = self.auto_delete {
            feature = feature.with_auto_delete(auto_delete);
        }
        feature
    }
}

/// Every feature and base-table schema known to one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub features: Vec<FeatureDescriptor>,
    pub schemas: Vec<TableSchema>,
}

impl Catalog {
    /// The built-in catalog shipped with the engine.
    pub fn baseline() -> Self {
        Self {
            features: baseline::features(),
            schemas: baseline::schemas(),
        }
    }

    /// Loads and validates a catalog from JSON.
    ///
    /// # Errors
    /// Returns `ImportKitError::Serialization` for malformed JSON and
    /// `ImportKitError::Catalog` when the catalog is inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)
            .map_err(|e| ImportKitError::serialization("feature catalog", e))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks the catalog's internal consistency.
    ///
    /// Feature names are unique, base features and schemas pair up one to
    /// one by name, and every property's table has a feature.
    ///
    /// # Errors
    /// Returns `ImportKitError::Catalog` describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for feature in &self.features {
            if !names.insert(feature.name.as_str()) {
                return Err(ImportKitError::catalog(format!(
                    "feature '{}' is declared more than once",
                    feature.name
                )));
            }
        }

        let mut tables = HashSet::new();
        for schema in &self.schemas {
            if !tables.insert(schema.name.as_str()) {
                return Err(ImportKitError::catalog(format!(
                    "table '{}' has more than one schema",
                    schema.name
                )));
            }
        }

        for feature in &self.features {
            let is_base = feature.category.is_base_table();
            if is_base && !tables.contains(feature.name.as_str()) {
                return Err(ImportKitError::catalog(format!(
                    "base feature '{}' has no table schema",
                    feature.name
                )));
            }
            if !is_base && tables.contains(feature.name.as_str()) {
                return Err(ImportKitError::catalog(format!(
                    "feature '{}' shares a table name but is not a base feature",
                    feature.name
                )));
            }

            for property in &feature.properties {
                if !names.contains(property.table.as_str()) {
                    return Err(ImportKitError::catalog(format!(
                        "property {}.{} in feature '{}' belongs to a table with no feature",
                        property.table, property.column, feature.name
                    )));
                }
                if let Some(schema) = self.schema(&property.table)
                    && schema.column(&property.column).is_none()
                {
                    tracing::debug!(
                        "Property {}.{} has no column in the table schema",
                        property.table,
                        property.column
                    );
                }
            }
        }

        if let Some(orphan) = self.schemas.iter().find(|s| !names.contains(s.name.as_str())) {
            return Err(ImportKitError::catalog(format!(
                "table schema '{}' has no base feature",
                orphan.name
            )));
        }

        Ok(())
    }

    pub fn schema(&self, table_name: &str) -> Option<&TableSchema> {
        self.schemas.iter().find(|s| s.name == table_name)
    }

    /// Builds a fresh registry for one configuration session.
    ///
    /// # Errors
    /// Returns `ImportKitError::Catalog` if the catalog is inconsistent.
    pub fn build_registry(&self) -> Result<FeatureRegistry> {
        self.validate()?;
        FeatureRegistry::new(self.features.iter().map(FeatureDescriptor::to_feature).collect())
    }
}
