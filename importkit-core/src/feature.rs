//! Toggleable bundles of properties.
//!
//! A feature is either a base-table feature (its name is a physical table
//! and enabling it means "import this table") or a cross-cutting feature
//! that adds optional columns to tables owned by other features.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::property::{Property, PropertyKey};
use crate::report::RowValidationError;
use crate::transfer::{FeatureDto, PropertyDto};

/// Presentation category of a feature, ordered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    /// Tables every import needs
    Core,
    /// Optional physical tables
    AdvancedTables,
    /// Cross-cutting extensions to existing tables
    Feature,
}

impl FeatureCategory {
    /// Whether features of this category denote a physical table.
    pub fn is_base_table(&self) -> bool {
        matches!(self, FeatureCategory::Core | FeatureCategory::AdvancedTables)
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureCategory::Core => write!(f, "Core"),
            FeatureCategory::AdvancedTables => write!(f, "Advanced Tables"),
            FeatureCategory::Feature => write!(f, "Feature"),
        }
    }
}

/// A named, categorized bundle of properties with an enabled flag.
#[derive(Debug, Clone)]
pub struct Feature {
    name: String,
    category: FeatureCategory,
    enabled: bool,
    properties: Vec<Property>,
    object_types: Vec<String>,
    step: Option<u32>,
    distinct: Option<bool>,
    auto_delete: Option<bool>,
}

/// Required properties first, then by table, then by column.
fn property_order(a: &Property, b: &Property) -> Ordering {
    b.required_for_feature()
        .cmp(&a.required_for_feature())
        .then_with(|| a.table_name().cmp(b.table_name()))
        .then_with(|| a.column_name().cmp(b.column_name()))
}

impl Feature {
    /// Creates a disabled feature over the given properties.
    pub fn new(
        name: impl Into<String>,
        category: FeatureCategory,
        mut properties: Vec<Property>,
    ) -> Self {
        properties.sort_by(property_order);
        Self {
            name: name.into(),
            category,
            enabled: false,
            properties,
            object_types: Vec::new(),
            step: None,
            distinct: None,
            auto_delete: None,
        }
    }

    /// Builder method to set the compiled-in enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the ordering hint.
    pub fn with_step(mut self, step: u32) -> Self {
        self.step = Some(step);
        self
    }

    /// Builder method to set the object type classification.
    pub fn with_object_types<I, S>(mut self, object_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_types = object_types.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the distinct-rows flag.
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = Some(distinct);
        self
    }

    /// Builder method to set the auto-delete flag.
    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = Some(auto_delete);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> FeatureCategory {
        self.category
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn step(&self) -> Option<u32> {
        self.step
    }

    pub fn object_types(&self) -> &[String] {
        &self.object_types
    }

    pub fn distinct(&self) -> Option<bool> {
        self.distinct
    }

    pub fn auto_delete(&self) -> Option<bool> {
        self.auto_delete
    }

    /// Whether this feature denotes a physical table.
    pub fn is_base_table_feature(&self) -> bool {
        self.category.is_base_table()
    }

    /// Properties in presentation order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.properties.iter_mut()
    }

    /// Looks up an owned property by identity.
    pub fn property(&self, key: &PropertyKey) -> Option<&Property> {
        self.properties.iter().find(|p| p.key() == key)
    }

    /// Looks up an owned property by table and column.
    pub fn find_property(&self, table_name: &str, column_name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.table_name() == table_name && p.column_name() == column_name)
    }

    /// Whether any owned property lives on `table_name`.
    pub fn touches_table(&self, table_name: &str) -> bool {
        self.properties.iter().any(|p| p.table_name() == table_name)
    }

    /// Checks the required properties of `table_name` against one data row.
    ///
    /// Every required property whose field is missing, null or blank yields
    /// an entry keyed by column name. Enablement is not consulted.
    pub fn validate_row(
        &self,
        table_name: &str,
        row: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), RowValidationError> {
        let mut invalid_values = BTreeMap::new();

        for property in self
            .properties
            .iter()
            .filter(|p| p.required_for_feature() && p.table_name() == table_name)
        {
            let message = match row.get(property.column_name()) {
                None => Some("required column is missing from the row"),
                Some(serde_json::Value::Null) => Some("required value is null"),
                Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
                    Some("required value is empty")
                }
                Some(_) => None,
            };

            if let Some(message) = message {
                invalid_values.insert(property.column_name().to_string(), message.to_string());
            }
        }

        if invalid_values.is_empty() {
            Ok(())
        } else {
            Err(RowValidationError::new(&self.name, table_name, invalid_values))
        }
    }

    /// Applies a transported feature record and its property records.
    ///
    /// Properties without a matching record keep their current settings.
    pub fn update(
        &mut self,
        record: &FeatureDto,
        property_lookup: &HashMap<PropertyKey, &PropertyDto>,
    ) {
        if let Some(enabled) = record.enabled {
            self.enabled = enabled;
        }
        if record.distinct.is_some() {
            self.distinct = record.distinct;
        }
        if record.auto_delete.is_some() {
            self.auto_delete = record.auto_delete;
        }

        for property in &mut self.properties {
            if let Some(property_record) = property_lookup.get(property.key()) {
                property.update(property_record);
            }
        }
    }

    /// Transport record for this feature's own settings.
    pub fn to_dto(&self) -> FeatureDto {
        FeatureDto {
            feature_name: self.name.clone(),
            enabled: Some(self.enabled),
            distinct: self.distinct,
            auto_delete: self.auto_delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{DataType, SourceOption};
    use serde_json::json;

    fn resources() -> Feature {
        Feature::new(
            "Resources",
            FeatureCategory::Core,
            vec![
                Property::new("Resources", "Name", DataType::String, true),
                Property::new("Resources", "Description", DataType::String, false),
                Property::new("Resources", "ExternalId", DataType::String, true),
                Property::new("Plants", "ExternalId", DataType::String, false),
            ],
        )
    }

    fn row(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_properties_sorted_required_first() {
        let feature = resources();
        let order: Vec<String> = feature
            .properties()
            .iter()
            .map(|p| p.key().to_string())
            .collect();

        assert_eq!(
            order,
            vec![
                "Resources.ExternalId",
                "Resources.Name",
                "Plants.ExternalId",
                "Resources.Description",
            ]
        );
    }

    #[test]
    fn test_base_table_classification() {
        assert!(resources().is_base_table_feature());
        assert!(
            Feature::new("Departments", FeatureCategory::AdvancedTables, vec![])
                .is_base_table_feature()
        );
        assert!(!Feature::new("Tank", FeatureCategory::Feature, vec![]).is_base_table_feature());
    }

    #[test]
    fn test_validate_row_success() {
        let feature = resources();
        let result = feature.validate_row(
            "Resources",
            &row(json!({"ExternalId": "R1", "Name": "Mixer", "Description": null})),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_row_reports_each_required_column() {
        let feature = resources();
        let err = feature
            .validate_row("Resources", &row(json!({"ExternalId": null, "Name": "  "})))
            .unwrap_err();

        assert_eq!(err.invalid_values.len(), 2);
        assert!(err.invalid_values["ExternalId"].contains("null"));
        assert!(err.invalid_values["Name"].contains("empty"));
    }

    #[test]
    fn test_validate_row_only_checks_requested_table() {
        let feature = resources();
        let err = feature
            .validate_row("Resources", &row(json!({"Name": "Mixer"})))
            .unwrap_err();

        assert_eq!(err.invalid_values.len(), 1);
        assert!(err.invalid_values.contains_key("ExternalId"));
        assert!(err.invalid_values["ExternalId"].contains("missing"));
    }

    #[test]
    fn test_update_applies_records_and_ignores_absent_properties() {
        let mut feature = resources();
        let name = PropertyDto {
            table_name: "Resources".to_string(),
            column_name: "Name".to_string(),
            source_option: Some(SourceOption::FixedValue),
            fixed_value: Some("'Unnamed'".to_string()),
            ..PropertyDto::default()
        };
        let unknown = PropertyDto {
            table_name: "Resources".to_string(),
            column_name: "RetiredColumn".to_string(),
            source_option: Some(SourceOption::ClearValue),
            ..PropertyDto::default()
        };
        let lookup: HashMap<PropertyKey, &PropertyDto> =
            [(name.key(), &name), (unknown.key(), &unknown)].into_iter().collect();

        feature.update(
            &FeatureDto {
                feature_name: "Resources".to_string(),
                enabled: Some(true),
                distinct: Some(true),
                auto_delete: None,
            },
            &lookup,
        );

        assert!(feature.enabled());
        assert_eq!(feature.distinct(), Some(true));
        let updated = feature.find_property("Resources", "Name").unwrap();
        assert_eq!(updated.source_option(), SourceOption::FixedValue);
        assert_eq!(updated.fixed_value(), "'Unnamed'");
        let untouched = feature.find_property("Resources", "Description").unwrap();
        assert_eq!(untouched.source_option(), SourceOption::FromTable);
    }

    #[test]
    fn test_update_without_enabled_keeps_flag() {
        let mut feature = resources().with_enabled(true);
        feature.update(
            &FeatureDto {
                feature_name: "Resources".to_string(),
                ..FeatureDto::default()
            },
            &HashMap::new(),
        );
        assert!(feature.enabled());
    }

    #[test]
    fn test_category_order_for_presentation() {
        let mut categories = vec![
            FeatureCategory::Feature,
            FeatureCategory::Core,
            FeatureCategory::AdvancedTables,
        ];
        categories.sort();
        assert_eq!(
            categories,
            vec![
                FeatureCategory::Core,
                FeatureCategory::AdvancedTables,
                FeatureCategory::Feature
            ]
        );
    }
}
