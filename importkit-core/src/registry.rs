//! The feature registry and dependency resolver.
//!
//! The registry owns every feature of one configuration session, keyed by
//! name and kept in catalog order for display. It answers which features
//! touch a table or property, whether a property is blocked by a disabled
//! dependency, and whether the enabled configuration as a whole is valid.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::Result;
use crate::error::ImportKitError;
use crate::feature::Feature;
use crate::property::{Property, PropertyKey, SourceOption};
use crate::report::{InvalidProperty, ValidationReport};
use crate::transfer::{ConfigDto, FeatureDto, PropertyDto};

/// Outcome of merging a transfer payload into the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    /// Features with a matching record in the payload
    pub applied_features: usize,
    /// Distinct properties with a matching record in the payload
    pub applied_properties: usize,
    /// Transported feature names the catalog does not know
    pub ignored_features: Vec<String>,
    /// Transported properties the catalog does not know
    pub ignored_properties: Vec<PropertyKey>,
    /// Transported records with no usable name or `(table, column)` key
    pub ignored_unkeyed_records: usize,
}

impl ApplySummary {
    /// Every transported record that was not merged.
    pub fn ignored_count(&self) -> usize {
        self.ignored_features.len() + self.ignored_properties.len() + self.ignored_unkeyed_records
    }
}

/// All features of one configuration session, keyed by name.
#[derive(Debug, Clone)]
pub struct FeatureRegistry {
    features: Vec<Feature>,
    index: HashMap<String, usize>,
}

impl FeatureRegistry {
    /// Builds a registry from features in catalog order.
    ///
    /// # Errors
    /// Returns `ImportKitError::Catalog` when a feature name repeats or a
    /// property's own table has no feature of the same name.
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        let mut index = HashMap::with_capacity(features.len());
        for (position, feature) in features.iter().enumerate() {
            if index.insert(feature.name().to_string(), position).is_some() {
                return Err(ImportKitError::catalog(format!(
                    "feature '{}' is declared more than once",
                    feature.name()
                )));
            }
        }

        for feature in &features {
            for property in feature.properties() {
                if !index.contains_key(property.table_name()) {
                    return Err(ImportKitError::catalog(format!(
                        "property {} in feature '{}' belongs to a table with no feature",
                        property.key(),
                        feature.name()
                    )));
                }
            }
        }

        Ok(Self { features, index })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Enabled features in catalog order.
    pub fn enabled_features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| f.enabled())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).map(|&i| &self.features[i])
    }

    pub fn feature_mut(&mut self, name: &str) -> Option<&mut Feature> {
        self.index.get(name).map(|&i| &mut self.features[i])
    }

    /// Enables or disables a feature by name.
    ///
    /// # Errors
    /// Returns `ImportKitError::UnknownFeature` if the name is not registered.
    pub fn set_feature_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let feature = self
            .feature_mut(name)
            .ok_or_else(|| ImportKitError::unknown_feature(name))?;
        feature.set_enabled(enabled);
        Ok(())
    }

    /// Sets the source of a property in every feature that declares it.
    ///
    /// Returns the number of declarations updated (zero when no feature
    /// declares the property).
    pub fn set_property_source(
        &mut self,
        key: &PropertyKey,
        source_option: SourceOption,
        fixed_value: &str,
    ) -> usize {
        let mut updated = 0;
        for feature in &mut self.features {
            for property in feature.properties_mut().filter(|p| p.key() == key) {
                property.set_source(source_option, fixed_value);
                updated += 1;
            }
        }
        updated
    }

    /// Checks whether `property` is blocked by a disabled feature.
    ///
    /// Each dependency that names a registered, disabled feature is reported,
    /// except the property's own table when validating from within that
    /// table's base feature. Unknown dependency names are skipped.
    pub fn is_property_missing_dependencies(
        &self,
        property: &Property,
        owning_feature: &Feature,
    ) -> (bool, Vec<String>) {
        let mut missing = Vec::new();

        for dependency in property.feature_dependencies() {
            let is_self_reference = dependency == property.table_name()
                && property.table_name() == owning_feature.name();
            if is_self_reference {
                continue;
            }

            match self.feature(dependency) {
                Some(feature) if !feature.enabled() => missing.push(dependency.clone()),
                Some(_) => {}
                None => tracing::debug!(
                    "Dependency '{}' of {} is not a registered feature",
                    dependency,
                    property.key()
                ),
            }
        }

        (!missing.is_empty(), missing)
    }

    /// Lists the properties of `feature` with unsatisfied dependencies.
    ///
    /// The feature's own enabled flag is not consulted, so this can be used
    /// for pre-flight diagnostics of a feature about to be switched on.
    pub fn invalid_properties(&self, feature: &Feature) -> Vec<InvalidProperty> {
        feature
            .properties()
            .iter()
            .filter_map(|property| {
                let (is_missing, missing) = self.is_property_missing_dependencies(property, feature);
                is_missing.then(|| InvalidProperty::new(property.key(), missing))
            })
            .collect()
    }

    /// Whether `feature` has no property with an unsatisfied dependency.
    pub fn is_feature_valid(&self, feature: &Feature) -> bool {
        self.invalid_properties(feature).is_empty()
    }

    /// Validates every enabled feature.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        for feature in self.enabled_features() {
            report.record(feature.name(), self.invalid_properties(feature));
        }
        report
    }

    /// Acceptance gate: true when no enabled feature has an invalid property.
    pub fn are_all_features_valid(&self) -> (bool, ValidationReport) {
        let report = self.validate();
        (report.is_valid(), report)
    }

    /// Distinct properties on `table_name` that satisfy `predicate`.
    ///
    /// Disabled features are skipped unless `include_disabled` is set. A
    /// property declared by several features appears once.
    pub fn properties_using_table<P>(
        &self,
        table_name: &str,
        include_disabled: bool,
        predicate: P,
    ) -> Vec<&Property>
    where
        P: Fn(&Property) -> bool,
    {
        let mut seen = HashSet::new();
        self.features
            .iter()
            .filter(|f| include_disabled || f.enabled())
            .flat_map(|f| f.properties().iter())
            .filter(|p| p.table_name() == table_name && predicate(*p))
            .filter(|p| seen.insert(p.key().clone()))
            .collect()
    }

    /// Enabled-feature properties on `table_name` that should be reset
    /// after import.
    pub fn clear_value_properties(&self, table_name: &str) -> Vec<&Property> {
        self.properties_using_table(table_name, false, |p| {
            p.source_option() == SourceOption::ClearValue
        })
    }

    /// The base feature representing `table_name` itself.
    pub fn baseline_feature_for_table(&self, table_name: &str) -> Option<&Feature> {
        self.feature(table_name)
    }

    /// Features that declare at least one property on `table_name`.
    pub fn features_using_table(&self, table_name: &str) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.touches_table(table_name))
            .collect()
    }

    /// Features that declare the property identified by `key`.
    pub fn features_containing_property(&self, key: &PropertyKey) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|f| f.property(key).is_some())
            .collect()
    }

    /// Merges a transfer payload into the registry.
    ///
    /// The catalog decides the shape and the payload decides the values:
    /// unknown transported items are ignored and catalog items absent from
    /// the payload keep their compiled-in settings.
    pub fn apply_config(&mut self, config: &ConfigDto) -> ApplySummary {
        let feature_lookup = config.feature_lookup();
        let property_lookup = config.property_lookup();
        let mut summary = ApplySummary::default();

        for feature in &mut self.features {
            match feature_lookup.get(feature.name()) {
                Some(record) => {
                    feature.update(record, &property_lookup);
                    summary.applied_features += 1;
                }
                None => {
                    let placeholder = FeatureDto {
                        feature_name: feature.name().to_string(),
                        ..FeatureDto::default()
                    };
                    feature.update(&placeholder, &property_lookup);
                }
            }
        }

        let known_properties: HashSet<&PropertyKey> = self
            .features
            .iter()
            .flat_map(|f| f.properties().iter().map(Property::key))
            .collect();

        for key in property_lookup.keys() {
            if known_properties.contains(key) {
                summary.applied_properties += 1;
            } else {
                tracing::warn!("Ignoring unknown transported property {}", key);
                summary.ignored_properties.push(key.clone());
            }
        }
        summary.ignored_properties.sort();

        for name in feature_lookup.keys() {
            if !self.contains(name) {
                tracing::warn!("Ignoring unknown transported feature '{}'", name);
                summary.ignored_features.push((*name).to_string());
            }
        }
        summary.ignored_features.sort();

        summary.ignored_unkeyed_records = config.unkeyed_record_count();
        if summary.ignored_unkeyed_records > 0 {
            tracing::warn!(
                "Ignoring {} transported record(s) without a name or key",
                summary.ignored_unkeyed_records
            );
        }

        summary
    }

    /// Flattens the registry into a transfer payload.
    ///
    /// Properties shared by several features are emitted once.
    pub fn to_config_dto(&self) -> ConfigDto {
        let features = self.features.iter().map(Feature::to_dto).collect();

        let mut seen = HashSet::new();
        let properties = self
            .features
            .iter()
            .flat_map(|f| f.properties().iter())
            .filter(|p| seen.insert(p.key().clone()))
            .map(|p| PropertyDto {
                id: p.external_id(),
                table_name: p.table_name().to_string(),
                column_name: p.column_name().to_string(),
                data_type: Some(p.data_type()),
                fixed_value: Some(p.fixed_value().to_string()),
                source_option: Some(p.source_option()),
            })
            .collect();

        ConfigDto {
            features,
            properties,
            ..ConfigDto::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureCategory;
    use crate::property::DataType;

    fn registry() -> FeatureRegistry {
        let resources = Feature::new(
            "Resources",
            FeatureCategory::Core,
            vec![
                Property::new("Resources", "ExternalId", DataType::String, true),
                Property::new("Resources", "Name", DataType::String, true),
            ],
        )
        .with_enabled(true);
        let tank = Feature::new(
            "Tank",
            FeatureCategory::Feature,
            vec![
                Property::new("Resources", "IsTank", DataType::Boolean, true)
                    .with_dependencies(["Tank"]),
            ],
        );
        FeatureRegistry::new(vec![resources, tank]).unwrap()
    }

    #[test]
    fn test_duplicate_feature_is_rejected() {
        let a = Feature::new("Plants", FeatureCategory::Core, vec![]);
        let b = Feature::new("Plants", FeatureCategory::Core, vec![]);
        let err = FeatureRegistry::new(vec![a, b]).unwrap_err();
        assert!(matches!(err, ImportKitError::Catalog { .. }));
    }

    #[test]
    fn test_unresolved_table_dependency_is_rejected() {
        let tank = Feature::new(
            "Tank",
            FeatureCategory::Feature,
            vec![Property::new("Resources", "IsTank", DataType::Boolean, true)],
        );
        let err = FeatureRegistry::new(vec![tank]).unwrap_err();
        assert!(err.to_string().contains("Resources.IsTank"));
    }

    #[test]
    fn test_missing_dependency_reported_against_base_feature() {
        let registry = registry();
        let resources = registry.feature("Resources").unwrap();
        let is_tank = registry
            .feature("Tank")
            .unwrap()
            .find_property("Resources", "IsTank")
            .unwrap();

        let (missing, names) = registry.is_property_missing_dependencies(is_tank, resources);
        assert!(missing);
        assert_eq!(names, vec!["Tank"]);
    }

    #[test]
    fn test_self_reference_exempt_only_inside_own_base_feature() {
        let mut registry = registry();
        registry.set_feature_enabled("Resources", false).unwrap();
        registry.set_feature_enabled("Tank", true).unwrap();

        let resources = registry.feature("Resources").unwrap();
        let tank = registry.feature("Tank").unwrap();

        // Inside its own base feature, a disabled own table is not reported.
        assert!(registry.invalid_properties(resources).is_empty());

        // From a cross-cutting feature, the disabled base table is reported.
        let invalid = registry.invalid_properties(tank);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].missing_features, vec!["Resources"]);
    }

    #[test]
    fn test_feature_validity_ignores_own_enabled_flag() {
        let registry = registry();
        let tank = registry.feature("Tank").unwrap();
        assert!(!tank.enabled());
        assert!(!registry.is_feature_valid(tank));
        // Only enabled features feed the acceptance gate.
        let (valid, report) = registry.are_all_features_valid();
        assert!(valid);
        assert!(report.is_valid());
    }

    #[test]
    fn test_all_features_valid_reports_per_feature() {
        let mut registry = registry();
        registry.set_feature_enabled("Tank", true).unwrap();
        registry.set_feature_enabled("Resources", false).unwrap();

        let (valid, report) = registry.are_all_features_valid();
        assert!(!valid);
        assert_eq!(report.for_feature("Tank").len(), 1);
        assert!(report.for_feature("Resources").is_empty());
    }

    #[test]
    fn test_unknown_feature_toggle_errors() {
        let mut registry = registry();
        let err = registry.set_feature_enabled("Spaceships", true).unwrap_err();
        assert!(matches!(err, ImportKitError::UnknownFeature { .. }));
    }

    #[test]
    fn test_properties_using_table_respects_enablement_and_predicate() {
        let registry = registry();

        let enabled_only = registry.properties_using_table("Resources", false, |_| true);
        assert_eq!(enabled_only.len(), 2);

        let all = registry.properties_using_table("Resources", true, |_| true);
        assert_eq!(all.len(), 3);

        let required_booleans = registry.properties_using_table("Resources", true, |p| {
            p.data_type() == DataType::Boolean
        });
        assert_eq!(required_booleans.len(), 1);
        assert_eq!(required_booleans[0].column_name(), "IsTank");
    }

    #[test]
    fn test_clear_value_properties() {
        let mut registry = registry();
        let key = PropertyKey::new("Resources", "Name");
        assert_eq!(registry.set_property_source(&key, SourceOption::ClearValue, ""), 1);

        let cleared = registry.clear_value_properties("Resources");
        assert_eq!(cleared.len(), 1);
        assert_eq!(cleared[0].key(), &key);
    }

    #[test]
    fn test_shared_property_copies_stay_in_sync() {
        let resources = Feature::new(
            "Resources",
            FeatureCategory::Core,
            vec![Property::new("Resources", "Capacity", DataType::Double, false)],
        );
        let capacity = Feature::new(
            "Capacity",
            FeatureCategory::Feature,
            vec![Property::new("Resources", "Capacity", DataType::Double, false)],
        );
        let mut registry = FeatureRegistry::new(vec![resources, capacity]).unwrap();
        let key = PropertyKey::new("Resources", "Capacity");

        assert_eq!(registry.features_containing_property(&key).len(), 2);
        assert_eq!(
            registry.set_property_source(&key, SourceOption::FixedValue, "10"),
            2
        );
        for feature in registry.features_containing_property(&key) {
            assert_eq!(feature.property(&key).unwrap().fixed_value(), "10");
        }

        let dto = registry.to_config_dto();
        assert_eq!(dto.properties.len(), 1);
    }

    #[test]
    fn test_baseline_feature_and_table_users() {
        let registry = registry();
        assert_eq!(
            registry.baseline_feature_for_table("Resources").unwrap().name(),
            "Resources"
        );
        assert!(registry.baseline_feature_for_table("Shifts").is_none());

        let users: Vec<&str> = registry
            .features_using_table("Resources")
            .iter()
            .map(|f| f.name())
            .collect();
        assert_eq!(users, vec!["Resources", "Tank"]);
    }

    #[test]
    fn test_apply_config_ignores_unknown_items() {
        let mut registry = registry();
        let config = ConfigDto {
            features: vec![
                FeatureDto {
                    feature_name: "Tank".to_string(),
                    enabled: Some(true),
                    ..FeatureDto::default()
                },
                FeatureDto {
                    feature_name: "Teleporter".to_string(),
                    enabled: Some(true),
                    ..FeatureDto::default()
                },
            ],
            properties: vec![
                PropertyDto {
                    table_name: "Resources".to_string(),
                    column_name: "Name".to_string(),
                    source_option: Some(SourceOption::KeepValue),
                    ..PropertyDto::default()
                },
                PropertyDto {
                    table_name: "Resources".to_string(),
                    column_name: "Colour".to_string(),
                    source_option: Some(SourceOption::ClearValue),
                    ..PropertyDto::default()
                },
            ],
            ..ConfigDto::default()
        };

        let summary = registry.apply_config(&config);

        assert_eq!(summary.applied_features, 1);
        assert_eq!(summary.applied_properties, 1);
        assert_eq!(summary.ignored_features, vec!["Teleporter"]);
        assert_eq!(
            summary.ignored_properties,
            vec![PropertyKey::new("Resources", "Colour")]
        );
        assert!(registry.feature("Tank").unwrap().enabled());
        // Absent from the payload: compiled-in flag kept.
        assert!(registry.feature("Resources").unwrap().enabled());
        let name = registry
            .feature("Resources")
            .unwrap()
            .find_property("Resources", "Name")
            .unwrap();
        assert_eq!(name.source_option(), SourceOption::KeepValue);
    }

    #[test]
    fn test_apply_config_skips_records_without_key() {
        let mut registry = registry();
        let config = ConfigDto {
            features: vec![
                FeatureDto {
                    enabled: Some(false),
                    ..FeatureDto::default()
                },
                FeatureDto {
                    feature_name: "Tank".to_string(),
                    enabled: Some(true),
                    ..FeatureDto::default()
                },
            ],
            properties: vec![PropertyDto {
                column_name: "Name".to_string(),
                source_option: Some(SourceOption::ClearValue),
                ..PropertyDto::default()
            }],
            ..ConfigDto::default()
        };

        let summary = registry.apply_config(&config);

        assert_eq!(summary.applied_features, 1);
        assert_eq!(summary.applied_properties, 0);
        assert!(summary.ignored_features.is_empty());
        assert_eq!(summary.ignored_unkeyed_records, 2);
        assert_eq!(summary.ignored_count(), 2);
        assert!(registry.feature("Tank").unwrap().enabled());
        assert!(registry.feature("Resources").unwrap().enabled());
    }
}
