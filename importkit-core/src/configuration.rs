//! The import configuration aggregate.
//!
//! An [`ImportConfiguration`] owns one [`FeatureRegistry`] and one
//! [`TableProjectionBuilder`] per base-table feature. Every mutation routed
//! through it marks the affected builders stale; [`rebuild_all`] brings them
//! back in line before queries are read.
//!
//! [`rebuild_all`]: ImportConfiguration::rebuild_all
//!
//! # Example
//! ```rust
//! use importkit_core::configuration::ImportConfiguration;
//! use importkit_core::settings::QueryOptions;
//!
//! # fn example() -> importkit_core::Result<()> {
//! let mut config = ImportConfiguration::baseline()?;
//! config.set_feature_enabled("Tank", true)?;
//! config.rebuild_all();
//!
//! let sql = config.command_text("Resources", &QueryOptions::new());
//! assert!(sql.contains("IsTank"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use chrono::Utc;

use crate::Result;
use crate::catalog::Catalog;
use crate::error::ImportKitError;
use crate::projection::{ProjectionState, TableProjectionBuilder};
use crate::property::{Property, PropertyKey, SourceOption};
use crate::registry::{ApplySummary, FeatureRegistry};
use crate::report::ValidationReport;
use crate::settings::{ProjectionSettings, QueryOptions};
use crate::transfer::ConfigDto;
use crate::validation::validate_and_parse_config;

/// Feature registry plus one projection builder per base table.
#[derive(Debug, Clone)]
pub struct ImportConfiguration {
    registry: FeatureRegistry,
    builders: Vec<TableProjectionBuilder>,
    settings: ProjectionSettings,
}

impl ImportConfiguration {
    /// Creates a configuration from a catalog with its compiled-in settings.
    ///
    /// Builders start stale; call [`rebuild_all`](Self::rebuild_all) before
    /// reading cached queries.
    ///
    /// # Errors
    /// Returns `ImportKitError::Configuration` for invalid settings and
    /// `ImportKitError::Catalog` for an inconsistent catalog.
    pub fn new(catalog: &Catalog, settings: ProjectionSettings) -> Result<Self> {
        settings.validate()?;
        let registry = catalog.build_registry()?;

        let builders = registry
            .iter()
            .filter(|f| f.is_base_table_feature())
            .map(|feature| {
                catalog
                    .schema(feature.name())
                    .cloned()
                    .map(TableProjectionBuilder::new)
                    .ok_or_else(|| {
                        ImportKitError::catalog(format!(
                            "base feature '{}' has no table schema",
                            feature.name()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Created import configuration with {} feature(s) and {} table(s)",
            registry.len(),
            builders.len()
        );

        Ok(Self {
            registry,
            builders,
            settings,
        })
    }

    /// Configuration over the built-in catalog with default settings.
    pub fn baseline() -> Result<Self> {
        Self::new(&Catalog::baseline(), ProjectionSettings::default())
    }

    /// Creates a configuration, applies a transfer payload and rebuilds.
    pub fn from_config_dto(
        catalog: &Catalog,
        settings: ProjectionSettings,
        config: &ConfigDto,
    ) -> Result<Self> {
        let mut configuration = Self::new(catalog, settings)?;
        configuration.apply_config_dto(config);
        configuration.rebuild_all();
        Ok(configuration)
    }

    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Mutable registry access. Every builder is marked stale.
    pub fn registry_mut(&mut self) -> &mut FeatureRegistry {
        self.mark_all_stale();
        &mut self.registry
    }

    pub fn settings(&self) -> &ProjectionSettings {
        &self.settings
    }

    /// Builders in catalog order.
    pub fn builders(&self) -> &[TableProjectionBuilder] {
        &self.builders
    }

    /// Names of the tables participating in import, in catalog order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.builders.iter().map(TableProjectionBuilder::table_name)
    }

    pub fn try_builder(&self, table_name: &str) -> Option<&TableProjectionBuilder> {
        self.builders.iter().find(|b| b.table_name() == table_name)
    }

    /// The builder for `table_name`.
    ///
    /// # Panics
    /// Panics if no builder is registered for the table. Every base feature
    /// has one, so a miss means the catalog and builders have drifted apart.
    pub fn builder(&self, table_name: &str) -> &TableProjectionBuilder {
        match self.try_builder(table_name) {
            Some(builder) => builder,
            None => panic!("no projection builder registered for table '{table_name}'"),
        }
    }

    /// Whether any builder has pending feature or property changes.
    pub fn needs_rebuild(&self) -> bool {
        self.builders
            .iter()
            .any(|b| b.state() == ProjectionState::Stale)
    }

    /// Rebuilds every table's projection plan and cached query.
    ///
    /// # Panics
    /// Panics if a base feature has no builder.
    pub fn rebuild_all(&mut self) {
        for feature in self.registry.iter().filter(|f| f.is_base_table_feature()) {
            assert!(
                self.builders.iter().any(|b| b.table_name() == feature.name()),
                "base feature '{}' has no projection builder",
                feature.name()
            );
        }

        for builder in &mut self.builders {
            builder.rebuild_import_data(&self.registry, &self.settings);
        }

        tracing::info!("Rebuilt projections for {} table(s)", self.builders.len());
    }

    /// Query text for one table.
    ///
    /// # Panics
    /// Panics if `table_name` has no builder.
    pub fn command_text(&self, table_name: &str, options: &QueryOptions) -> String {
        self.builder(table_name)
            .command_text(&self.registry, &self.settings, options)
    }

    /// Query text for a table named by a caller outside the catalog.
    ///
    /// # Errors
    /// Returns `ImportKitError::UnknownTable` if `table_name` has no builder.
    pub fn try_command_text(&self, table_name: &str, options: &QueryOptions) -> Result<String> {
        self.try_builder(table_name)
            .map(|builder| builder.command_text(&self.registry, &self.settings, options))
            .ok_or_else(|| ImportKitError::unknown_table(table_name))
    }

    /// Enables or disables a feature and marks every builder stale.
    pub fn set_feature_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.registry.set_feature_enabled(name, enabled)?;
        self.mark_all_stale();
        Ok(())
    }

    /// Changes a property's source everywhere it is declared.
    ///
    /// Only the property's own table is marked stale.
    ///
    /// # Errors
    /// Returns `ImportKitError::Configuration` if no feature declares `key`.
    pub fn set_property_source(
        &mut self,
        key: &PropertyKey,
        source_option: SourceOption,
        fixed_value: &str,
    ) -> Result<()> {
        if self.registry.set_property_source(key, source_option, fixed_value) == 0 {
            return Err(ImportKitError::configuration(format!(
                "no feature declares property {key}"
            )));
        }
        if let Some(builder) = self
            .builders
            .iter_mut()
            .find(|b| b.table_name() == key.table_name)
        {
            builder.mark_stale();
        }
        Ok(())
    }

    /// Dependency validation of every enabled feature.
    pub fn validate(&self) -> ValidationReport {
        self.registry.validate()
    }

    /// Enabled-feature properties on `table_name` to reset after import.
    pub fn clear_value_properties(&self, table_name: &str) -> Vec<&Property> {
        self.registry.clear_value_properties(table_name)
    }

    /// Merges a transfer payload. Builders are marked stale, not rebuilt.
    pub fn apply_config_dto(&mut self, config: &ConfigDto) -> ApplySummary {
        let summary = self.registry.apply_config(config);
        self.mark_all_stale();

        tracing::info!(
            "Applied configuration version {}: {} feature(s), {} propert(ies), {} ignored",
            config.version,
            summary.applied_features,
            summary.applied_properties,
            summary.ignored_count()
        );
        summary
    }

    /// Validates, applies and rebuilds from a JSON transfer payload.
    ///
    /// # Errors
    /// Returns `ImportKitError::Payload` if the payload is malformed or has
    /// an unsupported version. The configuration is untouched in that case.
    pub fn apply_config_json(&mut self, json: &str) -> Result<ApplySummary> {
        let config = validate_and_parse_config(json)?;
        let summary = self.apply_config_dto(&config);
        self.rebuild_all();
        Ok(summary)
    }

    /// Exports the current state as a transfer payload.
    pub fn to_config_dto(&self) -> ConfigDto {
        ConfigDto {
            exported_at: Some(Utc::now()),
            ..self.registry.to_config_dto()
        }
    }

    fn mark_all_stale(&mut self) {
        for builder in &mut self.builders {
            builder.mark_stale();
        }
    }
}
