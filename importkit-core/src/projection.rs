//! Per-table SELECT synthesis.
//!
//! A [`TableProjectionBuilder`] is bound to one physical table schema. It
//! derives which columns are importable under the enabled features (the
//! projection plan, a list of [`MapInfo`]) and renders the plan as SQL in
//! one of two dialects. The standard query is cached by
//! [`TableProjectionBuilder::rebuild_import_data`]; every other variant is
//! rendered on demand and never touches the cache.
//!
//! # Example
//! ```rust
//! use importkit_core::feature::{Feature, FeatureCategory};
//! use importkit_core::projection::TableProjectionBuilder;
//! use importkit_core::property::{DataType, Property};
//! use importkit_core::registry::FeatureRegistry;
//! use importkit_core::schema::{ColumnSchema, TableSchema};
//! use importkit_core::settings::{ProjectionSettings, QueryOptions};
//!
//! let plants = Feature::new(
//!     "Plants",
//!     FeatureCategory::Core,
//!     vec![Property::new("Plants", "Name", DataType::String, true)],
//! )
//! .with_enabled(true);
//! let registry = FeatureRegistry::new(vec![plants]).unwrap();
//! let schema = TableSchema::new("Plants", vec![ColumnSchema::new("Name", DataType::String)]);
//!
//! let mut builder = TableProjectionBuilder::new(schema);
//! let settings = ProjectionSettings::default();
//! builder.rebuild_import_data(&registry, &settings);
//!
//! let sql = builder.command_text(&registry, &settings, &QueryOptions::new());
//! assert_eq!(sql, "SELECT Name FROM Plants");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::property::SourceOption;
use crate::registry::FeatureRegistry;
use crate::schema::TableSchema;
use crate::settings::{Dialect, ProjectionSettings, QueryOptions};

/// Legacy ORDER BY candidates in priority order.
///
/// `ExternalId` leads: the other names contain it as a substring.
const ORDER_BY_PRIORITY: [&str; 4] = [
    "ExternalId",
    "PlantExternalId",
    "DepartmentExternalId",
    "ResourceExternalId",
];

/// One row of a projection plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Destination column name
    pub target_property: String,
    /// Physical column name or a literal fixed value
    pub source_expression: String,
    /// Taken from schema nullability
    pub required: bool,
}

impl MapInfo {
    fn has_source(&self) -> bool {
        !self.source_expression.trim().is_empty()
    }
}

/// Whether a builder's plan and cached query reflect the current features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionState {
    /// Feature enablement or property sources may have changed since the
    /// last rebuild
    #[default]
    Stale,
    /// Plan and cached query match the features as of the last rebuild
    Built,
}

/// Projection builder for one physical table.
#[derive(Debug, Clone)]
pub struct TableProjectionBuilder {
    schema: TableSchema,
    map_infos: Vec<MapInfo>,
    cached_command_text: Option<String>,
    state: ProjectionState,
}

impl TableProjectionBuilder {
    /// Creates an unbuilt builder for `schema`.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            map_infos: Vec::new(),
            cached_command_text: None,
            state: ProjectionState::Stale,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn state(&self) -> ProjectionState {
        self.state
    }

    /// Plan captured by the last rebuild.
    pub fn map_infos(&self) -> &[MapInfo] {
        &self.map_infos
    }

    /// Standard query captured by the last rebuild.
    pub fn cached_command_text(&self) -> Option<&str> {
        self.cached_command_text.as_deref()
    }

    /// Flags the plan as out of date without recomputing it.
    pub fn mark_stale(&mut self) {
        self.state = ProjectionState::Stale;
    }

    /// Recomputes the plan and the standard query from the registry.
    pub fn rebuild_import_data(&mut self, registry: &FeatureRegistry, settings: &ProjectionSettings) {
        self.map_infos = self.get_map_infos_for_table_type(registry, None);
        // A default row limit makes every query limited, so nothing is cached.
        self.cached_command_text = settings.default_row_limit.is_none().then(|| {
            self.get_command_text_internal(registry, settings, &QueryOptions::new())
        });
        self.state = ProjectionState::Built;

        tracing::debug!(
            "Rebuilt projection for '{}' with {} mapped column(s)",
            self.schema.name,
            self.map_infos.len()
        );
    }

    /// Derives the projection plan from the schema and enabled features.
    ///
    /// Columns marked non-importable are skipped. `feature_subset` limits the
    /// features consulted; disabled features are never consulted.
    pub fn get_map_infos_for_table_type(
        &self,
        registry: &FeatureRegistry,
        feature_subset: Option<&[String]>,
    ) -> Vec<MapInfo> {
        self.schema
            .importable_columns()
            .filter_map(|column| {
                self.property_exists_in_feature(registry, &column.name, feature_subset)
                    .map(|source_expression| MapInfo {
                        target_property: column.name.clone(),
                        source_expression,
                        required: column.is_required(),
                    })
            })
            .collect()
    }

    /// Finds the first enabled-feature property for `column_name` on this
    /// table and returns its source expression.
    ///
    /// `FromTable` maps to the column itself and `FixedValue` to the literal.
    /// Anything else, or no match, yields `None`.
    pub fn property_exists_in_feature(
        &self,
        registry: &FeatureRegistry,
        column_name: &str,
        feature_subset: Option<&[String]>,
    ) -> Option<String> {
        let property = registry
            .enabled_features()
            .filter(|f| feature_subset.is_none_or(|subset| subset.iter().any(|n| n == f.name())))
            .find_map(|f| f.find_property(&self.schema.name, column_name))?;

        match property.source_option() {
            SourceOption::FromTable => Some(column_name.to_string()),
            SourceOption::FixedValue => Some(property.fixed_value().to_string()),
            SourceOption::KeepValue | SourceOption::ClearValue => None,
        }
    }

    /// Query text for this table.
    ///
    /// Standard options are answered from the cache once built. A stale
    /// cache is still served, with a warning, until the next rebuild.
    pub fn command_text(
        &self,
        registry: &FeatureRegistry,
        settings: &ProjectionSettings,
        options: &QueryOptions,
    ) -> String {
        let cacheable = options.is_standard() && settings.default_row_limit.is_none();
        if cacheable && let Some(cached) = &self.cached_command_text {
            if self.state == ProjectionState::Stale {
                tracing::warn!(
                    "Serving stale projection for '{}'; rebuild before querying",
                    self.schema.name
                );
            } else {
                tracing::debug!("Projection cache hit for '{}'", self.schema.name);
            }
            return cached.clone();
        }

        self.get_command_text_internal(registry, settings, options)
    }

    /// Renders a query without consulting the cache.
    ///
    /// Returns an empty string when no column has a source expression.
    pub fn get_command_text_internal(
        &self,
        registry: &FeatureRegistry,
        settings: &ProjectionSettings,
        options: &QueryOptions,
    ) -> String {
        let map_infos = if options.all_columns {
            self.schema
                .importable_columns()
                .map(|column| MapInfo {
                    target_property: column.name.clone(),
                    source_expression: column.name.clone(),
                    required: column.is_required(),
                })
                .collect()
        } else {
            self.get_map_infos_for_table_type(registry, options.feature_subset.as_deref())
        };

        let distinct = options
            .distinct
            .or_else(|| {
                registry
                    .baseline_feature_for_table(&self.schema.name)
                    .and_then(|f| f.distinct())
            })
            .unwrap_or(false);
        let top = options.top.or(settings.default_row_limit);

        render_select(
            &self.schema.name,
            &map_infos,
            settings,
            options.dialect,
            distinct,
            top,
        )
    }
}

fn render_field(info: &MapInfo, settings: &ProjectionSettings, dialect: Dialect) -> String {
    let source = info.source_expression.as_str();
    let target = info.target_property.as_str();
    match dialect {
        Dialect::Legacy => format!("{source} AS {target}"),
        Dialect::New if source.eq_ignore_ascii_case(target) => source.to_string(),
        Dialect::New => format!("{source} AS {}", settings.wrap(target)),
    }
}

fn render_select(
    table_name: &str,
    map_infos: &[MapInfo],
    settings: &ProjectionSettings,
    dialect: Dialect,
    distinct: bool,
    top: Option<u32>,
) -> String {
    let mapped: Vec<&MapInfo> = map_infos.iter().filter(|m| m.has_source()).collect();
    if mapped.is_empty() {
        return String::new();
    }

    let fields: Vec<String> = mapped
        .iter()
        .map(|info| render_field(info, settings, dialect))
        .collect();

    let mut sql = String::from("SELECT ");
    if distinct {
        sql.push_str("DISTINCT ");
    }
    if let Some(top) = top {
        sql.push_str(&format!("TOP {top} "));
    }
    sql.push_str(&fields.join(", "));
    sql.push_str(" FROM ");
    sql.push_str(table_name);

    if dialect == Dialect::Legacy {
        let terms = order_by_terms(&mapped, settings);
        if !terms.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(","));
            sql.push_str(" ASC");
        }
    }

    sql
}

fn order_by_terms(mapped: &[&MapInfo], settings: &ProjectionSettings) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for name in ORDER_BY_PRIORITY {
        let Some(info) = mapped.iter().find(|m| m.target_property == name) else {
            continue;
        };
        let term = strip_trailing_alias(&render_field(info, settings, Dialect::Legacy));
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

fn trailing_alias() -> &'static Regex {
    static TRAILING_ALIAS: OnceLock<Regex> = OnceLock::new();
    TRAILING_ALIAS.get_or_init(|| {
        Regex::new(r"(?i)\s+AS\s+\S+\s*$").expect("Invalid trailing alias pattern")
    })
}

/// Removes a trailing `AS alias` unless the term is a cast expression.
pub(crate) fn strip_trailing_alias(term: &str) -> String {
    let term = term.trim();
    if term.to_ascii_uppercase().contains("CAST(") {
        return term.to_string();
    }
    trailing_alias().replace(term, "").trim().to_string()
}
