//! Core engine for feature-driven import projections.
//!
//! A catalog of toggleable features, each a bundle of column-level
//! properties on physical tables, drives two things: dependency validation
//! (is every enabled feature's property backed by the features it needs?)
//! and SQL projection (which columns does each table's SELECT pull under
//! the enabled features?).
//!
//! # Architecture
//! - [`property`] and [`feature`] are the catalog's value types
//! - [`registry`] owns a session's features and resolves dependencies
//! - [`projection`] renders per-table SELECT text from the registry
//! - [`configuration`] is the aggregate tying registry and builders together
//! - [`transfer`] and [`validation`] carry configurations in and out

pub mod catalog;
pub mod configuration;
pub mod error;
pub mod feature;
pub mod logging;
pub mod projection;
pub mod property;
pub mod registry;
pub mod report;
pub mod schema;
pub mod settings;
pub mod transfer;
pub mod validation;

// Re-export commonly used types
pub use catalog::{Catalog, FeatureDescriptor, PropertyDescriptor};
pub use configuration::ImportConfiguration;
pub use error::{ImportKitError, Result};
pub use feature::{Feature, FeatureCategory};
pub use projection::{MapInfo, ProjectionState, TableProjectionBuilder};
pub use property::{DataType, Property, PropertyKey, SourceOption};
pub use registry::{ApplySummary, FeatureRegistry};
pub use report::{InvalidProperty, RowValidationError, ValidationReport};
pub use schema::{ColumnSchema, TableSchema};
pub use settings::{Dialect, ProjectionSettings, QueryOptions};
pub use transfer::{CONFIG_FORMAT_VERSION, ConfigDto, FeatureDto, PropertyDto};

pub use validation::{
    ValidationError, initialize_payload_validator, validate_and_parse_config,
    validate_config_payload,
};
