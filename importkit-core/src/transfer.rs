//! Transfer objects for persisting and exchanging import configurations.
//!
//! The payload is a flat pair of lists: feature-level enablement and
//! property-level source settings. Readers are lenient. Missing fields
//! deserialize as absent, unknown fields are ignored, and unrecognised enum
//! names or values of the wrong JSON type become `None` rather than failing
//! the whole document.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::Result;
use crate::error::ImportKitError;
use crate::property::{DataType, PropertyKey, SourceOption};

/// Version tag written into exported payloads.
pub const CONFIG_FORMAT_VERSION: &str = "1.0";

/// Feature-level settings in a transfer payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureDto {
    #[serde(deserialize_with = "lenient_key")]
    pub feature_name: String,
    #[serde(deserialize_with = "lenient_value")]
    pub enabled: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_value"
    )]
    pub distinct: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_value"
    )]
    pub auto_delete: Option<bool>,
}

impl FeatureDto {
    /// A record without a feature name cannot be matched to the catalog.
    pub fn has_key(&self) -> bool {
        !self.feature_name.trim().is_empty()
    }
}

/// Property-level settings in a transfer payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyDto {
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_parse"
    )]
    pub id: Option<Uuid>,
    #[serde(deserialize_with = "lenient_key")]
    pub table_name: String,
    #[serde(deserialize_with = "lenient_key")]
    pub column_name: String,
    #[serde(deserialize_with = "lenient_enum")]
    pub data_type: Option<DataType>,
    #[serde(deserialize_with = "lenient_value")]
    pub fixed_value: Option<String>,
    #[serde(deserialize_with = "lenient_enum")]
    pub source_option: Option<SourceOption>,
}

impl PropertyDto {
    /// Identity of the property this record targets.
    pub fn key(&self) -> PropertyKey {
        PropertyKey::new(self.table_name.clone(), self.column_name.clone())
    }

    /// Both halves of the key are needed to match a catalog property.
    pub fn has_key(&self) -> bool {
        !self.table_name.trim().is_empty() && !self.column_name.trim().is_empty()
    }
}

/// Complete transfer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDto {
    pub version: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_parse"
    )]
    pub exported_at: Option<DateTime<Utc>>,
    pub features: Vec<FeatureDto>,
    pub properties: Vec<PropertyDto>,
}

impl Default for ConfigDto {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION.to_string(),
            exported_at: None,
            features: Vec::new(),
            properties: Vec::new(),
        }
    }
}

impl ConfigDto {
    /// Feature records keyed by feature name. Later duplicates win and
    /// records without a name are left out.
    pub fn feature_lookup(&self) -> HashMap<&str, &FeatureDto> {
        self.features
            .iter()
            .filter(|f| f.has_key())
            .map(|f| (f.feature_name.as_str(), f))
            .collect()
    }

    /// Property records keyed by `(table, column)`. Later duplicates win and
    /// records without a full key are left out.
    pub fn property_lookup(&self) -> HashMap<PropertyKey, &PropertyDto> {
        self.properties
            .iter()
            .filter(|p| p.has_key())
            .map(|p| (p.key(), p))
            .collect()
    }

    /// Records that carry no usable key.
    pub fn unkeyed_record_count(&self) -> usize {
        self.features.iter().filter(|f| !f.has_key()).count()
            + self.properties.iter().filter(|p| !p.has_key()).count()
    }

    /// Serializes the payload as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ImportKitError::serialization("configuration payload", e))
    }
}

/// Enums that may arrive either by name or by ordinal.
pub trait LenientEnum: FromStr + Sized {
    /// Maps a declaration-order ordinal to a variant.
    fn from_ordinal(ordinal: u64) -> Option<Self>;
}

impl LenientEnum for DataType {
    fn from_ordinal(ordinal: u64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| DataType::ALL.get(i).copied())
    }
}

impl LenientEnum for SourceOption {
    fn from_ordinal(ordinal: u64) -> Option<Self> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| SourceOption::ALL.get(i).copied())
    }
}

fn lenient_enum<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: LenientEnum,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(T::from_ordinal),
        _ => None,
    })
}

/// Any value of the wrong JSON type reads as absent.
fn lenient_value<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

fn lenient_key<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value::<D, String>(deserializer)?.unwrap_or_default())
}

fn lenient_parse<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}
