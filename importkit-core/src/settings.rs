//! Projection settings and per-call query options.
//!
//! [`ProjectionSettings`] is owned by the import configuration and passed
//! explicitly to every projection build. [`QueryOptions`] selects how one
//! query is rendered; its default is the cached "standard" query.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::ImportKitError;

/// SQL rendering dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// Aliased fields with reserved-word escaping, no ordering
    #[default]
    New,
    /// `source AS target` fields with a deterministic `ORDER BY`
    Legacy,
}

/// Settings shared by every table projection of one configuration.
///
/// # Example
/// ```rust
/// use importkit_core::settings::ProjectionSettings;
///
/// let settings = ProjectionSettings::new().with_reserved_words("[", "]");
///
/// assert!(settings.validate().is_ok());
/// assert_eq!(settings.wrap("Order"), "[Order]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionSettings {
    /// Opening character(s) wrapped around aliased target names
    pub reserved_word_open: String,
    /// Closing character(s) wrapped around aliased target names
    pub reserved_word_close: String,
    /// Row limit applied when a query does not request one
    pub default_row_limit: Option<u32>,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self {
            reserved_word_open: "\"".to_string(),
            reserved_word_close: "\"".to_string(),
            default_row_limit: None,
        }
    }
}

impl ProjectionSettings {
    /// Creates settings with double-quote escaping and no row limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the reserved-word escaping pair.
    pub fn with_reserved_words(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.reserved_word_open = open.into();
        self.reserved_word_close = close.into();
        self
    }

    /// Builder method to set the default row limit with validation.
    pub fn with_default_row_limit(mut self, limit: u32) -> Result<Self> {
        if limit == 0 {
            return Err(ImportKitError::configuration(
                "default_row_limit must be greater than 0",
            ));
        }
        self.default_row_limit = Some(limit);
        Ok(self)
    }

    /// Validates the settings.
    ///
    /// # Errors
    /// Returns `ImportKitError::Configuration` if an escaping string is empty
    /// or contains whitespace, or the row limit is zero.
    pub fn validate(&self) -> Result<()> {
        for (label, value) in [
            ("reserved_word_open", &self.reserved_word_open),
            ("reserved_word_close", &self.reserved_word_close),
        ] {
            if value.is_empty() {
                return Err(ImportKitError::configuration(format!("{label} must not be empty")));
            }
            if value.chars().any(char::is_whitespace) {
                return Err(ImportKitError::configuration(format!(
                    "{label} must not contain whitespace"
                )));
            }
        }

        if self.default_row_limit == Some(0) {
            return Err(ImportKitError::configuration(
                "default_row_limit must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Wraps a target name in the reserved-word escaping pair.
    pub fn wrap(&self, name: &str) -> String {
        format!("{}{name}{}", self.reserved_word_open, self.reserved_word_close)
    }
}

/// Rendering options for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub dialect: Dialect,
    /// Row limit rendered as `TOP n`
    pub top: Option<u32>,
    /// Overrides the base feature's distinct flag
    pub distinct: Option<bool>,
    /// Project every importable column regardless of feature state
    pub all_columns: bool,
    /// Only consult these features instead of every enabled feature
    pub feature_subset: Option<Vec<String>>,
}

impl QueryOptions {
    /// The standard query: new dialect, no limit, no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard options rendered in the legacy dialect.
    pub fn legacy() -> Self {
        Self::default().with_dialect(Dialect::Legacy)
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = Some(distinct);
        self
    }

    pub fn with_all_columns(mut self, all_columns: bool) -> Self {
        self.all_columns = all_columns;
        self
    }

    /// Restricts column discovery to the named features.
    pub fn with_feature_subset<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_subset = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Whether these options describe the table's configured query.
    ///
    /// Only standard queries may be served from or written to the cache.
    pub fn is_standard(&self) -> bool {
        self.dialect == Dialect::New
            && self.top.is_none()
            && self.distinct.is_none()
            && !self.all_columns
            && self.feature_subset.is_none()
    }
}
