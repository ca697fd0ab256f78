//! Declared configuration for entities and feature views.
//!
//! These types mirror what a user writes in a definition file. They are
//! deliberately permissive (most fields optional) so that the resolver, not
//! the deserializer, reports which field is missing.

use serde::{Deserialize, Serialize};

/// A registered join-key grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity name (case-insensitive; stored upper-cased).
    pub name: String,
    /// Ordered join keys.
    pub join_keys: Vec<String>,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntityDefinition {
    /// Creates an entity definition without a description.
    #[must_use]
    pub fn new(name: impl Into<String>, join_keys: &[&str]) -> Self {
        Self {
            name: name.into(),
            join_keys: join_keys.iter().map(|k| (*k).to_string()).collect(),
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How drift between declared and observed managed-table config is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangePolicy {
    /// Alter the object in place.
    #[default]
    Apply,
    /// Warn and leave the object untouched.
    Continue,
    /// Abort the materialization.
    Fail,
}

impl ChangePolicy {
    /// Returns the policy name as written in definitions.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Continue => "continue",
            Self::Fail => "fail",
        }
    }
}

impl std::fmt::Display for ChangePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamic table refresh mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefreshMode {
    /// Let the warehouse choose.
    #[default]
    #[serde(alias = "auto")]
    Auto,
    /// Always recompute fully.
    #[serde(alias = "full")]
    Full,
    /// Recompute incrementally.
    #[serde(alias = "incremental")]
    Incremental,
}

impl RefreshMode {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Full => "FULL",
            Self::Incremental => "INCREMENTAL",
        }
    }
}

/// When the first refresh of a dynamic table happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitializeMode {
    /// Populate synchronously at creation.
    #[default]
    #[serde(alias = "on_create")]
    OnCreate,
    /// Populate at the first scheduled refresh.
    #[serde(alias = "on_schedule")]
    OnSchedule,
}

impl InitializeMode {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::OnCreate => "ON_CREATE",
            Self::OnSchedule => "ON_SCHEDULE",
        }
    }
}

/// Refresh settings; presence selects the managed (dynamic table) kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RefreshSpec {
    /// Target lag, e.g. `"5 minutes"`.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Warehouse running the refreshes.
    #[serde(default)]
    pub warehouse: Option<String>,
    /// Refresh mode.
    #[serde(default)]
    pub mode: RefreshMode,
    /// Initialization behaviour.
    #[serde(default)]
    pub initialize: InitializeMode,
}

impl RefreshSpec {
    /// Creates a refresh spec with default mode and initialization.
    #[must_use]
    pub fn new(frequency: impl Into<String>, warehouse: impl Into<String>) -> Self {
        Self {
            frequency: Some(frequency.into()),
            warehouse: Some(warehouse.into()),
            ..Self::default()
        }
    }
}

/// A feature view as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureViewDefinition {
    /// Feature view name.
    #[serde(default)]
    pub name: String,
    /// Dotted version, e.g. `"1.0"`.
    #[serde(default)]
    pub version: Option<String>,
    /// Referenced entity names, in declaration order.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Event timestamp column.
    #[serde(default)]
    pub timestamp_col: Option<String>,
    /// Refresh settings for managed feature views.
    #[serde(default)]
    pub refresh: Option<RefreshSpec>,
    /// Drift policy for managed feature views.
    #[serde(default)]
    pub change_policy: ChangePolicy,
    /// Object comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// SELECT statement the object is built from.
    #[serde(default)]
    pub query: String,
}

impl FeatureViewDefinition {
    /// Creates a static feature view definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        entities: &[&str],
        query: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            entities: entities.iter().map(|e| (*e).to_string()).collect(),
            query: query.into(),
            ..Self::default()
        }
    }

    /// Sets the timestamp column.
    #[must_use]
    pub fn with_timestamp_col(mut self, column: impl Into<String>) -> Self {
        self.timestamp_col = Some(column.into());
        self
    }

    /// Makes the feature view managed with the given refresh spec.
    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshSpec) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Sets the change policy.
    #[must_use]
    pub fn with_change_policy(mut self, policy: ChangePolicy) -> Self {
        self.change_policy = policy;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
