//! Feature store configuration.
//!
//! The feature store lives in one `database.schema` pair. Every object, tag and
//! entity registration this system writes is qualified with that pair.

use crate::error::{Error, Result};
use crate::ident::{Identifier, QualifiedName};

/// Default schema holding feature store objects.
pub const DEFAULT_SCHEMA: &str = "FEATURE_STORE";

/// Package version advertised in the `SNOWML_FEATURE_STORE_OBJECT` tag.
pub const DEFAULT_PKG_VERSION: &str = "1.5.0";

/// Location and identity settings for the feature store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureStoreConfig {
    /// Database holding the feature store schema.
    pub database: String,
    /// Feature store schema.
    pub schema: String,
    /// Warehouse used for session work (describes, tag lookups).
    pub default_warehouse: Option<String>,
    /// Role used for the session.
    pub role: Option<String>,
    /// Version string written into object type tags.
    pub pkg_version: String,
}

impl Default for FeatureStoreConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            schema: DEFAULT_SCHEMA.to_string(),
            default_warehouse: None,
            role: None,
            pkg_version: DEFAULT_PKG_VERSION.to_string(),
        }
    }
}

impl FeatureStoreConfig {
    /// Creates a config for the given database using default schema and version.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    /// Overrides the feature store schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Overrides the package version.
    #[must_use]
    pub fn with_pkg_version(mut self, pkg_version: impl Into<String>) -> Self {
        self.pkg_version = pkg_version.into();
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// | variable | field |
    /// |----------|-------|
    /// | `SNOWFLAKE_DATABASE` | `database` (required) |
    /// | `SNOWFLAKE_SCHEMA` | `schema` |
    /// | `SNOWFLAKE_WAREHOUSE` | `default_warehouse` |
    /// | `SNOWFLAKE_ROLE` | `role` |
    /// | `FVIEW_PKG_VERSION` | `pkg_version` |
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration fails [`Self::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_string)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(database) = lookup("SNOWFLAKE_DATABASE") {
            config.database = database;
        }
        if let Some(schema) = lookup("SNOWFLAKE_SCHEMA") {
            config.schema = schema;
        }
        config.default_warehouse = lookup("SNOWFLAKE_WAREHOUSE");
        config.role = lookup("SNOWFLAKE_ROLE");
        if let Some(version) = lookup("FVIEW_PKG_VERSION") {
            config.pkg_version = version;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if database or schema are missing or not valid
    /// identifiers, or if the package version is blank.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(Error::InvalidInput(
                "SNOWFLAKE_DATABASE is required (feature store database)".to_string(),
            ));
        }
        Identifier::new(self.database.as_str())?;
        Identifier::new(self.schema.as_str())?;
        if let Some(warehouse) = &self.default_warehouse {
            Identifier::new(warehouse.as_str())?;
        }
        if self.pkg_version.trim().is_empty() {
            return Err(Error::InvalidInput(
                "pkg_version cannot be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Qualifies `name` with the feature store database and schema.
    ///
    /// # Errors
    ///
    /// Returns an error if any part is not a valid identifier.
    pub fn qualify(&self, name: &Identifier) -> Result<QualifiedName> {
        Ok(QualifiedName::new(
            Identifier::new(self.database.as_str())?,
            Identifier::new(self.schema.as_str())?,
            name.clone(),
        ))
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
