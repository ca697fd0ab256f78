//! Config resolver: validates a declared feature view and derives its physical identity.
//!
//! Resolution is side-effect free. Every check that can fail without talking
//! to the warehouse happens here, so a rejected definition never touches an
//! object.

use std::collections::HashSet;
use std::fmt;

use fview_core::Identifier;

use crate::definition::{ChangePolicy, FeatureViewDefinition, InitializeMode, RefreshMode};
use crate::error::{FeatureStoreError, Result};
use crate::target_lag::TargetLag;

/// Backing object name: `<name>$<version with '.' replaced by '_'>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalObjectName(String);

impl PhysicalObjectName {
    /// Derives the physical name from a feature view name and version.
    #[must_use]
    pub fn new(name: &str, version: &str) -> Self {
        Self(format!("{name}${}", version.replace('.', "_")))
    }

    /// Returns the name as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name as a warehouse identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid identifier.
    pub fn to_identifier(&self) -> fview_core::Result<Identifier> {
        Identifier::new(self.0.as_str())
    }
}

impl fmt::Display for PhysicalObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settings of a managed (auto-refreshing) feature view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedSpec {
    /// Target lag.
    pub target_lag: TargetLag,
    /// Refresh warehouse.
    pub warehouse: Identifier,
    /// Refresh mode.
    pub mode: RefreshMode,
    /// Initialization behaviour.
    pub initialize: InitializeMode,
}

/// The object kind a feature view materializes as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// Plain view, rebuilt on every run.
    StaticView,
    /// Dynamic table kept fresh by the warehouse.
    ManagedTable(ManagedSpec),
}

impl ObjectKind {
    /// Returns true for managed tables.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::ManagedTable(_))
    }
}

/// A validated, normalized feature view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFeatureView {
    /// Declared name.
    pub name: String,
    /// Declared version.
    pub version: String,
    /// Derived physical object name.
    pub physical_name: PhysicalObjectName,
    /// Referenced entities, upper-cased, declaration order.
    pub entities: Vec<String>,
    /// Declared timestamp column, verbatim.
    pub timestamp_col: Option<String>,
    /// Object kind.
    pub kind: ObjectKind,
    /// Drift policy.
    pub change_policy: ChangePolicy,
    /// Object comment.
    pub description: Option<String>,
    /// SELECT the object is built from.
    pub query: String,
}

impl ResolvedFeatureView {
    /// Returns true if the feature view is a managed table.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.kind.is_managed()
    }
}

/// Validates `def` and derives its physical identity.
///
/// # Errors
///
/// Returns [`FeatureStoreError::Configuration`] naming the first offending field.
pub fn resolve(def: &FeatureViewDefinition) -> Result<ResolvedFeatureView> {
    let name = def.name.trim();
    if name.is_empty() {
        return Err(FeatureStoreError::configuration("name", "feature view name is required"));
    }

    let version = def
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FeatureStoreError::configuration("version", "feature view version is required"))?;
    validate_version(version)?;

    let physical_name = PhysicalObjectName::new(name, version);
    physical_name
        .to_identifier()
        .map_err(|e| FeatureStoreError::configuration("name", e.to_string()))?;

    let entities = resolve_entities(&def.entities)?;

    if def.query.trim().is_empty() {
        return Err(FeatureStoreError::configuration("query", "feature view query is required"));
    }

    let timestamp_col = match def.timestamp_col.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(col) => Some(col.to_string()),
    };

    let kind = match &def.refresh {
        None => ObjectKind::StaticView,
        Some(refresh) => {
            let frequency = refresh
                .frequency
                .as_deref()
                .filter(|f| !f.trim().is_empty())
                .ok_or_else(|| {
                    FeatureStoreError::configuration(
                        "refresh.frequency",
                        "required when refresh is set",
                    )
                })?;
            let target_lag = TargetLag::parse(frequency)
                .map_err(|e| FeatureStoreError::configuration("refresh.frequency", e.to_string()))?;
            let warehouse = refresh
                .warehouse
                .as_deref()
                .filter(|w| !w.trim().is_empty())
                .ok_or_else(|| {
                    FeatureStoreError::configuration(
                        "refresh.warehouse",
                        "required when refresh is set",
                    )
                })?;
            let warehouse = Identifier::new(warehouse.trim())
                .map_err(|e| FeatureStoreError::configuration("refresh.warehouse", e.to_string()))?;

            ObjectKind::ManagedTable(ManagedSpec {
                target_lag,
                warehouse,
                mode: refresh.mode,
                initialize: refresh.initialize,
            })
        }
    };

    Ok(ResolvedFeatureView {
        name: name.to_string(),
        version: version.to_string(),
        physical_name,
        entities,
        timestamp_col,
        kind,
        change_policy: def.change_policy,
        description: def.description.clone().filter(|d| !d.trim().is_empty()),
        query: def.query.trim().to_string(),
    })
}

fn validate_version(version: &str) -> Result<()> {
    let valid = version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        && !version.starts_with(['.', '-'])
        && !version.ends_with(['.', '-'])
        && !version.contains("..");
    if valid {
        Ok(())
    } else {
        Err(FeatureStoreError::configuration(
            "version",
            format!("'{version}' must be dotted alphanumeric segments, e.g. '1.0'"),
        ))
    }
}

fn resolve_entities(declared: &[String]) -> Result<Vec<String>> {
    if declared.is_empty() {
        return Err(FeatureStoreError::configuration(
            "entities",
            "at least one entity is required",
        ));
    }

    let mut seen = HashSet::new();
    let mut entities = Vec::with_capacity(declared.len());
    for raw in declared {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(FeatureStoreError::configuration("entities", "entity names cannot be blank"));
        }
        if !seen.insert(upper.clone()) {
            return Err(FeatureStoreError::configuration(
                "entities",
                format!("entity '{upper}' is referenced more than once"),
            ));
        }
        entities.push(upper);
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::RefreshSpec;

    fn static_def() -> FeatureViewDefinition {
        FeatureViewDefinition::new(
            "customer_profile",
            "1.0",
            &["customer"],
            "SELECT customer_id, updated_at FROM customers",
        )
    }

    fn field_of(err: FeatureStoreError) -> String {
        match err {
            FeatureStoreError::Configuration { field, .. } => field,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn derives_physical_name_from_version() {
        let resolved = resolve(&static_def()).expect("resolve");
        assert_eq!(resolved.physical_name.as_str(), "customer_profile$1_0");
        assert_eq!(resolved.entities, vec!["CUSTOMER"]);
        assert_eq!(resolved.kind, ObjectKind::StaticView);
        assert!(!resolved.is_managed());
    }

    #[test]
    fn refresh_selects_managed_kind() {
        let def = static_def().with_refresh(RefreshSpec::new("5 minutes", "admin_wh"));
        let resolved = resolve(&def).expect("resolve");

        let ObjectKind::ManagedTable(spec) = &resolved.kind else {
            panic!("expected managed table");
        };
        assert_eq!(spec.target_lag.seconds(), Some(300));
        assert_eq!(spec.warehouse.resolved(), "ADMIN_WH");
        assert_eq!(spec.mode, RefreshMode::Auto);
        assert_eq!(spec.initialize, InitializeMode::OnCreate);
    }

    #[test]
    fn missing_fields_are_cited() {
        let mut def = static_def();
        def.entities.clear();
        assert_eq!(field_of(resolve(&def).unwrap_err()), "entities");

        let mut def = static_def();
        def.version = None;
        assert_eq!(field_of(resolve(&def).unwrap_err()), "version");

        let mut def = static_def();
        def.query = "  ".into();
        assert_eq!(field_of(resolve(&def).unwrap_err()), "query");

        let def = static_def().with_refresh(RefreshSpec {
            frequency: Some("5 minutes".into()),
            ..RefreshSpec::default()
        });
        assert_eq!(field_of(resolve(&def).unwrap_err()), "refresh.warehouse");

        let def = static_def().with_refresh(RefreshSpec {
            warehouse: Some("WH".into()),
            ..RefreshSpec::default()
        });
        assert_eq!(field_of(resolve(&def).unwrap_err()), "refresh.frequency");
    }

    #[test]
    fn rejects_bad_versions_and_duplicate_entities() {
        let mut def = static_def();
        def.version = Some("1.0; DROP".into());
        assert_eq!(field_of(resolve(&def).unwrap_err()), "version");

        let mut def = static_def();
        def.version = Some("1..0".into());
        assert_eq!(field_of(resolve(&def).unwrap_err()), "version");

        let mut def = static_def();
        def.entities = vec!["customer".into(), "CUSTOMER".into()];
        assert_eq!(field_of(resolve(&def).unwrap_err()), "entities");
    }

    #[test]
    fn pre_release_versions_keep_their_hyphen() {
        let mut def = static_def();
        def.version = Some("1.0-rc1".into());
        let resolved = resolve(&def).expect("resolve");
        assert_eq!(resolved.physical_name.as_str(), "customer_profile$1_0-rc1");

        def.version = Some("-1.0".into());
        assert_eq!(field_of(resolve(&def).unwrap_err()), "version");
    }

    #[test]
    fn blank_timestamp_is_treated_as_absent() {
        let def = static_def().with_timestamp_col("  ");
        assert_eq!(resolve(&def).expect("resolve").timestamp_col, None);
    }
}
