//! Metadata audit for feature view objects.
//!
//! Earlier writers stored `entities` as bare strings instead of
//! `{name, joinKeys}` objects. Consumers that read `joinKeys` break on those
//! objects, so the audit finds them and can drop them for re-materialization.

use chrono::{DateTime, Utc};
use fview_core::{FeatureStoreConfig, Identifier};
use serde::Serialize;
use serde_json::Value;

use crate::ddl::{ObjectDomain, Statement};
use crate::error::Result;
use crate::metadata::FEATURE_VIEW_METADATA_TAG;
use crate::warehouse::{TagReferenceStore, Warehouse};

// ============================================================================
// Classification
// ============================================================================

/// Shape of a `SNOWML_FEATURE_VIEW_METADATA` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum MetadataFormat {
    /// Entities are `{name, joinKeys}` objects.
    Current,
    /// Entities are bare strings.
    Legacy,
    /// Anything else.
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

/// Classifies a metadata tag value.
#[must_use]
pub fn classify_metadata(value: &str) -> MetadataFormat {
    match classify(value) {
        Ok(format) => format,
        Err(reason) => MetadataFormat::Invalid { reason },
    }
}

/// Checks that `value` is in the current metadata format.
///
/// # Errors
///
/// Returns a description of the problem if the value is legacy or invalid.
pub fn check_metadata_contract(value: &str) -> std::result::Result<(), String> {
    match classify_metadata(value) {
        MetadataFormat::Current => Ok(()),
        MetadataFormat::Legacy => Err("entities are bare strings".to_string()),
        MetadataFormat::Invalid { reason } => Err(reason),
    }
}

fn classify(value: &str) -> std::result::Result<MetadataFormat, String> {
    let parsed: Value = serde_json::from_str(value).map_err(|e| format!("not valid JSON: {e}"))?;
    let object = parsed.as_object().ok_or("metadata is not a JSON object")?;

    // A bare-string first entity is legacy whatever else the value holds.
    let entities = object
        .get("entities")
        .and_then(Value::as_array)
        .ok_or("entities is missing or not an array")?;
    match entities.first() {
        None => return Err("entities is empty".to_string()),
        Some(Value::String(_)) => return Ok(MetadataFormat::Legacy),
        Some(_) => {}
    }

    match object.get("timestamp_col") {
        Some(Value::String(_)) => {}
        Some(_) => return Err("timestamp_col is not a string".to_string()),
        None => return Err("timestamp_col is missing".to_string()),
    }

    for entity in entities {
        let name = entity
            .get("name")
            .and_then(Value::as_str)
            .ok_or("entity without a string name")?;
        if name.is_empty() || name != name.to_ascii_uppercase() {
            return Err(format!("entity name '{name}' is not upper-case"));
        }
        let keys = entity
            .get("joinKeys")
            .and_then(Value::as_array)
            .ok_or_else(|| format!("entity '{name}' has no joinKeys array"))?;
        if keys.is_empty() || !keys.iter().all(|k| k.as_str().is_some_and(|k| !k.is_empty())) {
            return Err(format!("entity '{name}' has empty or non-string joinKeys"));
        }
    }
    Ok(MetadataFormat::Current)
}

// ============================================================================
// Report
// ============================================================================

/// One audited object.
#[derive(Debug, Clone, Serialize)]
pub struct AuditFinding {
    /// Stored object name.
    pub object: String,
    /// Object domain.
    pub domain: ObjectDomain,
    /// Classification.
    #[serde(flatten)]
    pub format: MetadataFormat,
    /// The raw tag value.
    pub metadata: String,
}

/// Result of dropping one legacy object.
#[derive(Debug, Clone, Serialize)]
pub struct DropResult {
    /// Stored object name.
    pub object: String,
    /// Object domain.
    pub domain: ObjectDomain,
    /// Failure, if the drop did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DropResult {
    /// Returns true if the object was dropped.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Report from a metadata audit.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// When the audit ran.
    pub checked_at: DateTime<Utc>,
    /// Every object carrying the metadata tag.
    pub findings: Vec<AuditFinding>,
    /// Drops attempted, if cleanup was requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<DropResult>,
}

impl AuditReport {
    /// Returns true if any object is legacy or invalid.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.format != MetadataFormat::Current)
    }

    /// Returns the legacy findings.
    #[must_use]
    pub fn legacy(&self) -> Vec<&AuditFinding> {
        self.findings
            .iter()
            .filter(|f| f.format == MetadataFormat::Legacy)
            .collect()
    }

    /// Returns the invalid findings.
    #[must_use]
    pub fn invalid(&self) -> Vec<&AuditFinding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.format, MetadataFormat::Invalid { .. }))
            .collect()
    }
}

// ============================================================================
// Auditor
// ============================================================================

/// Audits and cleans up feature view metadata in one schema.
#[derive(Debug)]
pub struct MetadataAuditor<'a, W> {
    warehouse: &'a W,
    config: &'a FeatureStoreConfig,
}

impl<'a, W> MetadataAuditor<'a, W>
where
    W: Warehouse + TagReferenceStore,
{
    /// Creates an auditor for the configured schema.
    #[must_use]
    pub fn new(warehouse: &'a W, config: &'a FeatureStoreConfig) -> Self {
        Self { warehouse, config }
    }

    /// Classifies every object carrying the metadata tag.
    ///
    /// # Errors
    ///
    /// Returns an error if listing the tag references fails.
    pub async fn check(&self) -> Result<AuditReport> {
        let tag = self
            .config
            .qualify(&Identifier::new(FEATURE_VIEW_METADATA_TAG)?)?;
        tracing::info!(tag = %tag, "starting metadata audit");

        let mut references = self.warehouse.tag_references(&tag).await?;
        references.sort_by(|a, b| a.object.cmp(&b.object));

        let findings: Vec<AuditFinding> = references
            .into_iter()
            .map(|r| AuditFinding {
                format: classify_metadata(&r.value),
                object: r.object,
                domain: r.domain,
                metadata: r.value,
            })
            .collect();

        let report = AuditReport {
            checked_at: Utc::now(),
            findings,
            dropped: Vec::new(),
        };
        tracing::info!(
            objects = report.findings.len(),
            legacy = report.legacy().len(),
            invalid = report.invalid().len(),
            "metadata audit complete"
        );
        Ok(report)
    }

    /// Drops every legacy object in `report`, recording each outcome.
    ///
    /// A failed drop is recorded and the remaining objects are still attempted.
    ///
    /// # Errors
    ///
    /// Returns an error only if an object name cannot be qualified.
    pub async fn drop_legacy(&self, report: &mut AuditReport) -> Result<()> {
        let targets: Vec<(String, ObjectDomain)> = report
            .legacy()
            .into_iter()
            .map(|f| (f.object.clone(), f.domain))
            .collect();

        for (object, domain) in targets {
            let statement = Statement::Drop {
                domain,
                name: self.config.qualify(&Identifier::from_stored(object.as_str())?)?,
            };
            let error = match self.warehouse.execute(&statement).await {
                Ok(()) => {
                    tracing::info!(object = %object, domain = %domain, "dropped legacy object");
                    None
                }
                Err(e) => {
                    tracing::warn!(object = %object, error = %e, "failed to drop legacy object");
                    Some(e.to_string())
                }
            };
            report.dropped.push(DropResult {
                object,
                domain,
                error,
            });
        }
        Ok(())
    }
}
