//! Metadata encoder: the tag payloads attached to every feature view object.
//!
//! The external feature-store client parses these values, so the JSON shape is
//! a contract:
//!
//! ```text
//! SNOWML_FEATURE_STORE_OBJECT   {"type":"EXTERNAL_FEATURE_VIEW","pkg_version":"1.5.0"}
//! SNOWML_FEATURE_VIEW_METADATA  {"entities":[{"name":"CUSTOMER","joinKeys":["CUSTOMER_ID"]}],"timestamp_col":"updated_at"}
//! SNOWML_FEATURE_STORE_ENTITY_<NAME>  <comma-joined join keys>
//! ```
//!
//! Keys are emitted in field declaration order (`entities` before
//! `timestamp_col`, `name` before `joinKeys`). A missing timestamp column is
//! written as the string `"NULL"`, not JSON `null`.

use serde::{Deserialize, Serialize};

use crate::entity::RegisteredEntity;
use crate::error::{FeatureStoreError, Result};
use crate::resolver::ResolvedFeatureView;

/// Tag holding the object type and package version.
pub const FEATURE_STORE_OBJECT_TAG: &str = "SNOWML_FEATURE_STORE_OBJECT";

/// Tag holding the feature view's entities and timestamp column.
pub const FEATURE_VIEW_METADATA_TAG: &str = "SNOWML_FEATURE_VIEW_METADATA";

/// `timestamp_col` value written when no timestamp column is declared.
pub const TIMESTAMP_COL_NONE: &str = "NULL";

/// Object type recorded in [`FEATURE_STORE_OBJECT_TAG`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureStoreObjectType {
    /// A dynamic table the warehouse refreshes.
    #[serde(rename = "MANAGED_FEATURE_VIEW")]
    ManagedFeatureView,
    /// A plain view over user-managed data.
    #[serde(rename = "EXTERNAL_FEATURE_VIEW")]
    ExternalFeatureView,
}

/// Payload of [`FEATURE_STORE_OBJECT_TAG`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTypeInfo {
    /// Object type.
    #[serde(rename = "type")]
    pub object_type: FeatureStoreObjectType,
    /// Package version.
    pub pkg_version: String,
}

/// One entity in [`FeatureViewMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Upper-cased entity name.
    pub name: String,
    /// Upper-cased join keys.
    #[serde(rename = "joinKeys")]
    pub join_keys: Vec<String>,
}

/// Payload of [`FEATURE_VIEW_METADATA_TAG`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureViewMetadata {
    /// Entities in declaration order.
    pub entities: Vec<EntityMetadata>,
    /// Timestamp column, or [`TIMESTAMP_COL_NONE`].
    pub timestamp_col: String,
}

/// All tag values for one feature view object, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMetadata {
    /// Object type payload.
    pub object_info: ObjectTypeInfo,
    /// Feature view payload.
    pub metadata: FeatureViewMetadata,
    /// `(entity tag name, join keys)` pairs in declaration order.
    pub entity_tags: Vec<(String, String)>,
}

impl EncodedMetadata {
    /// Returns `(tag name, value)` pairs: object tag, metadata tag, then one
    /// tag per entity.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureStoreError::Metadata`] if a payload fails to serialize.
    pub fn tag_values(&self) -> Result<Vec<(String, String)>> {
        let mut values = Vec::with_capacity(2 + self.entity_tags.len());
        values.push((
            FEATURE_STORE_OBJECT_TAG.to_string(),
            serde_json::to_string(&self.object_info)?,
        ));
        values.push((
            FEATURE_VIEW_METADATA_TAG.to_string(),
            serde_json::to_string(&self.metadata)?,
        ));
        values.extend(self.entity_tags.iter().cloned());
        Ok(values)
    }
}

/// Encodes the tag payloads for `view`.
///
/// `entities` must hold the registered record of every entity the view
/// references; they are emitted in the view's declaration order.
///
/// # Errors
///
/// Returns [`FeatureStoreError::Reference`] if a referenced entity is missing
/// from `entities`, or [`FeatureStoreError::Metadata`] for a blank package
/// version.
pub fn encode(
    view: &ResolvedFeatureView,
    entities: &[RegisteredEntity],
    pkg_version: &str,
) -> Result<EncodedMetadata> {
    if pkg_version.trim().is_empty() {
        return Err(FeatureStoreError::Metadata {
            message: "package version is blank".to_string(),
        });
    }

    let mut ordered = Vec::with_capacity(view.entities.len());
    for name in &view.entities {
        let entity = entities
            .iter()
            .find(|e| e.name == *name)
            .ok_or_else(|| FeatureStoreError::Reference {
                entity: name.clone(),
            })?;
        ordered.push(entity);
    }

    let object_type = if view.is_managed() {
        FeatureStoreObjectType::ManagedFeatureView
    } else {
        FeatureStoreObjectType::ExternalFeatureView
    };

    Ok(EncodedMetadata {
        object_info: ObjectTypeInfo {
            object_type,
            pkg_version: pkg_version.trim().to_string(),
        },
        metadata: FeatureViewMetadata {
            entities: ordered
                .iter()
                .map(|e| EntityMetadata {
                    name: e.name.clone(),
                    join_keys: e.join_keys.clone(),
                })
                .collect(),
            timestamp_col: view
                .timestamp_col
                .clone()
                .unwrap_or_else(|| TIMESTAMP_COL_NONE.to_string()),
        },
        entity_tags: ordered.iter().map(|e| (e.tag_name(), e.tag_value())).collect(),
    })
}
