//! Entity registration and the entity reference validator.
//!
//! An entity is persisted as a tag named `SNOWML_FEATURE_STORE_ENTITY_<NAME>`
//! whose single allowed value is the comma-joined, upper-cased join keys. The
//! external feature-store client reads the same tag, so the encoding is fixed.

use fview_core::{FeatureStoreConfig, Identifier, QualifiedName};

use crate::ddl::Statement;
use crate::definition::EntityDefinition;
use crate::error::{FeatureStoreError, Result};
use crate::warehouse::{EntityTagStore, TagDefinition, Warehouse};

/// Prefix of entity registration tags.
pub const ENTITY_TAG_PREFIX: &str = "SNOWML_FEATURE_STORE_ENTITY_";

/// Separator between join keys in entity tag values.
pub const JOIN_KEY_SEPARATOR: char = ',';

/// An entity as registered in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RegisteredEntity {
    /// Upper-cased entity name.
    pub name: String,
    /// Upper-cased join keys, declaration order.
    pub join_keys: Vec<String>,
    /// Tag comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RegisteredEntity {
    /// Returns the registration tag name for this entity.
    #[must_use]
    pub fn tag_name(&self) -> String {
        entity_tag_name(&self.name)
    }

    /// Returns the tag value: comma-joined join keys.
    #[must_use]
    pub fn tag_value(&self) -> String {
        self.join_keys.join(",")
    }

    fn from_tag(name: String, tag: &TagDefinition) -> Result<Self> {
        let value = tag.allowed_value.as_deref().unwrap_or_default();
        let join_keys: Vec<String> = value
            .split(JOIN_KEY_SEPARATOR)
            .map(|k| k.trim().to_ascii_uppercase())
            .filter(|k| !k.is_empty())
            .collect();
        if join_keys.is_empty() {
            return Err(fview_core::Error::Serialization {
                message: format!("entity tag {} carries no join keys", tag.name),
            }
            .into());
        }
        Ok(Self {
            name,
            join_keys,
            description: tag.comment.clone().filter(|c| !c.is_empty()),
        })
    }
}

/// Whether a registration created the entity or found it already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    /// The registration tag was created.
    Registered,
    /// An identical registration already existed; nothing was written.
    AlreadyRegistered,
}

/// Returns the registration tag name for an entity name.
#[must_use]
pub fn entity_tag_name(entity: &str) -> String {
    format!("{ENTITY_TAG_PREFIX}{}", entity.trim().to_ascii_uppercase())
}

/// Normalizes and validates an entity definition.
///
/// # Errors
///
/// Returns [`FeatureStoreError::Configuration`] if the name is not a plain
/// identifier segment, or the join keys are empty, blank, duplicated, or
/// contain the key separator.
pub fn normalize_entity(def: &EntityDefinition) -> Result<RegisteredEntity> {
    let name = def.name.trim().to_ascii_uppercase();
    if name.is_empty() {
        return Err(FeatureStoreError::configuration("name", "entity name is required"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FeatureStoreError::configuration(
            "name",
            format!("entity name '{name}' may only contain letters, digits and '_'"),
        ));
    }

    if def.join_keys.is_empty() {
        return Err(FeatureStoreError::configuration(
            "join_keys",
            format!("entity '{name}' needs at least one join key"),
        ));
    }
    let mut join_keys: Vec<String> = Vec::with_capacity(def.join_keys.len());
    for raw in &def.join_keys {
        let key = raw.trim().to_ascii_uppercase();
        if key.is_empty() {
            return Err(FeatureStoreError::configuration("join_keys", "join keys cannot be blank"));
        }
        if key.contains(JOIN_KEY_SEPARATOR) {
            return Err(FeatureStoreError::configuration(
                "join_keys",
                format!("join key '{key}' cannot contain '{JOIN_KEY_SEPARATOR}'"),
            ));
        }
        if join_keys.contains(&key) {
            return Err(FeatureStoreError::configuration(
                "join_keys",
                format!("join key '{key}' is listed more than once"),
            ));
        }
        join_keys.push(key);
    }

    Ok(RegisteredEntity {
        name,
        join_keys,
        description: def.description.clone().filter(|d| !d.trim().is_empty()),
    })
}

/// Entity registry backed by tags.
#[derive(Debug)]
pub struct EntityRegistry<'a, W> {
    warehouse: &'a W,
    config: &'a FeatureStoreConfig,
}

impl<'a, W> EntityRegistry<'a, W>
where
    W: Warehouse + EntityTagStore,
{
    /// Creates a registry over `warehouse` in the configured schema.
    #[must_use]
    pub fn new(warehouse: &'a W, config: &'a FeatureStoreConfig) -> Self {
        Self { warehouse, config }
    }

    fn tag(&self, entity: &str) -> Result<QualifiedName> {
        let tag = Identifier::new(entity_tag_name(entity))?;
        Ok(self.config.qualify(&tag)?)
    }

    /// Registers an entity.
    ///
    /// Re-declaring an entity with the same join keys is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid definitions,
    /// [`FeatureStoreError::EntityConflict`] if the entity exists with other
    /// join keys, or a warehouse error.
    pub async fn register(
        &self,
        def: &EntityDefinition,
    ) -> Result<(RegisteredEntity, RegistrationOutcome)> {
        let entity = normalize_entity(def)?;

        if let Some(existing) = self.lookup(&entity.name).await? {
            if existing.join_keys != entity.join_keys {
                let declared = entity.tag_value();
                return Err(FeatureStoreError::EntityConflict {
                    entity: entity.name,
                    registered: existing.tag_value(),
                    declared,
                });
            }
            tracing::info!(entity = %existing.name, "entity already registered");
            return Ok((existing, RegistrationOutcome::AlreadyRegistered));
        }

        let statement = Statement::CreateTag {
            name: self.tag(&entity.name)?,
            allowed_value: Some(entity.tag_value()),
            comment: entity.description.clone(),
        };
        self.warehouse.execute(&statement).await?;
        tracing::info!(
            entity = %entity.name,
            join_keys = %entity.tag_value(),
            "registered entity"
        );
        Ok((entity, RegistrationOutcome::Registered))
    }

    /// Looks up an entity by name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails or the tag is malformed.
    pub async fn lookup(&self, name: &str) -> Result<Option<RegisteredEntity>> {
        let name = name.trim().to_ascii_uppercase();
        let tag = self.tag(&name)?;
        match self.warehouse.get_tag(&tag).await? {
            Some(definition) => Ok(Some(RegisteredEntity::from_tag(name, &definition)?)),
            None => Ok(None),
        }
    }

    /// Lists all registered entities, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails or a tag is malformed.
    pub async fn list(&self) -> Result<Vec<RegisteredEntity>> {
        let database = Identifier::new(self.config.database.as_str())?;
        let schema = Identifier::new(self.config.schema.as_str())?;
        let tags = self
            .warehouse
            .list_tags(&database, &schema, ENTITY_TAG_PREFIX)
            .await?;

        let mut entities = tags
            .iter()
            .filter_map(|tag| {
                tag.name
                    .strip_prefix(ENTITY_TAG_PREFIX)
                    .filter(|n| !n.is_empty())
                    .map(|n| RegisteredEntity::from_tag(n.to_string(), tag))
            })
            .collect::<Result<Vec<_>>>()?;
        entities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entities)
    }

    /// Confirms every referenced entity is registered and returns their records.
    ///
    /// Entities are checked in declaration order; the first missing one aborts.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureStoreError::Reference`] naming the missing entity, or
    /// a warehouse error if a lookup fails.
    pub async fn validate_references(&self, entities: &[String]) -> Result<Vec<RegisteredEntity>> {
        let mut registered = Vec::with_capacity(entities.len());
        for name in entities {
            match self.lookup(name).await? {
                Some(entity) => registered.push(entity),
                None => {
                    return Err(FeatureStoreError::Reference {
                        entity: name.trim().to_ascii_uppercase(),
                    });
                }
            }
        }
        Ok(registered)
    }
}
