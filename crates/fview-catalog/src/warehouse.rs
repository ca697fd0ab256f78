//! Warehouse interfaces consumed by the reconciliation engine.
//!
//! The engine needs three narrow capabilities, split so components only get
//! what they use:
//!
//! | Trait | Operations | Who uses it |
//! |-------|------------|-------------|
//! | [`Warehouse`] | describe an object, execute DDL | reconciler, bootstrap, registry writes |
//! | [`EntityTagStore`] | read entity registration tags | entity registry / validator |
//! | [`TagReferenceStore`] | list objects carrying a tag | metadata audit |
//!
//! Tags are the only persistence. DDL is the only writer; every read goes back
//! to the warehouse and nothing is cached between runs.

use std::sync::Mutex;

use async_trait::async_trait;
use fview_core::{Error, Identifier, QualifiedName, Result};

use crate::ddl::{ObjectDomain, Statement};

/// State of a physical object as observed at reconciliation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedState {
    /// No object with that name exists.
    Absent,
    /// A plain view exists.
    StaticView,
    /// A dynamic table exists.
    ManagedTable {
        /// Target lag as reported by the warehouse.
        target_lag: Option<String>,
        /// Refresh warehouse as reported by the warehouse.
        warehouse: Option<String>,
    },
}

impl ObservedState {
    /// Returns the domain of the existing object, if any.
    #[must_use]
    pub const fn domain(&self) -> Option<ObjectDomain> {
        match self {
            Self::Absent => None,
            Self::StaticView => Some(ObjectDomain::View),
            Self::ManagedTable { .. } => Some(ObjectDomain::DynamicTable),
        }
    }

    /// Returns a short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::StaticView => "static_view",
            Self::ManagedTable { .. } => "managed_table",
        }
    }
}

/// A tag definition as reported by `SHOW TAGS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDefinition {
    /// Stored tag name.
    pub name: String,
    /// The single allowed value, if the tag is restricted.
    pub allowed_value: Option<String>,
    /// Tag comment.
    pub comment: Option<String>,
}

/// An object carrying a given tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReference {
    /// Stored object name (unqualified).
    pub object: String,
    /// Object domain.
    pub domain: ObjectDomain,
    /// Tag value on that object.
    pub value: String,
}

/// Object description and DDL execution.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Describes the object named `name`.
    ///
    /// Returns `Ok(ObservedState::Absent)` only when the object genuinely does
    /// not exist; a failed describe is an `Err`.
    async fn describe(&self, name: &QualifiedName) -> Result<ObservedState>;

    /// Executes one DDL statement.
    async fn execute(&self, statement: &Statement) -> Result<()>;
}

/// Read access to tag definitions (entity registrations).
#[async_trait]
pub trait EntityTagStore: Send + Sync {
    /// Returns the tag named `name`, or `None` if it does not exist.
    async fn get_tag(&self, name: &QualifiedName) -> Result<Option<TagDefinition>>;

    /// Lists tags in `database.schema` whose stored name starts with `prefix`.
    async fn list_tags(
        &self,
        database: &Identifier,
        schema: &Identifier,
        prefix: &str,
    ) -> Result<Vec<TagDefinition>>;
}

/// Read access to tag assignments across objects.
#[async_trait]
pub trait TagReferenceStore: Send + Sync {
    /// Lists objects in the tag's schema that carry `tag`.
    async fn tag_references(&self, tag: &QualifiedName) -> Result<Vec<TagReference>>;
}

/// Warehouse wrapper that observes for real but only records DDL.
///
/// Tags created during the dry run are visible to later lookups in the same
/// run, so a project apply can be previewed end to end.
#[derive(Debug)]
pub struct DryRunWarehouse<W> {
    inner: W,
    planned: Mutex<Vec<Statement>>,
}

impl<W> DryRunWarehouse<W> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Returns the statements that would have been executed, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn planned(&self) -> Result<Vec<Statement>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Statement>>> {
        self.planned.lock().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    fn planned_tag(&self, name: &QualifiedName) -> Result<Option<TagDefinition>> {
        Ok(self.lock()?.iter().find_map(|stmt| match stmt {
            Statement::CreateTag {
                name: planned,
                allowed_value,
                comment,
            } if planned == name => Some(TagDefinition {
                name: planned.name().resolved(),
                allowed_value: allowed_value.clone(),
                comment: comment.clone(),
            }),
            _ => None,
        }))
    }
}

#[async_trait]
impl<W: Warehouse> Warehouse for DryRunWarehouse<W> {
    async fn describe(&self, name: &QualifiedName) -> Result<ObservedState> {
        self.inner.describe(name).await
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        tracing::info!(verb = statement.verb(), "dry run: statement not executed");
        self.lock()?.push(statement.clone());
        Ok(())
    }
}

#[async_trait]
impl<W: EntityTagStore> EntityTagStore for DryRunWarehouse<W> {
    async fn get_tag(&self, name: &QualifiedName) -> Result<Option<TagDefinition>> {
        match self.inner.get_tag(name).await? {
            Some(tag) => Ok(Some(tag)),
            None => self.planned_tag(name),
        }
    }

    async fn list_tags(
        &self,
        database: &Identifier,
        schema: &Identifier,
        prefix: &str,
    ) -> Result<Vec<TagDefinition>> {
        self.inner.list_tags(database, schema, prefix).await
    }
}

#[async_trait]
impl<W: TagReferenceStore> TagReferenceStore for DryRunWarehouse<W> {
    async fn tag_references(&self, tag: &QualifiedName) -> Result<Vec<TagReference>> {
        self.inner.tag_references(tag).await
    }
}
