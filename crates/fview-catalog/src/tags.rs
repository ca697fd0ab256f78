//! Tag applier: turns a reconcile plan into the statements that carry metadata.
//!
//! Tags are embedded in the create statement itself, so an object never
//! exists untagged. Alters change refresh attributes only; the tags written
//! at creation stay in place.

use fview_core::{FeatureStoreConfig, Identifier, QualifiedName};

use crate::ddl::{CreateDynamicTable, CreateView, Statement, TagAssignment};
use crate::error::Result;
use crate::metadata::EncodedMetadata;
use crate::reconciler::ReconcilePlan;
use crate::resolver::{ObjectKind, ResolvedFeatureView};

/// Builds tagged DDL for feature view objects.
#[derive(Debug, Clone, Copy)]
pub struct TagApplier<'a> {
    config: &'a FeatureStoreConfig,
}

impl<'a> TagApplier<'a> {
    /// Creates an applier qualifying tags with the configured schema.
    #[must_use]
    pub fn new(config: &'a FeatureStoreConfig) -> Self {
        Self { config }
    }

    /// Qualifies every encoded tag value.
    ///
    /// # Errors
    ///
    /// Returns an error if a tag name is not a valid identifier or a payload
    /// fails to serialize.
    pub fn assignments(&self, metadata: &EncodedMetadata) -> Result<Vec<TagAssignment>> {
        metadata
            .tag_values()?
            .into_iter()
            .map(|(tag, value)| {
                Ok(TagAssignment {
                    tag: self.config.qualify(&Identifier::new(tag)?)?,
                    value,
                })
            })
            .collect()
    }

    /// Returns the statements implementing `plan`, in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag assignments cannot be built.
    pub fn statements(
        &self,
        plan: &ReconcilePlan,
        view: &ResolvedFeatureView,
        metadata: &EncodedMetadata,
        name: &QualifiedName,
    ) -> Result<Vec<Statement>> {
        match plan {
            ReconcilePlan::Unchanged | ReconcilePlan::Deferred { .. } => Ok(Vec::new()),
            ReconcilePlan::Alter { changes, .. } => Ok(changes
                .iter()
                .map(|change| Statement::AlterDynamicTable {
                    name: name.clone(),
                    change: change.clone(),
                })
                .collect()),
            ReconcilePlan::Create { drop_existing, .. } => {
                let mut statements = Vec::with_capacity(2);
                if let Some(domain) = drop_existing {
                    statements.push(Statement::Drop {
                        domain: *domain,
                        name: name.clone(),
                    });
                }
                statements.push(self.create(view, metadata, name)?);
                Ok(statements)
            }
        }
    }

    fn create(
        &self,
        view: &ResolvedFeatureView,
        metadata: &EncodedMetadata,
        name: &QualifiedName,
    ) -> Result<Statement> {
        let tags = self.assignments(metadata)?;
        Ok(match &view.kind {
            ObjectKind::StaticView => Statement::CreateView(CreateView {
                name: name.clone(),
                query: view.query.clone(),
                tags,
                comment: view.description.clone(),
            }),
            ObjectKind::ManagedTable(spec) => Statement::CreateDynamicTable(CreateDynamicTable {
                name: name.clone(),
                query: view.query.clone(),
                target_lag: spec.target_lag.clone(),
                warehouse: spec.warehouse.clone(),
                refresh_mode: spec.mode,
                initialize: spec.initialize,
                tags,
                comment: view.description.clone(),
            }),
        })
    }
}
