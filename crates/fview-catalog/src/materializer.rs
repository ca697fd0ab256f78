//! Feature view materialization.
//!
//! [`FeatureStore`] runs one feature view through the whole pipeline:
//!
//! ```text
//! resolve ─► validate entities ─► encode metadata ─► describe ─► plan ─► execute
//! ```
//!
//! Everything before `execute` is side-effect free, so configuration,
//! reference and `fail`-policy drift errors never leave a partial change
//! behind. Statements run one at a time; a failure after at least one
//! success is reported as [`FeatureStoreError::PartialApply`] and nothing is
//! rolled back.

use fview_core::{FeatureStoreConfig, materialize_span};
use serde::Serialize;
use tracing::Instrument;

use crate::audit::{AuditReport, MetadataAuditor};
use crate::bootstrap;
use crate::ddl::Statement;
use crate::definition::{EntityDefinition, FeatureViewDefinition};
use crate::entity::{EntityRegistry, RegisteredEntity, RegistrationOutcome};
use crate::error::{FeatureStoreError, Result};
use crate::metadata::encode;
use crate::reconciler::{self, ReconcilePlan};
use crate::tags::TagApplier;
use crate::warehouse::{EntityTagStore, TagReferenceStore, Warehouse};

/// Options for one materialization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeOptions {
    /// Recreate the object even if it exists, ignoring the change policy.
    pub full_refresh: bool,
}

impl MaterializeOptions {
    /// Options forcing a full refresh.
    #[must_use]
    pub const fn full_refresh() -> Self {
        Self { full_refresh: true }
    }
}

/// What a materialization did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterializeAction {
    /// The object did not exist and was created.
    Created,
    /// The object was recreated.
    Replaced,
    /// Refresh attributes were altered in place.
    Altered,
    /// Nothing needed to change.
    Unchanged,
    /// Drift was found and left in place under the `continue` policy.
    DriftIgnored,
}

impl MaterializeAction {
    /// Returns the action as a lowercase string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Replaced => "replaced",
            Self::Altered => "altered",
            Self::Unchanged => "unchanged",
            Self::DriftIgnored => "drift_ignored",
        }
    }

    fn from_plan(plan: &ReconcilePlan) -> Self {
        match plan {
            ReconcilePlan::Create {
                reason: reconciler::CreateReason::Absent,
                ..
            } => Self::Created,
            ReconcilePlan::Create { .. } => Self::Replaced,
            ReconcilePlan::Alter { .. } => Self::Altered,
            ReconcilePlan::Unchanged => Self::Unchanged,
            ReconcilePlan::Deferred { .. } => Self::DriftIgnored,
        }
    }
}

/// Result of materializing one feature view.
#[derive(Debug, Clone, Serialize)]
pub struct MaterializeOutcome {
    /// Physical object name (`name$version`).
    pub physical_name: String,
    /// Fully qualified object name as rendered in SQL.
    pub object: String,
    /// What was done.
    pub action: MaterializeAction,
    /// SQL of the statements issued, in order.
    pub statements: Vec<String>,
    /// Non-fatal findings, such as drift left in place.
    pub warnings: Vec<String>,
}

/// Result of registering one entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRegistration {
    /// The entity as stored.
    pub entity: RegisteredEntity,
    /// Whether anything was written.
    pub outcome: RegistrationOutcome,
}

/// A feature store in one `database.schema`, backed by a warehouse.
#[derive(Debug, Clone)]
pub struct FeatureStore<W> {
    warehouse: W,
    config: FeatureStoreConfig,
}

impl<W> FeatureStore<W> {
    /// Creates a feature store over `warehouse`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(warehouse: W, config: FeatureStoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { warehouse, config })
    }

    /// Returns the underlying warehouse.
    #[must_use]
    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FeatureStoreConfig {
        &self.config
    }
}

impl<W> FeatureStore<W>
where
    W: Warehouse + EntityTagStore,
{
    /// Creates the schema and shared metadata tags if missing.
    ///
    /// # Errors
    ///
    /// Returns the first warehouse error.
    pub async fn bootstrap(&self) -> Result<Vec<Statement>> {
        bootstrap::bootstrap(&self.warehouse, &self.config).await
    }

    fn registry(&self) -> EntityRegistry<'_, W> {
        EntityRegistry::new(&self.warehouse, &self.config)
    }

    /// Registers an entity. Re-registering identical join keys is a no-op.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::register`].
    pub async fn register_entity(&self, def: &EntityDefinition) -> Result<EntityRegistration> {
        let (entity, outcome) = self
            .registry()
            .register(def)
            .instrument(materialize_span("register_entity", &def.name))
            .await?;
        Ok(EntityRegistration { entity, outcome })
    }

    /// Looks up an entity by name.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::lookup`].
    pub async fn get_entity(&self, name: &str) -> Result<Option<RegisteredEntity>> {
        self.registry().lookup(name).await
    }

    /// Lists registered entities, sorted by name.
    ///
    /// # Errors
    ///
    /// See [`EntityRegistry::list`].
    pub async fn list_entities(&self) -> Result<Vec<RegisteredEntity>> {
        self.registry().list().await
    }

    /// Materializes one feature view.
    ///
    /// # Errors
    ///
    /// - [`FeatureStoreError::Configuration`] for an invalid definition
    /// - [`FeatureStoreError::Reference`] for an unregistered entity
    /// - [`FeatureStoreError::Observation`] if the object cannot be described
    /// - [`FeatureStoreError::StateConflict`] for drift under the `fail` policy
    /// - [`FeatureStoreError::PartialApply`] if a statement fails after an
    ///   earlier one succeeded
    /// - the warehouse error itself if the first statement fails
    pub async fn materialize(
        &self,
        def: &FeatureViewDefinition,
        options: MaterializeOptions,
    ) -> Result<MaterializeOutcome> {
        self.materialize_inner(def, options)
            .instrument(materialize_span("materialize", &def.name))
            .await
    }

    async fn materialize_inner(
        &self,
        def: &FeatureViewDefinition,
        options: MaterializeOptions,
    ) -> Result<MaterializeOutcome> {
        let view = crate::resolver::resolve(def)?;
        let entities = self.registry().validate_references(&view.entities).await?;
        let metadata = encode(&view, &entities, &self.config.pkg_version)?;
        let name = self.config.qualify(&view.physical_name.to_identifier()?)?;

        let observed = reconciler::observe(&self.warehouse, &name).await?;
        let plan = reconciler::plan(&view, &observed, options.full_refresh)?;
        tracing::debug!(
            object = %name,
            observed = observed.label(),
            plan = plan.label(),
            policy = %view.change_policy,
            "planned reconciliation"
        );

        let mut warnings = Vec::new();
        if let ReconcilePlan::Deferred { drift } = &plan {
            tracing::warn!(
                object = %name,
                policy = %view.change_policy,
                drift = %drift,
                "drift detected; leaving object unchanged"
            );
            warnings.push(format!("drift on {}: {drift}", view.physical_name));
        }

        let statements = TagApplier::new(&self.config).statements(&plan, &view, &metadata, &name)?;
        self.execute_all(&view.physical_name.to_string(), &statements)
            .await?;

        let action = MaterializeAction::from_plan(&plan);
        tracing::info!(
            object = %name,
            action = ?action,
            statements = statements.len(),
            "materialized feature view"
        );

        Ok(MaterializeOutcome {
            physical_name: view.physical_name.to_string(),
            object: name.to_string(),
            action,
            statements: statements.iter().map(Statement::to_sql).collect(),
            warnings,
        })
    }

    async fn execute_all(&self, object: &str, statements: &[Statement]) -> Result<()> {
        let total = statements.len();
        for (applied, statement) in statements.iter().enumerate() {
            tracing::debug!(statement = %statement, "executing");
            if let Err(source) = self.warehouse.execute(statement).await {
                tracing::error!(
                    object,
                    verb = statement.verb(),
                    applied,
                    total,
                    error = %source,
                    "statement failed"
                );
                if applied == 0 {
                    return Err(source.into());
                }
                return Err(FeatureStoreError::PartialApply {
                    object: object.to_string(),
                    applied,
                    total,
                    source,
                });
            }
        }
        Ok(())
    }
}

impl<W> FeatureStore<W>
where
    W: Warehouse + TagReferenceStore,
{
    /// Audits the metadata of every feature view object in the schema.
    ///
    /// With `drop_legacy`, objects still carrying bare-string entities are
    /// dropped so they can be re-materialized.
    ///
    /// # Errors
    ///
    /// Returns an error if listing tag references fails. Individual drop
    /// failures are recorded in the report instead.
    pub async fn audit_metadata(&self, drop_legacy: bool) -> Result<AuditReport> {
        let auditor = MetadataAuditor::new(&self.warehouse, &self.config);
        let mut report = auditor.check().await?;
        if drop_legacy {
            auditor.drop_legacy(&mut report).await?;
        }
        Ok(report)
    }
}
