//! Object reconciler: decides what DDL a feature view needs.
//!
//! The reconciler compares the resolved definition against what the
//! warehouse reports and produces a [`ReconcilePlan`]. Planning is pure; the
//! only I/O in this module is [`observe`].
//!
//! | Desired | Observed | Outcome |
//! |---------|----------|---------|
//! | static view | anything | create or replace (dropping a dynamic table first) |
//! | managed table | absent | create |
//! | managed table | any, full refresh forced | create or replace (dropping a view first) |
//! | managed table | static view | kind drift, resolved by change policy |
//! | managed table | managed table | compare lag and warehouse, resolved by change policy |

use std::fmt;

use fview_core::QualifiedName;
use serde::Serialize;

use crate::ddl::{AlterChange, ObjectDomain};
use crate::definition::ChangePolicy;
use crate::error::{FeatureStoreError, Result};
use crate::resolver::{ManagedSpec, ObjectKind, ResolvedFeatureView};
use crate::warehouse::{ObservedState, Warehouse};

// ============================================================================
// Drift
// ============================================================================

/// One attribute whose observed value differs from the declared one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDrift {
    /// Attribute name: `target_lag`, `warehouse` or `kind`.
    pub attribute: &'static str,
    /// Value reported by the warehouse.
    pub observed: String,
    /// Declared value.
    pub declared: String,
}

/// All drifted attributes of one object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Drift {
    /// Drifted attributes, lag before warehouse.
    pub items: Vec<AttributeDrift>,
}

impl Drift {
    /// Returns true if nothing drifted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn push(&mut self, attribute: &'static str, observed: impl Into<String>, declared: impl Into<String>) {
        self.items.push(AttributeDrift {
            attribute,
            observed: observed.into(),
            declared: declared.into(),
        });
    }
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(
                f,
                "{} observed '{}', declared '{}'",
                item.attribute, item.observed, item.declared
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Plan
// ============================================================================

/// Why an object is (re)created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateReason {
    /// Nothing existed.
    Absent,
    /// Static views are rebuilt on every run.
    StaticRebuild,
    /// A full refresh was forced.
    FullRefresh,
    /// The observed object is of the other kind and policy allows replacing it.
    KindChange,
}

/// What the reconciler decided for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilePlan {
    /// Create or replace the object, optionally dropping an object of the
    /// other kind first.
    Create {
        /// Why.
        reason: CreateReason,
        /// Domain of the object to drop before creating.
        drop_existing: Option<ObjectDomain>,
    },
    /// Alter attributes of the existing dynamic table, in order.
    Alter {
        /// Changes to apply.
        changes: Vec<AlterChange>,
        /// What drifted.
        drift: Drift,
    },
    /// Declared and observed state agree.
    Unchanged,
    /// Drift detected under the `continue` policy; nothing is issued.
    Deferred {
        /// What drifted.
        drift: Drift,
    },
}

impl ReconcilePlan {
    /// Returns a short label for logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Create {
                reason: CreateReason::Absent,
                ..
            } => "create",
            Self::Create { .. } => "replace",
            Self::Alter { .. } => "alter",
            Self::Unchanged => "unchanged",
            Self::Deferred { .. } => "drift_ignored",
        }
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Describes `name`, treating a failed describe as an observation error.
///
/// A describe failure is never taken to mean the object is absent.
///
/// # Errors
///
/// Returns [`FeatureStoreError::Observation`] if the describe call fails.
pub async fn observe<W: Warehouse + ?Sized>(
    warehouse: &W,
    name: &QualifiedName,
) -> Result<ObservedState> {
    warehouse
        .describe(name)
        .await
        .map_err(|source| FeatureStoreError::Observation {
            object: name.to_string(),
            source,
        })
}

/// Plans the DDL for `view` given what the warehouse reported.
///
/// # Errors
///
/// Returns [`FeatureStoreError::StateConflict`] when drift is found and the
/// change policy is `fail`.
pub fn plan(
    view: &ResolvedFeatureView,
    observed: &ObservedState,
    full_refresh: bool,
) -> Result<ReconcilePlan> {
    let spec = match &view.kind {
        ObjectKind::StaticView => return Ok(plan_static(observed)),
        ObjectKind::ManagedTable(spec) => spec,
    };

    match observed {
        ObservedState::Absent => Ok(ReconcilePlan::Create {
            reason: CreateReason::Absent,
            drop_existing: None,
        }),
        ObservedState::StaticView if full_refresh => Ok(ReconcilePlan::Create {
            reason: CreateReason::FullRefresh,
            drop_existing: Some(ObjectDomain::View),
        }),
        ObservedState::ManagedTable { .. } if full_refresh => Ok(ReconcilePlan::Create {
            reason: CreateReason::FullRefresh,
            drop_existing: None,
        }),
        ObservedState::StaticView => {
            let mut drift = Drift::default();
            drift.push("kind", "VIEW", "DYNAMIC TABLE");
            resolve_drift(view, drift, |_| ReconcilePlan::Create {
                reason: CreateReason::KindChange,
                drop_existing: Some(ObjectDomain::View),
            })
        }
        ObservedState::ManagedTable {
            target_lag,
            warehouse,
        } => {
            let (drift, changes) = managed_drift(spec, target_lag.as_deref(), warehouse.as_deref());
            if drift.is_empty() {
                return Ok(ReconcilePlan::Unchanged);
            }
            resolve_drift(view, drift, |drift| ReconcilePlan::Alter { changes, drift })
        }
    }
}

fn plan_static(observed: &ObservedState) -> ReconcilePlan {
    match observed {
        ObservedState::Absent => ReconcilePlan::Create {
            reason: CreateReason::Absent,
            drop_existing: None,
        },
        ObservedState::StaticView => ReconcilePlan::Create {
            reason: CreateReason::StaticRebuild,
            drop_existing: None,
        },
        ObservedState::ManagedTable { .. } => ReconcilePlan::Create {
            reason: CreateReason::StaticRebuild,
            drop_existing: Some(ObjectDomain::DynamicTable),
        },
    }
}

/// Compares declared lag and warehouse against the observed values.
///
/// An attribute the warehouse did not report counts as drifted.
fn managed_drift(
    spec: &ManagedSpec,
    observed_lag: Option<&str>,
    observed_warehouse: Option<&str>,
) -> (Drift, Vec<AlterChange>) {
    let mut drift = Drift::default();
    let mut changes = Vec::new();

    if !observed_lag.is_some_and(|lag| spec.target_lag.matches_observed(lag)) {
        drift.push(
            "target_lag",
            observed_lag.unwrap_or("<unknown>"),
            spec.target_lag.as_str(),
        );
        changes.push(AlterChange::TargetLag(spec.target_lag.clone()));
    }

    if !observed_warehouse.is_some_and(|wh| spec.warehouse.matches_stored(wh)) {
        drift.push(
            "warehouse",
            observed_warehouse.unwrap_or("<unknown>"),
            spec.warehouse.resolved(),
        );
        changes.push(AlterChange::Warehouse(spec.warehouse.clone()));
    }

    (drift, changes)
}

fn resolve_drift(
    view: &ResolvedFeatureView,
    drift: Drift,
    apply: impl FnOnce(Drift) -> ReconcilePlan,
) -> Result<ReconcilePlan> {
    match view.change_policy {
        ChangePolicy::Apply => Ok(apply(drift)),
        ChangePolicy::Continue => Ok(ReconcilePlan::Deferred { drift }),
        ChangePolicy::Fail => Err(FeatureStoreError::StateConflict {
            object: view.physical_name.to_string(),
            drift: drift.to_string(),
        }),
    }
}
