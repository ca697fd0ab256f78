//! Integration tests for feature view reconciliation.
//!
//! These tests drive [`FeatureStore::materialize`] against a recording
//! in-memory warehouse and verify which DDL is issued for every combination of
//! declared kind, observed state and change policy.
//!
//! # Invariants Tested
//!
//! 1. **No DDL before validation**: configuration, reference, observation and
//!    `fail`-policy errors leave the warehouse untouched
//! 2. **Alter, not replace**: drift on an existing managed table under `apply`
//!    issues only `ALTER` statements
//! 3. **No rollback**: a failure after a successful statement leaves the first
//!    change in place and reports partial progress

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use fview_catalog::definition::{ChangePolicy, FeatureViewDefinition, RefreshSpec};
use fview_catalog::error::FeatureStoreError;
use fview_catalog::materializer::{FeatureStore, MaterializeAction, MaterializeOptions};
use fview_catalog::memory::MemoryWarehouse;
use fview_catalog::warehouse::DryRunWarehouse;
use fview_catalog::ddl::ObjectDomain;
use fview_test_utils::{
    TestContext, WarehouseOp, assert_executed_verbs, assert_metadata_current, assert_no_ddl,
    assert_state_conflict, customer_activity, customer_entity, customer_profile, init_test_logging,
    test_config,
};

const ACTIVITY: &str = "customer_activity$1_0";
const PROFILE: &str = "customer_profile$1_0";

async fn with_activity(frequency: &str) -> TestContext {
    let ctx = TestContext::with_customer().await;
    ctx.store
        .materialize(
            &customer_activity(frequency, ChangePolicy::Apply),
            MaterializeOptions::default(),
        )
        .await
        .unwrap();
    ctx.warehouse.clear_operations();
    ctx
}

// ============================================================================
// Static views
// ============================================================================

#[tokio::test]
async fn static_view_is_created_with_tags() {
    init_test_logging();
    let ctx = TestContext::with_customer().await;

    let outcome = ctx
        .store
        .materialize(&customer_profile(), MaterializeOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.physical_name, PROFILE);
    assert_eq!(outcome.action, MaterializeAction::Created);
    assert!(outcome.warnings.is_empty());
    assert_executed_verbs(&ctx.warehouse, &["create_view"]);

    let object = ctx.warehouse.object(&ctx.qualified(PROFILE)).unwrap();
    assert_eq!(object.domain, ObjectDomain::View);
    assert_eq!(object.comment, None);
    assert_metadata_current(&object);
}

#[tokio::test]
async fn static_view_rerun_yields_identical_tags() {
    let ctx = TestContext::with_customer().await;

    ctx.store
        .materialize(&customer_profile(), MaterializeOptions::default())
        .await
        .unwrap();
    let first = ctx.warehouse.object(&ctx.qualified(PROFILE)).unwrap();

    let outcome = ctx
        .store
        .materialize(&customer_profile(), MaterializeOptions::default())
        .await
        .unwrap();
    let second = ctx.warehouse.object(&ctx.qualified(PROFILE)).unwrap();

    assert_eq!(outcome.action, MaterializeAction::Replaced);
    assert_eq!(first.tags, second.tags);
    assert!(second.generation > first.generation, "static views are rebuilt");
}

#[tokio::test]
async fn static_definition_replaces_managed_table() {
    let ctx = with_activity("5 minutes").await;

    let mut def = customer_activity("5 minutes", ChangePolicy::Fail);
    def.refresh = None;
    let outcome = ctx
        .store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::Replaced);
    assert_executed_verbs(&ctx.warehouse, &["drop", "create_view"]);
    assert_eq!(
        ctx.warehouse.executed_sql()[0],
        "DROP DYNAMIC TABLE IF EXISTS ML.FEATURE_STORE.customer_activity$1_0"
    );
}

#[tokio::test]
async fn description_becomes_object_comment() {
    let ctx = TestContext::with_customer().await;
    let def = customer_profile().with_description("customer's profile");

    let outcome = ctx
        .store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap();

    assert!(outcome.statements[0].contains("COMMENT = 'customer''s profile'"));
    let object = ctx.warehouse.object(&ctx.qualified(PROFILE)).unwrap();
    assert_eq!(object.comment.as_deref(), Some("customer's profile"));
}

// ============================================================================
// Managed tables: drift policies
// ============================================================================

#[tokio::test]
async fn managed_table_created_with_refresh_settings() {
    let ctx = TestContext::with_customer().await;

    let outcome = ctx
        .store
        .materialize(
            &customer_activity("5 minutes", ChangePolicy::Apply),
            MaterializeOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::Created);
    assert_executed_verbs(&ctx.warehouse, &["create_dynamic_table"]);
    let object = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(object.domain, ObjectDomain::DynamicTable);
    assert_eq!(object.target_lag.as_deref(), Some("5 minutes"));
    assert_eq!(object.warehouse.as_deref(), Some("ADMIN_WH"));
    assert_metadata_current(&object);
}

#[tokio::test]
async fn apply_policy_alters_lag_in_place() {
    let ctx = with_activity("5 minutes").await;
    let before = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();

    let outcome = ctx
        .store
        .materialize(
            &customer_activity("10 minutes", ChangePolicy::Apply),
            MaterializeOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::Altered);
    assert_executed_verbs(&ctx.warehouse, &["alter_dynamic_table"]);
    assert_eq!(
        outcome.statements,
        vec!["ALTER DYNAMIC TABLE ML.FEATURE_STORE.customer_activity$1_0 SET TARGET_LAG = '10 minutes'"]
    );

    let after = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(after.target_lag.as_deref(), Some("10 minutes"));
    assert_eq!(after.generation, before.generation, "object was not recreated");
    assert_eq!(after.tags, before.tags);
}

#[tokio::test]
async fn fail_policy_aborts_without_ddl() {
    let ctx = with_activity("5 minutes").await;

    let err = ctx
        .store
        .materialize(
            &customer_activity("10 minutes", ChangePolicy::Fail),
            MaterializeOptions::default(),
        )
        .await
        .unwrap_err();

    assert_state_conflict(&err, "target_lag");
    assert!(err.to_string().contains("full refresh"));
    assert!(err.is_pre_ddl());
    assert_no_ddl(&ctx.warehouse);
    let object = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(object.target_lag.as_deref(), Some("5 minutes"));
}

#[tokio::test]
async fn continue_policy_warns_and_leaves_object() {
    let ctx = with_activity("5 minutes").await;

    let outcome = ctx
        .store
        .materialize(
            &customer_activity("10 minutes", ChangePolicy::Continue),
            MaterializeOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::DriftIgnored);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("target_lag"));
    assert!(outcome.statements.is_empty());
    assert_no_ddl(&ctx.warehouse);
    let object = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(object.target_lag.as_deref(), Some("5 minutes"));
}

#[tokio::test]
async fn matching_config_is_unchanged() {
    let ctx = with_activity("5 minutes").await;

    let mut def = customer_activity("300 seconds", ChangePolicy::Fail);
    if let Some(refresh) = def.refresh.as_mut() {
        refresh.warehouse = Some("admin_wh".into());
    }
    let outcome = ctx
        .store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::Unchanged);
    assert_no_ddl(&ctx.warehouse);
}

#[tokio::test]
async fn lag_and_warehouse_drift_alters_lag_first() {
    let ctx = with_activity("5 minutes").await;

    let def = customer_activity("1 hour", ChangePolicy::Apply)
        .with_refresh(RefreshSpec::new("1 hour", "REPORTING_WH"));
    ctx.store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap();

    let sql = ctx.warehouse.executed_sql();
    assert_eq!(sql.len(), 2);
    assert!(sql[0].ends_with("SET TARGET_LAG = '1 hour'"));
    assert!(sql[1].ends_with("SET WAREHOUSE = REPORTING_WH"));
    let object = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(object.warehouse.as_deref(), Some("REPORTING_WH"));
}

#[tokio::test]
async fn full_refresh_recreates_regardless_of_policy() {
    let ctx = with_activity("5 minutes").await;

    let outcome = ctx
        .store
        .materialize(
            &customer_activity("10 minutes", ChangePolicy::Fail),
            MaterializeOptions::full_refresh(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::Replaced);
    assert_executed_verbs(&ctx.warehouse, &["create_dynamic_table"]);
    let object = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(object.target_lag.as_deref(), Some("10 minutes"));
}

#[tokio::test]
async fn managed_definition_over_view_is_kind_drift() {
    let ctx = TestContext::with_customer().await;
    let mut def = customer_activity("5 minutes", ChangePolicy::Fail);
    let refresh = def.refresh.take();
    ctx.store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap();
    ctx.warehouse.clear_operations();
    def.refresh = refresh;

    let err = ctx
        .store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap_err();
    assert_state_conflict(&err, "kind");
    assert_no_ddl(&ctx.warehouse);

    let def = def.with_change_policy(ChangePolicy::Apply);
    ctx.store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap();
    assert_executed_verbs(&ctx.warehouse, &["drop", "create_dynamic_table"]);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn second_alter_failure_is_partial_apply() {
    let ctx = with_activity("5 minutes").await;
    ctx.warehouse.inject_failure("SET WAREHOUSE");

    let def = customer_activity("10 minutes", ChangePolicy::Apply)
        .with_refresh(RefreshSpec::new("10 minutes", "MISSING_WH"));
    let err = ctx
        .store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap_err();

    let FeatureStoreError::PartialApply {
        object,
        applied,
        total,
        ..
    } = &err
    else {
        panic!("expected partial apply, got {err:?}");
    };
    assert_eq!(object, ACTIVITY);
    assert_eq!((*applied, *total), (1, 2));
    assert!(err.to_string().contains("injected failure"));

    // The lag change stays; nothing is rolled back.
    let current = ctx.warehouse.object(&ctx.qualified(ACTIVITY)).unwrap();
    assert_eq!(current.target_lag.as_deref(), Some("10 minutes"));
    assert_eq!(current.warehouse.as_deref(), Some("ADMIN_WH"));
}

#[tokio::test]
async fn first_statement_failure_surfaces_warehouse_error() {
    let ctx = with_activity("5 minutes").await;
    ctx.warehouse.inject_failure("SET TARGET_LAG");

    let err = ctx
        .store
        .materialize(
            &customer_activity("10 minutes", ChangePolicy::Apply),
            MaterializeOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FeatureStoreError::Core(fview_core::Error::Warehouse { .. })
    ));
    assert_no_ddl(&ctx.warehouse);
}

#[tokio::test]
async fn describe_failure_is_not_absence() {
    let ctx = TestContext::with_customer().await;
    ctx.warehouse.fail_describe(PROFILE);

    let err = ctx
        .store
        .materialize(&customer_profile(), MaterializeOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FeatureStoreError::Observation { .. }));
    assert_no_ddl(&ctx.warehouse);
}

#[tokio::test]
async fn unregistered_entity_fails_before_describe() {
    let ctx = TestContext::bootstrapped().await;

    let err = ctx
        .store
        .materialize(&customer_profile(), MaterializeOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(&err, FeatureStoreError::Reference { entity } if entity == "CUSTOMER"));
    assert!(
        !ctx.warehouse
            .operations()
            .iter()
            .any(|op| matches!(op, WarehouseOp::Describe { .. }))
    );
    assert_no_ddl(&ctx.warehouse);
}

#[tokio::test]
async fn invalid_definition_touches_nothing() {
    let ctx = TestContext::with_customer().await;
    let def = FeatureViewDefinition::new("broken", "1.0", &["customer"], "SELECT 1")
        .with_refresh(RefreshSpec {
            frequency: Some("5 minutes".into()),
            ..RefreshSpec::default()
        });

    let err = ctx
        .store
        .materialize(&def, MaterializeOptions::default())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, FeatureStoreError::Configuration { field, .. } if field == "refresh.warehouse")
    );
    assert!(ctx.warehouse.operations().is_empty());
}

// ============================================================================
// Dry run
// ============================================================================

#[tokio::test]
async fn dry_run_plans_full_project_without_writing() {
    let memory = MemoryWarehouse::new();
    let store = FeatureStore::new(DryRunWarehouse::new(memory.clone()), test_config()).unwrap();

    store.bootstrap().await.unwrap();
    store.register_entity(&customer_entity()).await.unwrap();
    let outcome = store
        .materialize(&customer_profile(), MaterializeOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.action, MaterializeAction::Created);
    let verbs: Vec<_> = store
        .warehouse()
        .planned()
        .unwrap()
        .iter()
        .map(|s| s.verb())
        .collect();
    assert_eq!(
        verbs,
        vec![
            "create_schema",
            "create_tag",
            "create_tag",
            "create_tag",
            "create_view"
        ]
    );
    assert_eq!(memory.object_count().unwrap(), 0);
}
