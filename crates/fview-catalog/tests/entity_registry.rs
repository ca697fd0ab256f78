//! Integration tests for entity registration and lookup.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use fview_catalog::definition::EntityDefinition;
use fview_catalog::entity::RegistrationOutcome;
use fview_catalog::error::FeatureStoreError;
use fview_test_utils::{
    TestContext, assert_executed_verbs, assert_no_ddl, customer_entity, store_entity,
};

#[tokio::test]
async fn register_then_lookup_returns_upper_cased_keys_in_order() {
    let ctx = TestContext::bootstrapped().await;

    let registration = ctx
        .store
        .register_entity(&EntityDefinition::new("Store", &["store_id", "Region"]))
        .await
        .unwrap();
    assert_eq!(registration.outcome, RegistrationOutcome::Registered);
    assert_executed_verbs(&ctx.warehouse, &["create_tag"]);
    assert_eq!(
        ctx.warehouse.executed_sql()[0],
        "CREATE TAG IF NOT EXISTS ML.FEATURE_STORE.SNOWML_FEATURE_STORE_ENTITY_STORE ALLOWED_VALUES 'STORE_ID,REGION'"
    );

    let entity = ctx.store.get_entity("store").await.unwrap().unwrap();
    assert_eq!(entity.name, "STORE");
    assert_eq!(entity.join_keys, vec!["STORE_ID", "REGION"]);
}

#[tokio::test]
async fn description_becomes_tag_comment() {
    let ctx = TestContext::bootstrapped().await;

    ctx.store.register_entity(&customer_entity()).await.unwrap();

    assert!(ctx.warehouse.executed_sql()[0].ends_with("COMMENT = 'retail customers'"));
    let entity = ctx.store.get_entity("CUSTOMER").await.unwrap().unwrap();
    assert_eq!(entity.description.as_deref(), Some("retail customers"));
}

#[tokio::test]
async fn re_registering_same_keys_is_a_no_op() {
    let ctx = TestContext::with_customer().await;

    let registration = ctx
        .store
        .register_entity(&EntityDefinition::new("CUSTOMER", &["Customer_Id"]))
        .await
        .unwrap();

    assert_eq!(registration.outcome, RegistrationOutcome::AlreadyRegistered);
    assert_no_ddl(&ctx.warehouse);
}

#[tokio::test]
async fn re_registering_other_keys_conflicts() {
    let ctx = TestContext::with_customer().await;

    let err = ctx
        .store
        .register_entity(&EntityDefinition::new("customer", &["email"]))
        .await
        .unwrap_err();

    let FeatureStoreError::EntityConflict {
        entity,
        registered,
        declared,
    } = err
    else {
        panic!("expected entity conflict");
    };
    assert_eq!(entity, "CUSTOMER");
    assert_eq!(registered, "CUSTOMER_ID");
    assert_eq!(declared, "EMAIL");
    assert_no_ddl(&ctx.warehouse);
}

#[tokio::test]
async fn list_returns_entities_sorted_by_name() {
    let ctx = TestContext::with_customer().await;
    ctx.store.register_entity(&store_entity()).await.unwrap();
    ctx.store
        .register_entity(&EntityDefinition::new("account", &["account_id"]))
        .await
        .unwrap();

    let names: Vec<String> = ctx
        .store
        .list_entities()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();

    assert_eq!(names, vec!["ACCOUNT", "CUSTOMER", "STORE"]);
}

#[tokio::test]
async fn unknown_entity_lookup_is_none() {
    let ctx = TestContext::bootstrapped().await;
    assert!(ctx.store.get_entity("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn registration_requires_bootstrapped_schema() {
    let ctx = TestContext::new();

    let err = ctx
        .store
        .register_entity(&customer_entity())
        .await
        .unwrap_err();

    assert!(matches!(err, FeatureStoreError::Core(_)));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn invalid_entity_is_rejected_before_any_call() {
    let ctx = TestContext::bootstrapped().await;

    let err = ctx
        .store
        .register_entity(&EntityDefinition::new("customer", &[]))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, FeatureStoreError::Configuration { field, .. } if field == "join_keys")
    );
    assert!(ctx.warehouse.operations().is_empty());
}
