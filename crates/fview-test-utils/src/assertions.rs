//! Custom assertion helpers for integration tests.

use fview_catalog::audit::check_metadata_contract;
use fview_catalog::error::FeatureStoreError;
use fview_catalog::memory::ObjectSnapshot;
use fview_catalog::metadata::FEATURE_VIEW_METADATA_TAG;

use crate::warehouse::RecordingWarehouse;

/// Asserts that no DDL was executed.
///
/// # Panics
///
/// Panics if any statement was executed.
pub fn assert_no_ddl(warehouse: &RecordingWarehouse) {
    let executed = warehouse.executed_sql();
    assert!(
        executed.is_empty(),
        "Expected no DDL, but executed: {executed:#?}"
    );
}

/// Asserts the exact sequence of executed statement verbs.
///
/// # Panics
///
/// Panics if the executed verbs differ.
pub fn assert_executed_verbs(warehouse: &RecordingWarehouse, expected: &[&str]) {
    assert_eq!(
        warehouse.executed_verbs(),
        expected,
        "Unexpected statements: {:#?}",
        warehouse.executed_sql()
    );
}

/// Asserts that an object carries metadata in the current format.
///
/// # Panics
///
/// Panics if the metadata tag is missing or not in the current format.
pub fn assert_metadata_current(object: &ObjectSnapshot) {
    let value = object
        .tags
        .get(FEATURE_VIEW_METADATA_TAG)
        .unwrap_or_else(|| panic!("object has no {FEATURE_VIEW_METADATA_TAG} tag: {object:?}"));
    if let Err(reason) = check_metadata_contract(value) {
        panic!("metadata {value} violates the contract: {reason}");
    }
}

/// Asserts that an error is a state conflict mentioning `attribute`.
///
/// # Panics
///
/// Panics if the error is of another kind or does not mention the attribute.
pub fn assert_state_conflict(err: &FeatureStoreError, attribute: &str) {
    match err {
        FeatureStoreError::StateConflict { drift, .. } => assert!(
            drift.contains(attribute),
            "Expected drift on {attribute}, got: {drift}"
        ),
        other => panic!("Expected StateConflict, got: {other:?}"),
    }
}
