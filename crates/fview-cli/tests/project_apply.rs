//! End-to-end apply of the bundled demo project against an in-memory warehouse.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::PathBuf;

use clap::Parser;
use fview_catalog::{DryRunWarehouse, FeatureStore, MaterializeAction, MaterializeOptions};
use fview_cli::commands::apply::{Project, run};
use fview_cli::commands::read_json;
use fview_cli::{Cli, Commands};
use fview_test_utils::{TestContext, assert_metadata_current, test_config};

fn demo_project() -> Project {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/project.json");
    read_json(&path).expect("demo project parses")
}

#[tokio::test]
async fn demo_project_applies_cleanly() {
    let ctx = TestContext::bootstrapped().await;

    let report = run(&ctx.store, &demo_project(), MaterializeOptions::default()).await;

    assert!(report.failure.is_none(), "{:?}", report.failure);
    let actions: Vec<_> = report.feature_views.iter().map(|o| o.action).collect();
    assert_eq!(actions, vec![MaterializeAction::Created, MaterializeAction::Created]);

    let sales = ctx.warehouse.object(&ctx.qualified("store_sales$2_1")).unwrap();
    assert_eq!(sales.target_lag.as_deref(), Some("1 hour"));
    assert_metadata_current(&sales);

    let profile = ctx.warehouse.object(&ctx.qualified("customer_profile$1_0")).unwrap();
    assert_eq!(profile.comment.as_deref(), Some("Customer lifetime value"));
}

#[tokio::test]
async fn demo_project_dry_run_previews_everything() {
    let ctx = TestContext::bootstrapped().await;
    let store = FeatureStore::new(DryRunWarehouse::new(ctx.warehouse.clone()), test_config())
        .unwrap();

    let report = run(&store, &demo_project(), MaterializeOptions::default()).await;

    // Entity tags planned earlier in the run satisfy the views' references.
    assert!(report.failure.is_none(), "{:?}", report.failure);
    let verbs: Vec<_> = store
        .warehouse()
        .planned()
        .unwrap()
        .iter()
        .map(fview_catalog::Statement::verb)
        .collect();
    assert_eq!(
        verbs,
        vec!["create_tag", "create_tag", "create_view", "create_dynamic_table"]
    );
    assert!(ctx.warehouse.executed_sql().is_empty());
}

#[test]
fn apply_command_line_parses() {
    let cli = Cli::parse_from([
        "fview",
        "--database",
        "ML",
        "apply",
        "-f",
        "demos/project.json",
        "--dry-run",
    ]);

    let Commands::Apply(args) = cli.command else {
        panic!("expected apply");
    };
    assert_eq!(args.project_file, PathBuf::from("demos/project.json"));
    assert!(args.dry_run);
    assert!(!args.full_refresh);
}
