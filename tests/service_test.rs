//! Integration tests for the service submission surface
//!
//! Validation gating, catalog lookups, and token lifecycle.

mod common;

use common::{catalog_ext, requests, test_catalog, TestHarness};

use bundleforge::core::identity::ConfigId;
use bundleforge::core::task::BuildState;
use bundleforge::error::ServiceError;

#[tokio::test]
async fn test_invalid_configuration_rejected_before_any_work() {
    let harness = TestHarness::new();

    // backend alone misses its required frontend counterpart
    let result = harness.service.submit(&requests(&[("backend", "master")])).await;

    match result {
        Err(ServiceError::InvalidConfiguration { report }) => {
            assert!(!report.is_valid());
            assert_eq!(report.missing.len(), 1);
            assert_eq!(report.missing[0].name, "frontend");
        }
        other => panic!("expected validation rejection, got {other:?}"),
    }

    assert_eq!(harness.service.in_flight(), 0, "no task may be created");
    assert!(harness.toolchain.steps().is_empty(), "no external step may run");
}

#[tokio::test]
async fn test_incompatible_selection_rejected() {
    let mut catalog = test_catalog();
    catalog.frontend.push(catalog_ext(
        "frontend-extension-new-vr",
        "master",
        &["backend", "frontend"],
        &["frontend-extension-vr"],
    ));
    let harness = TestHarness::with_catalog(catalog);

    let result = harness
        .service
        .submit(&requests(&[
            ("backend", "master"),
            ("frontend", "master"),
            ("frontend-extension-vr", "master"),
            ("frontend-extension-new-vr", "master"),
        ]))
        .await;

    match result {
        Err(ServiceError::InvalidConfiguration { report }) => {
            let flagged: Vec<&str> =
                report.conflicts.iter().map(|c| c.extension.as_str()).collect();
            assert!(flagged.contains(&"frontend-extension-vr"));
            assert!(flagged.contains(&"frontend-extension-new-vr"));
        }
        other => panic!("expected validation rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let mut catalog = test_catalog();
    catalog.frontend.push(catalog_ext("frontend", "v1.5.0", &["backend"], &[]));
    let harness = TestHarness::with_catalog(catalog);

    let result = harness
        .service
        .submit(&requests(&[
            ("backend", "master"),
            ("frontend", "master"),
            ("frontend", "v1.5.0"),
        ]))
        .await;

    match result {
        Err(ServiceError::InvalidConfiguration { report }) => {
            assert_eq!(report.duplicates, vec!["frontend".to_string()]);
        }
        other => panic!("expected validation rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_extension_rejected() {
    let harness = TestHarness::new();
    let result = harness
        .service
        .submit(&requests(&[("backend", "master"), ("no-such-thing", "master")]))
        .await;
    assert!(matches!(result, Err(ServiceError::UnknownExtension { .. })));
}

#[tokio::test]
async fn test_inactive_extension_rejected() {
    let mut catalog = test_catalog();
    let mut retired = catalog_ext(
        "backend-extension-old",
        "master",
        &["backend", "frontend"],
        &[],
    );
    retired.active = false;
    catalog.backend.push(retired);
    let harness = TestHarness::with_catalog(catalog);

    let result = harness
        .service
        .submit(&requests(&[
            ("backend", "master"),
            ("frontend", "master"),
            ("backend-extension-old", "master"),
        ]))
        .await;
    assert!(matches!(result, Err(ServiceError::InactiveExtension { .. })));
}

#[tokio::test]
async fn test_unknown_token_is_distinguishable() {
    let harness = TestHarness::new();

    let bogus = ConfigId::parse(&"ab".repeat(32)).unwrap();
    assert_eq!(harness.service.status(&bogus), None);
    assert!(matches!(
        harness.service.download(&bogus),
        Err(ServiceError::UnknownToken { .. })
    ));
}

#[tokio::test]
async fn test_terminal_state_outlives_deregistration() {
    let harness = TestHarness::new();

    let submission = harness
        .service
        .submit(&requests(&[("backend", "master"), ("frontend", "master")]))
        .await
        .unwrap();
    submission.task().unwrap().wait_terminal().await;

    // The task has left the in-flight registry, yet its outcome is still
    // answerable, both from retention and from the cache itself
    assert_eq!(harness.service.in_flight(), 0);
    assert_eq!(
        harness.service.status(submission.token()),
        Some(BuildState::Ready)
    );
}
