use relsync::ReleaseError;
use relsync::release::{DesiredRelease, ReconcileAction, Reconciler, reconcile};
use relsync::test_utils::mock_backend::{
    BackendCall, ErrorInjection, MockErrorKind, MockReleaseBackend, test_draft, test_release,
};

fn desired(tag: &str) -> DesiredRelease {
    DesiredRelease::new("owner", "repo", tag)
}

#[tokio::test]
async fn creates_release_when_tag_is_unknown() {
    let backend = MockReleaseBackend::new();
    let wanted = DesiredRelease {
        name: Some("First".into()),
        body: Some("notes".into()),
        prerelease: Some(true),
        target_commitish: Some("abc123".into()),
        ..desired("v1.0.0")
    };

    let result = Reconciler::new(&backend).run(&wanted).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Created);
    assert_eq!(result.retries, 0);
    assert_eq!(backend.create_count(), 1);
    let stored = backend.release_by_tag("v1.0.0").unwrap();
    assert_eq!(stored.name.as_deref(), Some("First"));
    assert_eq!(stored.body.as_deref(), Some("notes"));
    assert!(stored.prerelease);
    assert_eq!(stored.target_commitish, "abc123");
}

#[tokio::test]
async fn updates_existing_release_in_place() {
    let backend = MockReleaseBackend::new().with_releases(vec![test_release(5, "v1.0.0")]);
    let wanted = DesiredRelease {
        body: Some("new notes".into()),
        ..desired("v1.0.0")
    };

    let result = Reconciler::new(&backend).run(&wanted).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Updated);
    assert_eq!(result.release.id, 5);
    assert_eq!(backend.create_count(), 0);
    assert_eq!(result.release.name.as_deref(), Some("v1.0.0"));
    assert_eq!(result.release.body.as_deref(), Some("new notes"));
}

#[tokio::test]
async fn appending_twice_repeats_the_body() {
    let mut existing = test_release(5, "v1.0.0");
    existing.body = Some("A".into());
    let backend = MockReleaseBackend::new().with_releases(vec![existing]);
    let wanted = DesiredRelease {
        body: Some("B".into()),
        append_body: true,
        ..desired("v1.0.0")
    };

    let first = reconcile(&wanted, &backend, 3).await.unwrap();
    assert_eq!(first.body.as_deref(), Some("A\nB"));

    let second = reconcile(&wanted, &backend, 3).await.unwrap();
    assert_eq!(second.body.as_deref(), Some("A\nB\nB"));
}

#[tokio::test]
async fn draft_scan_stops_at_the_matching_page() {
    let backend = MockReleaseBackend::new()
        .with_page_size(2)
        .with_releases(vec![
            test_release(1, "v0.1.0"),
            test_release(2, "v0.2.0"),
            test_release(3, "v0.3.0"),
            test_draft(4, "v1.0.0-rc1"),
            test_release(5, "v0.4.0"),
            test_release(6, "v0.5.0"),
        ]);
    let wanted = DesiredRelease {
        draft: Some(true),
        ..desired("v1.0.0-rc1")
    };

    let result = Reconciler::new(&backend).run(&wanted).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Updated);
    assert_eq!(result.release.id, 4);
    assert_eq!(backend.pages_requested(), vec![1, 2]);
    assert!(
        !backend
            .calls()
            .iter()
            .any(|call| matches!(call, BackendCall::FetchByTag { .. }))
    );
}

#[tokio::test]
async fn draft_scan_reads_every_page_before_creating() {
    let backend = MockReleaseBackend::new()
        .with_page_size(1)
        .with_releases(vec![test_release(1, "v0.1.0"), test_release(2, "v0.2.0")]);
    let wanted = DesiredRelease {
        draft: Some(true),
        ..desired("v1.0.0")
    };

    let result = Reconciler::new(&backend).run(&wanted).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Created);
    assert!(result.release.draft);
    // The empty page 3 ends the listing.
    assert_eq!(backend.pages_requested(), vec![1, 2, 3]);
}

#[tokio::test]
async fn published_lookup_ignores_drafts() {
    let backend = MockReleaseBackend::new().with_releases(vec![test_draft(9, "v1.0.0")]);

    let result = Reconciler::new(&backend).run(&desired("v1.0.0")).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Created);
    assert_ne!(result.release.id, 9);
    assert!(backend.pages_requested().is_empty());
}

#[tokio::test]
async fn lost_create_race_falls_back_to_update() {
    let backend = MockReleaseBackend::new();
    backend.simulate_create_race(1);
    let wanted = DesiredRelease {
        body: Some("notes".into()),
        ..desired("v2.0.0")
    };

    let result = Reconciler::new(&backend).run(&wanted).await.unwrap();

    assert_eq!(result.action, ReconcileAction::Updated);
    assert_eq!(result.retries, 1);
    assert_eq!(backend.create_count(), 1);
    assert_eq!(backend.releases().len(), 1);

    let kinds: Vec<&str> = backend
        .calls()
        .iter()
        .map(|call| match call {
            BackendCall::FetchByTag { .. } => "fetch",
            BackendCall::Create(_) => "create",
            BackendCall::Update { .. } => "update",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["fetch", "create", "fetch", "update"]);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let backend = MockReleaseBackend::new();
    backend.fail_creates(10);

    let err = Reconciler::new(&backend)
        .with_max_attempts(3)
        .run(&desired("v3.0.0"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReleaseError::AbortedAfterRetries { attempts: 3 }));
    assert_eq!(backend.create_count(), 3);
    assert!(matches!(backend.calls().last(), Some(BackendCall::Create(_))));
    assert!(backend.releases().is_empty());
}

#[tokio::test]
async fn single_attempt_budget_does_not_retry() {
    let backend = MockReleaseBackend::new();
    backend.fail_creates(1);

    let err = reconcile(&desired("v3.0.0"), &backend, 1).await.unwrap_err();

    assert!(matches!(err, ReleaseError::AbortedAfterRetries { attempts: 1 }));
    assert_eq!(backend.calls().len(), 2);
}

#[tokio::test]
async fn lookup_failure_is_not_retried() {
    let backend = MockReleaseBackend::new();
    backend.inject_error(ErrorInjection::Operation(
        "fetch_by_tag",
        MockErrorKind::Status(500, "Server Error".into()),
    ));

    let err = reconcile(&desired("v1.0.0"), &backend, 3).await.unwrap_err();

    assert!(matches!(err, ReleaseError::Api { status: 500, .. }));
    assert_eq!(backend.create_count(), 0);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn update_failure_propagates() {
    let backend = MockReleaseBackend::new().with_releases(vec![test_release(1, "v1.0.0")]);
    backend.inject_error(ErrorInjection::Operation(
        "update",
        MockErrorKind::Status(403, "Resource not accessible by integration".into()),
    ));

    let err = reconcile(&desired("v1.0.0"), &backend, 3).await.unwrap_err();

    assert!(matches!(err, ReleaseError::Api { status: 403, .. }));
    assert_eq!(backend.create_count(), 0);
}

#[tokio::test]
async fn draft_listing_failure_is_fatal() {
    let backend = MockReleaseBackend::new().with_releases(vec![test_draft(1, "v1.0.0-rc1")]);
    backend.inject_error(ErrorInjection::Operation(
        "list_page",
        MockErrorKind::Status(500, "Server Error".into()),
    ));
    let wanted = DesiredRelease {
        draft: Some(true),
        ..desired("v1.0.0-rc1")
    };

    let err = reconcile(&wanted, &backend, 3).await.unwrap_err();

    assert!(matches!(err, ReleaseError::Api { status: 500, .. }));
    assert_eq!(backend.create_count(), 0);
    assert_eq!(backend.pages_requested(), vec![1]);
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test]
async fn provider_outage_stops_at_the_lookup() {
    let backend = MockReleaseBackend::new();
    backend.inject_error(ErrorInjection::All(MockErrorKind::Status(
        503,
        "Service Unavailable".into(),
    )));

    let err = reconcile(&desired("v1.0.0"), &backend, 3).await.unwrap_err();

    assert!(matches!(err, ReleaseError::Api { status: 503, .. }));
    assert_eq!(backend.calls(), vec![BackendCall::FetchByTag {
        tag: "v1.0.0".into()
    }]);
}

#[tokio::test]
async fn release_deleted_before_update_is_not_recreated() {
    let backend = MockReleaseBackend::new().with_releases(vec![test_release(1, "v1.0.0")]);
    backend.inject_error(ErrorInjection::Operation("update", MockErrorKind::NotFound));

    let err = reconcile(&desired("v1.0.0"), &backend, 3).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(backend.create_count(), 0);

    backend.clear_errors();
    let release = reconcile(&desired("v1.0.0"), &backend, 3).await.unwrap();
    assert_eq!(release.id, 1);
}

#[test]
fn tag_resolution_table() {
    use relsync::release::resolve_tag;

    let cases = [
        ((Some("v9"), "refs/tags/v1"), Some("v9")),
        ((None, "refs/tags/v1.2.3"), Some("v1.2.3")),
        ((Some(""), "refs/tags/v1"), Some("v1")),
        ((None, "refs/heads/main"), None),
        ((None, ""), None),
    ];

    for ((tag, git_ref), expected) in cases {
        assert_eq!(
            resolve_tag(tag, git_ref).as_deref(),
            expected,
            "tag={tag:?} ref={git_ref}"
        );
    }
}
