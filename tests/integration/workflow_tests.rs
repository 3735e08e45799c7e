use std::fs;

use tempfile::TempDir;

use relsync::ReleaseError;
use relsync::config::ReleaseConfig;
use relsync::release::{ReconcileAction, RemoteAsset};
use relsync::test_utils::mock_backend::{BackendCall, MockReleaseBackend, test_release};
use relsync::workflow::run_release;

fn config(dir: &TempDir) -> ReleaseConfig {
    ReleaseConfig {
        repository: Some("owner/repo".into()),
        git_ref: Some("refs/tags/v1.0.0".into()),
        token: Some("token".into()),
        files: vec![format!("{}/*.zip", dir.path().display())],
        ..ReleaseConfig::default()
    }
}

fn write_assets(dir: &TempDir, names: &[&str]) {
    for name in names {
        fs::write(dir.path().join(name), format!("contents of {name}")).unwrap();
    }
}

#[tokio::test]
async fn fresh_release_gets_all_assets() {
    let dir = TempDir::new().unwrap();
    write_assets(&dir, &["a.zip", "b.zip"]);
    let backend = MockReleaseBackend::new();

    let outcome = run_release(&config(&dir), &backend).await.unwrap();

    assert_eq!(outcome.action, ReconcileAction::Created);
    let report = outcome.assets.as_ref().unwrap();
    let names: Vec<&str> = report.uploaded.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["a.zip", "b.zip"]);
    assert!(outcome.ensure_complete().is_ok());

    let stored = backend.release_by_tag("v1.0.0").unwrap();
    assert_eq!(stored.assets.len(), 2);
}

#[tokio::test]
async fn rerun_replaces_assets_with_the_same_name() {
    let dir = TempDir::new().unwrap();
    write_assets(&dir, &["a.zip"]);
    let mut existing = test_release(1, "v1.0.0");
    existing.assets = vec![
        RemoteAsset {
            id: 77,
            name: "a.zip".into(),
        },
        RemoteAsset {
            id: 78,
            name: "keep.txt".into(),
        },
    ];
    let backend = MockReleaseBackend::new().with_releases(vec![existing]);

    let outcome = run_release(&config(&dir), &backend).await.unwrap();

    assert_eq!(outcome.action, ReconcileAction::Updated);
    let calls = backend.calls();
    let delete = calls
        .iter()
        .position(|c| matches!(c, BackendCall::DeleteAsset { asset_id: 77, .. }))
        .unwrap();
    let upload = calls
        .iter()
        .position(|c| matches!(c, BackendCall::UploadAsset { name, .. } if name == "a.zip"))
        .unwrap();
    assert!(delete < upload);
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, BackendCall::DeleteAsset { asset_id: 78, .. }))
    );

    let stored = backend.release_by_tag("v1.0.0").unwrap();
    let mut names: Vec<&str> = stored.assets.iter().map(|a| a.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a.zip", "keep.txt"]);
}

#[tokio::test]
async fn failed_upload_leaves_release_in_place() {
    let dir = TempDir::new().unwrap();
    write_assets(&dir, &["a.zip", "big.zip"]);
    let backend = MockReleaseBackend::new();
    backend.fail_upload("big.zip", 422, "Validation Failed");

    let outcome = run_release(&config(&dir), &backend).await.unwrap();

    let report = outcome.assets.as_ref().unwrap();
    assert_eq!(report.uploaded.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].path.ends_with("big.zip"));
    assert!(report.failed[0].error.message.contains("received status code 422"));

    let err = outcome.ensure_complete().unwrap_err();
    assert!(matches!(err, ReleaseError::AssetsFailed { failed: 1, total: 2 }));
    assert!(backend.release_by_tag("v1.0.0").is_some());
}

#[tokio::test]
async fn no_files_configured_skips_asset_sync() {
    let dir = TempDir::new().unwrap();
    let config = ReleaseConfig {
        files: Vec::new(),
        ..config(&dir)
    };
    let backend = MockReleaseBackend::new();

    let outcome = run_release(&config, &backend).await.unwrap();

    assert!(outcome.assets.is_none());
    assert!(
        !backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::UploadAsset { .. }))
    );
}

#[tokio::test]
async fn unmatched_files_fail_before_any_request() {
    let dir = TempDir::new().unwrap();
    let config = ReleaseConfig {
        fail_on_unmatched_files: true,
        ..config(&dir)
    };
    let backend = MockReleaseBackend::new();

    let err = run_release(&config, &backend).await.unwrap_err();

    assert!(matches!(err, ReleaseError::UnmatchedFiles(_)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn body_file_feeds_the_release_notes() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("NOTES.md");
    fs::write(&notes, "from file").unwrap();
    let config = ReleaseConfig {
        body: Some("inline".into()),
        body_path: Some(notes),
        files: Vec::new(),
        ..config(&dir)
    };
    let backend = MockReleaseBackend::new();

    let outcome = run_release(&config, &backend).await.unwrap();

    assert_eq!(outcome.release.body.as_deref(), Some("from file"));
}

#[tokio::test]
async fn summary_serializes_for_json_output() {
    let dir = TempDir::new().unwrap();
    write_assets(&dir, &["a.zip"]);
    let backend = MockReleaseBackend::new();

    let outcome = run_release(&config(&dir), &backend).await.unwrap();
    let json = serde_json::to_value(outcome.summary()).unwrap();

    assert_eq!(json["tag"], "v1.0.0");
    assert_eq!(json["action"], "created");
    assert_eq!(json["retries"], 0);
    assert_eq!(json["assets"]["uploaded"][0]["name"], "a.zip");
    assert!(json.get("warnings").is_none());
}
