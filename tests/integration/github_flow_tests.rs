use std::fs;

use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use relsync::config::ReleaseConfig;
use relsync::providers::GitHubBackend;
use relsync::release::ReconcileAction;
use relsync::workflow::run_release;

fn release_json(server: &MockServer, id: u64, assets: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "tag_name": "v1.0.0",
        "name": "v1.0.0",
        "body": "old notes",
        "target_commitish": "main",
        "draft": false,
        "prerelease": false,
        "html_url": "https://github.com/owner/repo/releases/tag/v1.0.0",
        "upload_url": server.url(format!("/uploads/releases/{id}/assets{{?name,label}}")),
        "assets": assets,
    })
}

fn config(dir: &TempDir) -> ReleaseConfig {
    ReleaseConfig {
        repository: Some("owner/repo".into()),
        git_ref: Some("refs/tags/v1.0.0".into()),
        token: Some("test-token".into()),
        body: Some("new notes".into()),
        files: vec![format!("{}/app.zip", dir.path().display())],
        ..ReleaseConfig::default()
    }
}

#[tokio::test]
async fn creates_release_and_uploads_over_http() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.zip"), "zip-bytes").unwrap();

    let lookup = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/owner/repo/releases/tags/v1.0.0");
            then.status(404).json_body(json!({ "message": "Not Found" }));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/repos/owner/repo/releases")
                .body_includes(r#""tag_name":"v1.0.0""#)
                .body_includes(r#""body":"new notes""#);
            then.status(201)
                .json_body(release_json(&server, 11, json!([])));
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/uploads/releases/11/assets")
                .query_param("name", "app.zip")
                .body("zip-bytes");
            then.status(201).json_body(json!({
                "id": 500,
                "name": "app.zip",
                "size": 9,
                "content_type": "application/zip",
                "browser_download_url": "https://github.com/owner/repo/releases/download/v1.0.0/app.zip",
            }));
        })
        .await;

    let backend = GitHubBackend::new("test-token")
        .unwrap()
        .with_api_url(server.base_url());
    let outcome = run_release(&config(&dir), &backend).await.unwrap();

    lookup.assert_async().await;
    create.assert_async().await;
    upload.assert_async().await;
    assert_eq!(outcome.action, ReconcileAction::Created);
    assert_eq!(outcome.release.id, 11);
    let report = outcome.assets.unwrap();
    assert_eq!(report.uploaded[0].id, 500);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn updates_release_and_replaces_asset_over_http() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.zip"), "zip-bytes").unwrap();
    let existing = release_json(&server, 12, json!([{ "id": 90, "name": "app.zip" }]));

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/owner/repo/releases/tags/v1.0.0");
            then.status(200).json_body(existing.clone());
        })
        .await;
    let update = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/repos/owner/repo/releases/12")
                .body_includes(r#""target_commitish":"main""#)
                .body_includes(r#""body":"new notes""#);
            then.status(200).json_body(existing.clone());
        })
        .await;
    let delete = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path("/repos/owner/repo/releases/assets/90");
            then.status(204);
        })
        .await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/uploads/releases/12/assets")
                .query_param("name", "app.zip");
            then.status(201)
                .json_body(json!({ "id": 501, "name": "app.zip", "size": 9 }));
        })
        .await;

    let backend = GitHubBackend::new("test-token")
        .unwrap()
        .with_api_url(server.base_url());
    let outcome = run_release(&config(&dir), &backend).await.unwrap();

    update.assert_async().await;
    delete.assert_async().await;
    upload.assert_async().await;
    assert_eq!(outcome.action, ReconcileAction::Updated);
    assert!(outcome.ensure_complete().is_ok());
}

#[tokio::test]
async fn rejected_upload_is_reported_per_file() {
    let server = MockServer::start_async().await;
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.zip"), "zip-bytes").unwrap();

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/owner/repo/releases/tags/v1.0.0");
            then.status(200)
                .json_body(release_json(&server, 13, json!([])));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/repos/owner/repo/releases/13");
            then.status(200)
                .json_body(release_json(&server, 13, json!([])));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/uploads/releases/13/assets");
            then.status(422).json_body(json!({
                "message": "Validation Failed",
                "errors": [{ "resource": "ReleaseAsset", "code": "already_exists", "field": "name" }],
            }));
        })
        .await;

    let backend = GitHubBackend::new("test-token")
        .unwrap()
        .with_api_url(server.base_url());
    let outcome = run_release(&config(&dir), &backend).await.unwrap();

    let report = outcome.assets.as_ref().unwrap();
    assert_eq!(report.failed.len(), 1);
    let message = &report.failed[0].error.message;
    assert!(message.starts_with("Failed to upload release asset app.zip. received status code 422"));
    assert!(message.contains("Validation Failed"));
    assert!(message.contains("already_exists"));
    assert!(outcome.ensure_complete().is_err());
}
