//! HTTP-level tests for the GitHub client and dispatcher.

use forkkeep_core::credentials::{CredentialBinding, CredentialStore};
use forkkeep_github::{
    DispatchNotifier, GitHubClient, GitHubDispatcher, GitHubError, NewRelease, ReleaseUpdate,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FORK: &str = "FriendsOfGalaxy/test-integration-fork";

fn fork_credentials() -> CredentialStore {
    CredentialStore::resolve(
        &[CredentialBinding::scoped("FORK_DISPATCH_TOKEN", FORK)],
        |_| Some("fork-token".to_string()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_dispatch_sends_event_type_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/dispatches", FORK)))
        .and(header("Authorization", "token fork-token"))
        .and(header("Accept", "application/vnd.github.v3+json"))
        .and(body_json(json!({ "event_type": "sync" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher =
        GitHubDispatcher::with_base_url(&server.uri(), fork_credentials(), "FORK_DISPATCH_TOKEN");
    dispatcher.notify(FORK, "sync").await.unwrap();
}

#[tokio::test]
async fn test_dispatch_refuses_out_of_scope_target() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher =
        GitHubDispatcher::with_base_url(&server.uri(), fork_credentials(), "FORK_DISPATCH_TOKEN");
    let err = dispatcher
        .notify("FriendsOfGalaxy/galaxy-integration-test", "sync")
        .await
        .unwrap_err();
    assert!(matches!(err, forkkeep_core::Error::CredentialScope { .. }));
}

#[tokio::test]
async fn test_dispatch_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/repos/{}/dispatches", FORK)))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid request"})),
        )
        .mount(&server)
        .await;

    let dispatcher =
        GitHubDispatcher::with_base_url(&server.uri(), fork_credentials(), "FORK_DISPATCH_TOKEN");
    let err = dispatcher.notify(FORK, "sync").await.unwrap_err();
    match err {
        forkkeep_core::Error::GitHub { status, message } => {
            assert_eq!(status, 422);
            assert!(message.contains("Invalid request"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_status_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/a/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
        )
        .mount(&server)
        .await;

    let client = GitHubClient::with_base_url(&server.uri(), "t");
    let err = client.repository("a/missing").await.unwrap_err();
    assert!(err.is_not_found());

    let err = client.authenticated_user().await.unwrap_err();
    assert!(matches!(err, GitHubError::Unauthorized(ref m) if m == "Bad credentials"));
}

#[tokio::test]
async fn test_repository_with_parent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/FriendsOfGalaxy/galaxy-integration-foo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "galaxy-integration-foo",
            "full_name": "FriendsOfGalaxy/galaxy-integration-foo",
            "owner": {"login": "FriendsOfGalaxy"},
            "clone_url": "https://github.com/FriendsOfGalaxy/galaxy-integration-foo.git",
            "html_url": "https://github.com/FriendsOfGalaxy/galaxy-integration-foo",
            "default_branch": "master",
            "fork": true,
            "parent": {
                "name": "galaxy-plugin-foo",
                "full_name": "someone/galaxy-plugin-foo",
                "owner": {"login": "someone"},
                "clone_url": "https://github.com/someone/galaxy-plugin-foo.git",
                "html_url": "https://github.com/someone/galaxy-plugin-foo",
                "default_branch": "main"
            }
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::with_base_url(&server.uri(), "t");
    let repo = client
        .repository("FriendsOfGalaxy/galaxy-integration-foo")
        .await
        .unwrap();
    let parent = repo.parent.unwrap();
    assert_eq!(parent.full_name, "someone/galaxy-plugin-foo");
    assert_eq!(parent.default_branch, "main");
}

#[tokio::test]
async fn test_file_content_with_ref() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/someone/plugin/contents/src/manifest.json"))
        .and(query_param("ref", "fog_release"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "manifest.json",
            "path": "src/manifest.json",
            "type": "file",
            "content": "eyJ2ZXJz\naW9uIjogIjAuMSJ9\n",
            "encoding": "base64"
        })))
        .mount(&server)
        .await;

    let client = GitHubClient::with_base_url(&server.uri(), "t");
    let bytes = client
        .file_content("someone/plugin", "/src/manifest.json", Some("fog_release"))
        .await
        .unwrap();
    assert_eq!(bytes, br#"{"version": "0.1"}"#);
}

#[tokio::test]
async fn test_release_upload_uses_upload_url_template() {
    let server = MockServer::start().await;
    let upload_url = format!(
        "{}/uploads/repos/o/r/releases/7/assets{{?name,label}}",
        server.uri()
    );
    Mock::given(method("POST"))
        .and(path("/repos/o/r/releases"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "tag_name": "0.2",
            "name": "Release version 0.2",
            "draft": true,
            "upload_url": upload_url,
            "assets": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads/repos/o/r/releases/7/assets"))
        .and(query_param("name", "windows.zip"))
        .and(header("Content-Type", "application/zip"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "name": "windows.zip",
            "browser_download_url": "https://github.com/o/r/releases/download/0.2/windows.zip"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/o/r/releases/7"))
        .and(body_json(json!({ "draft": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "tag_name": "0.2",
            "draft": false,
            "upload_url": "",
            "assets": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::with_base_url(&server.uri(), "t");
    let release = client
        .create_release(
            "o/r",
            &NewRelease {
                tag_name: "0.2".into(),
                target_commitish: "master".into(),
                name: "Release version 0.2".into(),
                body: "Version 0.2".into(),
                draft: true,
            },
        )
        .await
        .unwrap();
    let asset = client
        .upload_release_asset(&release, "windows.zip", "application/zip", b"PK".to_vec())
        .await
        .unwrap();
    assert_eq!(asset.name, "windows.zip");

    let published = client
        .update_release(
            "o/r",
            release.id,
            &ReleaseUpdate {
                draft: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!published.draft);
}
