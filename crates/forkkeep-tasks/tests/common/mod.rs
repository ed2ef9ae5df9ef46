//! Fixtures shared by the task tests: a mocked GitHub API and local git
//! repositories standing in for the fork and its upstream.

#![allow(dead_code)]

use base64::Engine;
use forkkeep_git::GitRepo;
use serde_json::{Value, json};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const FORK: &str = "FriendsOfGalaxy/galaxy-integration-foo";
pub const PARENT: &str = "someone/galaxy-plugin-foo";
pub const TOKEN: &str = "fog-token";

pub fn repo_json(full_name: &str, clone_url: &str, default_branch: &str) -> Value {
    let (owner, name) = full_name.split_once('/').unwrap();
    json!({
        "name": name,
        "full_name": full_name,
        "owner": {"login": owner},
        "clone_url": clone_url,
        "html_url": format!("https://github.com/{}", full_name),
        "default_branch": default_branch,
    })
}

pub fn fork_json(fork_clone_url: &str, parent_clone_url: &str) -> Value {
    let mut fork = repo_json(FORK, fork_clone_url, "master");
    fork["fork"] = json!(true);
    fork["parent"] = repo_json(PARENT, parent_clone_url, "master");
    fork
}

pub fn file_entry(path: &str, content: &[u8]) -> Value {
    let name = path.rsplit('/').next().unwrap();
    json!({
        "name": name,
        "path": path,
        "type": "file",
        "content": base64::engine::general_purpose::STANDARD.encode(content),
        "encoding": "base64",
    })
}

pub fn manifest(version: &str) -> String {
    serde_json::to_string_pretty(&json!({
        "name": "Galaxy Foo",
        "platform": "foo",
        "guid": "4a1c-foo",
        "version": version,
    }))
    .unwrap()
}

/// Mount the endpoints every `ForkManager` needs: the authenticated user,
/// the fork with its parent, a MIT license, no `fog_release` branch, a
/// parent manifest at the tree root and no `.fog_config.json`.
pub async fn mount_fork(
    server: &MockServer,
    fork_clone_url: &str,
    parent_clone_url: &str,
    parent_version: &str,
) {
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "FriendsOfGalaxy"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}", FORK)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fork_json(fork_clone_url, parent_clone_url)),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/license", PARENT)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "license": {"key": "mit", "name": "MIT License"}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/branches/fog_release", PARENT)))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Branch not found"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/contents/", PARENT)))
        .and(query_param("ref", "master"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "README.md", "path": "README.md", "type": "file"},
            {"name": "manifest.json", "path": "manifest.json", "type": "file"},
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/contents/manifest.json", PARENT)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(file_entry("manifest.json", manifest(parent_version).as_bytes())),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/contents/.fog_config.json", PARENT)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(server)
        .await;
}

/// Initialise a repository at `dir` on `master` holding `files`.
pub async fn seed_repo(dir: &Path, files: &[(&str, &str)]) -> GitRepo {
    let repo = GitRepo::init(dir, "master").await.unwrap();
    repo.configure_user("someone", "someone@example.invalid")
        .await
        .unwrap();
    for (name, content) in files {
        let file = dir.join(name);
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(file, content).unwrap();
    }
    repo.add_all().await.unwrap();
    repo.commit("initial").await.unwrap();
    repo
}

/// Bare copy of `src` at `dest`, acting as a GitHub remote.
pub async fn bare_clone(src: &Path, dest: &Path) {
    GitRepo::open(dest.parent().unwrap())
        .run(&[
            "clone",
            "--bare",
            &src.to_string_lossy(),
            &dest.to_string_lossy(),
        ])
        .await
        .unwrap();
}

/// `git show <rev>:<path>` in `repo`, or `None` when it does not exist.
pub async fn show(repo: &Path, rev: &str, file: &str) -> Option<String> {
    let out = GitRepo::open(repo)
        .run_unchecked(&["show", &format!("{}:{}", rev, file)])
        .await
        .unwrap();
    out.success().then_some(out.stdout)
}
