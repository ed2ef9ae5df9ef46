//! Packaging an integration checkout into a build directory.

use forkkeep_tasks::{BuildOptions, Platform, build};

/// Stands in for pip: drops a module, metadata and a test into the target
/// and records the platform it was asked for.
const FAKE_INSTALL: &str = r#"test -f "{requirements}" && mkdir -p "{target}/dep-1.0.dist-info" "{target}/dep" && touch "{target}/dep/__init__.py" "{target}/dep/test_dep.py" "{target}/dep-1.0.dist-info/METADATA" && echo "{platform}" > "{target}/dep/platform.txt""#;

fn checkout(root: &std::path::Path) {
    let src = root.join("src");
    std::fs::create_dir_all(src.join("tests")).unwrap();
    std::fs::write(
        src.join("manifest.json"),
        r#"{"name": "Galaxy Foo", "platform": "foo", "version": "0.2"}"#,
    )
    .unwrap();
    std::fs::write(src.join("plugin.py"), "print('foo')\n").unwrap();
    std::fs::write(src.join("plugin.pyc"), "").unwrap();
    std::fs::write(src.join("plugin_test.py"), "").unwrap();
    std::fs::write(src.join("tests/test_plugin.py"), "").unwrap();
    std::fs::write(src.join(".env"), "SECRET=1").unwrap();
    std::fs::write(src.join("current_version.json"), "{}").unwrap();
    std::fs::write(root.join("requirements.txt"), "galaxy.plugin.api\n").unwrap();
    std::fs::write(root.join(".fog_config.json"), r#"{"dependencies_dir": "modules"}"#).unwrap();
}

#[tokio::test]
async fn test_build_copies_code_and_installs_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    checkout(&repo);
    let output = dir.path().join("dist");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("stale.txt"), "").unwrap();

    let manifest_path = build(&BuildOptions {
        repo_root: repo.clone(),
        output: output.clone(),
        repo_name: "FriendsOfGalaxy/galaxy-integration-foo".into(),
        platform: Platform::Windows,
        install_command: FAKE_INSTALL.into(),
    })
    .await
    .unwrap();

    assert_eq!(manifest_path, output.join("manifest.json"));
    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&manifest_path).unwrap()).unwrap();
    assert_eq!(
        manifest["update_url"],
        "https://raw.githubusercontent.com/FriendsOfGalaxy/galaxy-integration-foo/master/current_version.json"
    );
    assert_eq!(manifest["version"], "0.2");

    assert!(output.join("plugin.py").is_file());
    assert!(output.join("modules/dep/__init__.py").is_file());
    assert_eq!(
        std::fs::read_to_string(output.join("modules/dep/platform.txt")).unwrap(),
        "win32\n"
    );
    assert!(output.join("tests").is_dir());
    for gone in [
        "stale.txt",
        "plugin.pyc",
        "plugin_test.py",
        "tests/test_plugin.py",
        ".env",
        "current_version.json",
        "modules/dep/test_dep.py",
        "modules/dep-1.0.dist-info",
    ] {
        assert!(!output.join(gone).exists(), "{gone} should not be in the build");
    }
}

#[tokio::test]
async fn test_build_refuses_output_inside_source() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    checkout(&repo);

    let err = build(&BuildOptions {
        repo_root: repo.clone(),
        output: repo.join("src/dist"),
        repo_name: "FriendsOfGalaxy/galaxy-integration-foo".into(),
        platform: Platform::Windows,
        install_command: FAKE_INSTALL.into(),
    })
    .await
    .unwrap_err();
    assert!(matches!(err, forkkeep_core::Error::Config(_)), "{err:?}");
}

#[tokio::test]
async fn test_build_reports_failed_install() {
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path().join("repo");
    checkout(&repo);

    let err = build(&BuildOptions {
        repo_root: repo,
        output: dir.path().join("dist"),
        repo_name: "FriendsOfGalaxy/galaxy-integration-foo".into(),
        platform: Platform::Windows,
        install_command: "exit 4".into(),
    })
    .await
    .unwrap_err();
    assert!(
        matches!(err, forkkeep_core::Error::StepFailed { exit_code: 4, .. }),
        "{err:?}"
    );
}
