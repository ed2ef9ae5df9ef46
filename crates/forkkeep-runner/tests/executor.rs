//! Fail-fast execution of the shipped workflows.

use async_trait::async_trait;
use forkkeep_core::credentials::CredentialStore;
use forkkeep_core::run::{RunStatus, StepStatus};
use forkkeep_core::trigger::TriggerEvent;
use forkkeep_core::workflow::{StepDefinition, WorkflowDefinition};
use forkkeep_core::{Error, Result};
use forkkeep_git::GitRepo;
use forkkeep_plugins::ActionRegistry;
use forkkeep_runner::{
    OutputLine, OutputStream, RunnerConfig, StepContext, StepResult, StepRunner, WorkflowExecutor,
};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What the mock saw for one executed step.
#[derive(Debug, Clone)]
struct Seen {
    name: String,
    run: Option<String>,
    with: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    secrets: BTreeMap<String, String>,
}

/// Records every step it is asked to run; fails the named ones.
#[derive(Clone, Default)]
struct MockRunner {
    seen: Arc<Mutex<Vec<Seen>>>,
    fail: Vec<String>,
    outputs: HashMap<String, HashMap<String, String>>,
}

impl MockRunner {
    fn failing(step: &str) -> Self {
        Self {
            fail: vec![step.to_string()],
            ..Self::default()
        }
    }

    fn with_output(mut self, step: &str, key: &str, value: &str) -> Self {
        self.outputs
            .entry(step.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    fn executed(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|s| s.name.clone()).collect()
    }

    fn seen(&self, step: &str) -> Seen {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name == step)
            .cloned()
            .unwrap()
    }
}

#[async_trait]
impl StepRunner for MockRunner {
    async fn execute(
        &self,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<StepResult> {
        self.seen.lock().unwrap().push(Seen {
            name: ctx.step.name.clone(),
            run: ctx.step.run.clone(),
            with: ctx.step.with.clone(),
            env: ctx.variables.clone(),
            secrets: ctx.credentials.values(),
        });
        let _ = output_tx
            .send(OutputLine::new(OutputStream::Stdout, "ok", 1))
            .await;

        if self.fail.contains(&ctx.step.name) {
            return Ok(StepResult {
                exit_code: 1,
                success: false,
                duration_ms: 0,
                outputs: HashMap::new(),
            });
        }
        Ok(StepResult::success(
            0,
            self.outputs.get(&ctx.step.name).cloned().unwrap_or_default(),
        ))
    }

    fn can_handle(&self, _step: &StepDefinition) -> bool {
        true
    }
}

fn workflow(name: &str) -> WorkflowDefinition {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../workflows")
        .join(format!("{}.yaml", name));
    WorkflowDefinition::load(&path).unwrap()
}

fn credentials(definition: &WorkflowDefinition) -> CredentialStore {
    CredentialStore::resolve(&definition.secrets, |var| Some(format!("value-of-{}", var))).unwrap()
}

fn executor(mock: &MockRunner) -> (tempfile::TempDir, WorkflowExecutor) {
    let dir = tempfile::tempdir().unwrap();
    let executor = WorkflowExecutor::with_runners(dir.path(), vec![Box::new(mock.clone())]);
    (dir, executor)
}

#[tokio::test]
async fn test_live_release_success_dispatches_sync_to_fork() {
    let wf = workflow("live-test-release");
    let mock = MockRunner::default().with_output("autoincrement", "version", "0.1.5");
    let (_dir, executor) = executor(&mock);

    let run = executor
        .execute(&wf, &TriggerEvent::push("master", &["scripts.py"]), &credentials(&wf))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(
        mock.executed(),
        vec!["clone", "install", "autoincrement", "commit-push", "release", "dispatch"]
    );

    let commit = mock.seen("commit-push");
    assert_eq!(commit.with["message"], "Version 0.1.5");
    assert_eq!(commit.with["repository"], "FriendsOfGalaxy/galaxy-integration-test");

    let release = mock.seen("release");
    let script = release.run.unwrap();
    for line in [
        r#"forkkeep build --platform windows --dir ../dist/windows --repo "FriendsOfGalaxy/galaxy-integration-test""#,
        r#"forkkeep build --platform macos --dir ../dist/macos --repo "FriendsOfGalaxy/galaxy-integration-test""#,
        r#"forkkeep release --dir ../dist --repo "FriendsOfGalaxy/galaxy-integration-test""#,
    ] {
        assert!(script.lines().any(|l| l.trim() == line), "missing {line}");
    }
    assert_eq!(release.env["GITHUB_TOKEN"], "value-of-TEST_REPO_TOKEN");

    let dispatch = mock.seen("dispatch");
    assert_eq!(dispatch.with["repository"], "FriendsOfGalaxy/test-integration-fork");
    assert_eq!(dispatch.with["event_type"], "sync");
    assert_eq!(
        dispatch.secrets.keys().collect::<Vec<_>>(),
        vec!["FORK_DISPATCH_TOKEN"]
    );
}

#[tokio::test]
async fn test_commit_push_failure_stops_release_and_dispatch() {
    let wf = workflow("live-test-release");
    let mock = MockRunner::failing("commit-push");
    let (_dir, executor) = executor(&mock);

    let run = executor
        .execute(&wf, &TriggerEvent::push("master", &["scripts.py"]), &credentials(&wf))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failure);
    assert_eq!(
        mock.executed(),
        vec!["clone", "install", "autoincrement", "commit-push"]
    );
    assert_eq!(run.failed_step().unwrap().name, "commit-push");
    assert_eq!(run.step("release").unwrap().status, StepStatus::Skipped);
    assert_eq!(run.step("dispatch").unwrap().status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_no_step_after_any_failure_executes() {
    let wf = workflow("live-test-release");
    let names: Vec<String> = wf.steps.iter().map(|s| s.name.clone()).collect();

    for (index, failing) in names.iter().enumerate() {
        let mock = MockRunner::failing(failing);
        let (_dir, executor) = executor(&mock);
        let run = executor
            .execute(&wf, &TriggerEvent::push("master", &["scripts.py"]), &credentials(&wf))
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Failure);
        assert_eq!(mock.executed(), names[..=index].to_vec(), "failing {failing}");
        assert!(
            run.steps[index + 1..]
                .iter()
                .all(|s| s.status == StepStatus::Skipped)
        );
    }
}

#[tokio::test]
async fn test_guard_mismatch_skips_run() {
    let wf = workflow("template-sync");
    let mock = MockRunner::default();
    let (_dir, executor) = executor(&mock);

    for event in [
        TriggerEvent::push("dev", &["templates/foo.json"]),
        TriggerEvent::dispatch("other_action"),
    ] {
        let run = executor
            .execute(&wf, &event, &credentials(&wf))
            .await
            .unwrap();
        assert_eq!(run.status, RunStatus::Skipped);
        assert!(run.steps.iter().all(|s| s.status == StepStatus::Skipped));
    }
    assert!(mock.executed().is_empty());
}

#[tokio::test]
async fn test_template_sync_exposes_token_only_to_update_step() {
    let wf = workflow("template-sync");
    let mock = MockRunner::default();
    let (_dir, executor) = executor(&mock);

    let run = executor
        .execute(&wf, &TriggerEvent::dispatch("update_templates"), &credentials(&wf))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Success);

    let fetch = mock.seen("fetch");
    assert_eq!(fetch.with["repository"], "FriendsOfGalaxy/galaxy-integrations-updater");
    assert_eq!(fetch.secrets.keys().collect::<Vec<_>>(), vec!["UPDATER_TOKEN"]);
    assert!(mock.seen("install").secrets.is_empty());
    let update = mock.seen("update-templates");
    assert_eq!(update.secrets.keys().collect::<Vec<_>>(), vec!["FOG_BOT_TOKEN"]);
    assert_eq!(update.env["GITHUB_TOKEN"], "value-of-FOG_BOT_TOKEN");
}

#[tokio::test]
async fn test_missing_runner_fails_step() {
    let wf = WorkflowDefinition::from_yaml(
        r#"
name: actions-only
on:
  repository_dispatch: {}
steps:
  - name: bump
    uses: no-such-action
  - name: after
    run: "true"
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let executor =
        WorkflowExecutor::new(dir.path(), RunnerConfig::default(), ActionRegistry::new());

    let run = executor
        .execute(&wf, &TriggerEvent::dispatch("anything"), &CredentialStore::new())
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Failure);
    assert!(
        run.step("bump")
            .unwrap()
            .error
            .as_deref()
            .unwrap()
            .contains("no-such-action")
    );
    assert_eq!(run.step("after").unwrap().status, StepStatus::Skipped);
}

#[tokio::test]
async fn test_shell_steps_pass_outputs_and_stop_on_exit_code() {
    let wf = WorkflowDefinition::from_yaml(
        r#"
name: shell
on:
  push: {}
env:
  GREETING: hello
steps:
  - name: produce
    run: echo "value=$GREETING-world" >> "$FORKKEEP_OUTPUT"
  - name: consume
    run: test "${{ steps.produce.outputs.value }}" = "hello-world"
  - name: fail
    run: exit 7
  - name: never
    run: touch never-ran
"#,
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let executor =
        WorkflowExecutor::new(dir.path(), RunnerConfig::default(), ActionRegistry::new());

    let run = executor
        .execute(&wf, &TriggerEvent::push("master", &[]), &CredentialStore::new())
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failure);
    assert_eq!(run.step("produce").unwrap().outputs["value"], "hello-world");
    assert_eq!(run.step("consume").unwrap().status, StepStatus::Success);
    assert_eq!(run.step("fail").unwrap().exit_code, Some(7));
    assert_eq!(run.step("never").unwrap().status, StepStatus::Skipped);
    assert!(!dir.path().join("never-ran").exists());
}

#[tokio::test]
async fn test_undeclared_secret_at_runtime_fails_step() {
    let mut wf = workflow("template-sync");
    // Bypass validation to simulate a store missing the declared credential.
    wf.secrets.retain(|s| s.name != "FOG_BOT_TOKEN");
    let mock = MockRunner::default();
    let (_dir, executor) = executor(&mock);

    let run = executor
        .execute(&wf, &TriggerEvent::dispatch("update_templates"), &credentials(&wf))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Failure);
    assert_eq!(mock.executed(), vec!["fetch", "install"]);
    let error = run.failed_step().unwrap().error.clone().unwrap();
    assert!(error.contains(&Error::MissingCredential("FOG_BOT_TOKEN".into()).to_string()));
}

/// Bare repository holding a minimal updater checkout.
async fn updater_remote(root: &std::path::Path) -> String {
    let seed = GitRepo::init(&root.join("seed"), "master").await.unwrap();
    seed.configure_user("seed", "seed@example.invalid").await.unwrap();
    std::fs::create_dir_all(seed.dir().join("templates")).unwrap();
    std::fs::write(seed.dir().join("templates/README.md"), "# template\n").unwrap();
    std::fs::write(seed.dir().join("requirements.txt"), "PyGithub\n").unwrap();
    std::fs::write(seed.dir().join("update_templates.py"), "").unwrap();
    seed.add_all().await.unwrap();
    seed.commit("seed").await.unwrap();

    let remote = root.join("updater.git");
    GitRepo::open(root)
        .run(&[
            "clone",
            "--bare",
            &seed.dir().to_string_lossy(),
            &remote.to_string_lossy(),
        ])
        .await
        .unwrap();
    remote.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_template_sync_fetches_into_fresh_workspace() {
    let root = tempfile::tempdir().unwrap();
    let remote = updater_remote(root.path()).await;

    let mut wf = workflow("template-sync");
    wf.env.insert("UPDATER_REPO".into(), remote);
    // Keep the shipped steps but swap python out for checks on the checkout.
    for step in &mut wf.steps {
        match step.name.as_str() {
            "install" => step.run = Some("test -f requirements.txt".into()),
            "update-templates" => {
                step.run = Some(
                    r#"test -f update_templates.py && test "$GITHUB_TOKEN" = "bot-token""#.into(),
                )
            }
            _ => {}
        }
    }
    let credentials = CredentialStore::resolve(&wf.secrets, |var| match var {
        "FOG_BOT_TOKEN" => Some("bot-token".into()),
        _ => Some("updater-token".into()),
    })
    .unwrap();

    let workspace = root.path().join("runs/template-sync");
    let executor =
        WorkflowExecutor::new(&workspace, RunnerConfig::default(), ActionRegistry::new());
    let run = executor
        .execute(&wf, &TriggerEvent::dispatch("update_templates"), &credentials)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Success, "{:?}", run.failed_step());
    assert!(run.steps.iter().all(|s| s.status == StepStatus::Success));
    assert!(workspace.join("updater/templates/README.md").is_file());
}
