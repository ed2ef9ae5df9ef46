//! Command handlers.

use crate::config::CliConfig;
use anyhow::{Context as _, Result, anyhow};
use console::style;
use forkkeep_core::credentials::CredentialStore;
use forkkeep_core::run::{StepRecord, StepStatus};
use forkkeep_core::trigger::TriggerEvent;
use forkkeep_core::workflow::WorkflowDefinition;
use forkkeep_git::GitRepo;
use forkkeep_github::GitHubClient;
use forkkeep_runner::{RunnerConfig, WorkflowExecutor};
use forkkeep_scheduler::Scheduler;
use forkkeep_tasks::onboard::OnboardOptions;
use forkkeep_tasks::{BuildOptions, ForkManager, Platform, VALIDATION_EVENT};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Settings every handler can draw on.
pub struct Context {
    pub config: CliConfig,
    token: Option<String>,
    repo: Option<String>,
}

impl Context {
    pub fn new(config: CliConfig, token: Option<String>, repo: Option<String>) -> Self {
        Self {
            config,
            token: token.filter(|t| !t.is_empty()),
            repo,
        }
    }

    fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow!("GitHub token not found"))
    }

    /// `--repo`, or `<owner>/<current dir name>`.
    fn repo(&self) -> Result<String> {
        if let Some(repo) = &self.repo {
            return Ok(repo.clone());
        }
        let cwd = std::env::current_dir()?;
        let name = cwd
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("cannot derive repository name from {}", cwd.display()))?;
        Ok(format!("{}/{}", self.config.owner.login, name))
    }

    fn client(&self) -> Result<GitHubClient> {
        Ok(GitHubClient::with_base_url(&self.config.api_url, self.token()?))
    }

    async fn manager(&self) -> Result<ForkManager> {
        let repo = self.repo()?;
        ForkManager::connect(self.client()?, &repo)
            .await
            .with_context(|| format!("connecting to {}", repo))
    }
}

/// Load the workflows `selector` refers to: a single file, or the configured
/// workflows directory. Returns the scheduler and the workflow name.
fn load_workflows(ctx: &Context, selector: &str) -> Result<(Scheduler, String)> {
    let path = Path::new(selector);
    if path.is_file() {
        let definition = WorkflowDefinition::load(path)?;
        let name = definition.name.clone();
        return Ok((Scheduler::new(vec![definition]), name));
    }
    let workflows = WorkflowDefinition::load_dir(&ctx.config.workflows_dir)
        .with_context(|| format!("loading {}", ctx.config.workflows_dir.display()))?;
    debug!(dir = %ctx.config.workflows_dir.display(), count = workflows.len(), "Loaded workflows");
    Ok((Scheduler::new(workflows), selector.to_string()))
}

/// Read an event file. With a GitHub event name the file is a webhook
/// payload; otherwise it is a serialized [`TriggerEvent`].
fn load_event(path: &Path, event_name: Option<&str>) -> Result<TriggerEvent> {
    let content =
        std::fs::read(path).with_context(|| format!("reading event {}", path.display()))?;
    let event = match event_name {
        Some(name) => TriggerEvent::from_github(name, &serde_json::from_slice(&content)?)?,
        None => serde_json::from_slice(&content)?,
    };
    Ok(event)
}

fn selected<'a>(scheduler: &'a Scheduler, name: &str) -> Result<&'a WorkflowDefinition> {
    scheduler
        .get(name)
        .ok_or_else(|| forkkeep_core::Error::WorkflowNotFound(name.to_string()).into())
}

/// Print `run` or `skip`; returns whether the workflow runs.
pub fn guard(
    ctx: &Context,
    workflow: &str,
    event: &Path,
    event_name: Option<&str>,
) -> Result<bool> {
    let (scheduler, name) = load_workflows(ctx, workflow)?;
    let definition = selected(&scheduler, &name)?;
    let event = load_event(event, event_name)?;

    let run = scheduler.should_run(definition, &event);
    debug!(workflow = %name, run, "Guard decision");
    println!("{}", if run { "run" } else { "skip" });
    Ok(run)
}

fn print_step(step: &StepRecord) {
    let marker = match step.status {
        StepStatus::Success => style("✓").green(),
        StepStatus::Failure => style("✗").red(),
        _ => style("-").dim(),
    };
    let duration = step
        .duration_ms
        .map(|ms| format!(" ({}ms)", ms))
        .unwrap_or_default();
    println!("  {} {}{}", marker, step.name, style(duration).dim());
    if let Some(error) = &step.error {
        println!("    {}", style(error).red());
    }
}

/// Execute a workflow; returns whether the run succeeded.
pub async fn run(
    ctx: &Context,
    workflow: &str,
    event: &Path,
    event_name: Option<&str>,
    workspace: Option<PathBuf>,
) -> Result<bool> {
    let (scheduler, name) = load_workflows(ctx, workflow)?;
    let definition = selected(&scheduler, &name)?;
    let event = load_event(event, event_name)?;

    if !scheduler.should_run(definition, &event) {
        println!(
            "{} {} skipped for {} event",
            style("i").blue(),
            style(&definition.name).bold(),
            event.kind()
        );
        return Ok(true);
    }

    let credentials = CredentialStore::from_env(&definition.secrets)?;
    let temp;
    let workspace = match workspace {
        Some(dir) => dir,
        None => {
            temp = tempfile::Builder::new().prefix("forkkeep-run-").tempdir()?;
            temp.path().to_path_buf()
        }
    };

    println!(
        "{} Running {} in {}",
        style("▶").cyan(),
        style(&definition.name).bold(),
        style(workspace.display()).dim()
    );
    let executor = WorkflowExecutor::new(
        workspace,
        RunnerConfig::default(),
        ctx.config.action_registry(),
    );
    let run = executor.execute(definition, &event, &credentials).await?;

    for step in &run.steps {
        print_step(step);
    }
    if run.status.is_success() {
        println!("{} Run {} succeeded", style("✓").green(), run.id);
    } else {
        println!("{} Run {} failed", style("✗").red(), run.id);
    }
    Ok(run.status.is_success())
}

pub fn validate(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&ctx.config.workflows_dir);
    let workflows = if path.is_dir() {
        WorkflowDefinition::load_dir(path)?
    } else {
        vec![WorkflowDefinition::load(path)?]
    };
    if workflows.is_empty() {
        println!("{} No workflows in {}", style("!").yellow(), path.display());
    }

    for workflow in &workflows {
        println!(
            "{} Workflow \"{}\" is valid",
            style("✓").green(),
            workflow.name
        );
        println!("  Steps: {}", workflow.steps.len());
        for step in &workflow.steps {
            let kind = step.uses.as_deref().unwrap_or("run");
            println!("    - {} ({})", step.name, kind);
        }
    }
    Ok(())
}

pub async fn sync(ctx: &Context, path: &Path) -> Result<()> {
    let manager = ctx.manager().await?;
    let repo = GitRepo::open(path);
    let changed = forkkeep_tasks::sync(&manager, &repo, &ctx.config.task_settings()).await?;

    if changed {
        manager.send_dispatch(VALIDATION_EVENT).await?;
        println!(
            "{} {} synced with {}",
            style("✓").green(),
            style(&manager.fork().full_name).bold(),
            manager.parent().full_name
        );
    } else {
        println!("{} Nothing to sync", style("i").blue());
    }
    Ok(())
}

pub async fn build(
    ctx: &Context,
    path: &Path,
    dir: &Path,
    platform: Option<Platform>,
) -> Result<()> {
    let platform = platform
        .or_else(Platform::host)
        .ok_or_else(|| {
            anyhow!("No build platform for this host; pass --platform windows or macos")
        })?;
    let options = BuildOptions {
        repo_root: path.to_path_buf(),
        output: dir.to_path_buf(),
        repo_name: ctx.repo()?,
        platform,
        install_command: ctx.config.install_command.clone(),
    };
    let manifest = forkkeep_tasks::build(&options).await?;
    println!(
        "{} Built into {}",
        style("✓").green(),
        style(manifest.parent().unwrap_or(dir).display()).bold()
    );
    Ok(())
}

pub async fn release(ctx: &Context, path: &Path, dir: &Path) -> Result<()> {
    let manager = ctx.manager().await?;
    let release = forkkeep_tasks::release(&manager, path, dir).await?;
    println!(
        "{} Released {} with {} assets",
        style("✓").green(),
        style(&release.tag_name).bold(),
        release.assets.len()
    );
    Ok(())
}

pub async fn update_release_file(ctx: &Context, path: &Path) -> Result<()> {
    let manager = ctx.manager().await?;
    let file = forkkeep_tasks::update_release_file(
        &manager,
        &GitRepo::open(path),
        &ctx.config.task_settings(),
    )
    .await?;
    println!(
        "{} current_version.json points at {}",
        style("✓").green(),
        style(&file.tag_name).bold()
    );
    Ok(())
}

pub async fn dispatch(ctx: &Context, target: &str, event: &str) -> Result<()> {
    ctx.client()?.repository_dispatch(target, event).await?;
    println!(
        "{} Sent {} to {}",
        style("✓").green(),
        style(event).bold(),
        target
    );
    Ok(())
}

pub async fn onboard(
    ctx: &Context,
    upstream: &str,
    bot_token: Option<String>,
    sync_config: PathBuf,
    timeout: u64,
) -> Result<()> {
    let client = ctx.client()?;
    let bot_token = bot_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("BOT_TOKEN required"))?;

    let mut options = OnboardOptions::new(
        upstream,
        sync_config,
        GitHubClient::with_base_url(&ctx.config.api_url, bot_token),
        ctx.config.bot.login.clone(),
    );
    options.invitation_timeout = Duration::from_secs(timeout);

    let report = forkkeep_tasks::onboard(&client, &options).await?;
    println!(
        "{} Onboarded {}",
        style("✓").green(),
        style(&report.fork).bold()
    );
    if report.added_to_config {
        println!("  Added to {}", options.sync_config.display());
    }
    if report.bot_invited {
        println!("  {} joined as collaborator", ctx.config.bot.login);
    }
    Ok(())
}
