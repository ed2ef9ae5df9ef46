//! Workflow execution: guard, then steps in order, stopping at the first
//! failure.

use crate::action::ActionRunner;
use crate::runner::{OutputLine, OutputStream, RunnerConfig, StepContext, StepRunner};
use crate::shell::ShellRunner;
use forkkeep_core::credentials::CredentialStore;
use forkkeep_core::interpolation::InterpolationContext;
use forkkeep_core::run::{RunStatus, StepStatus, WorkflowRun};
use forkkeep_core::trigger::TriggerEvent;
use forkkeep_core::workflow::{StepDefinition, WorkflowDefinition};
use forkkeep_core::{Error, Result};
use forkkeep_plugins::ActionRegistry;
use forkkeep_scheduler::TriggerMatcher;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Executes one workflow run against its own workspace directory.
pub struct WorkflowExecutor {
    workspace: PathBuf,
    runners: Vec<Box<dyn StepRunner>>,
    matcher: TriggerMatcher,
}

impl WorkflowExecutor {
    /// Executor with the shell and built-in action runners.
    pub fn new(
        workspace: impl Into<PathBuf>,
        config: RunnerConfig,
        registry: ActionRegistry,
    ) -> Self {
        Self::with_runners(
            workspace,
            vec![
                Box::new(ShellRunner::new(config)),
                Box::new(ActionRunner::new(registry)),
            ],
        )
    }

    pub fn with_runners(workspace: impl Into<PathBuf>, runners: Vec<Box<dyn StepRunner>>) -> Self {
        Self {
            workspace: workspace.into(),
            runners,
            matcher: TriggerMatcher::new(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Run `definition` for `event`.
    ///
    /// A guard mismatch is not an error: the run comes back `Skipped` with
    /// every step skipped. Step failures are recorded in the returned run,
    /// not returned as `Err`.
    pub async fn execute(
        &self,
        definition: &WorkflowDefinition,
        event: &TriggerEvent,
        credentials: &CredentialStore,
    ) -> Result<WorkflowRun> {
        let mut run = WorkflowRun::start(
            &definition.name,
            event.clone(),
            definition.steps.iter().map(|s| s.name.as_str()),
        );

        if !self.matcher.matches(&definition.triggers, event) {
            info!(run_id = %run.id, workflow = %definition.name, event = event.kind(), "Trigger guard did not match, skipping");
            run.finish(RunStatus::Skipped);
            return Ok(run);
        }

        tokio::fs::create_dir_all(&self.workspace).await?;
        info!(run_id = %run.id, workflow = %definition.name, event = event.kind(), "Starting workflow run");

        let mut interp = InterpolationContext::with_event(event.clone());
        interp.variables = definition.env.clone();

        let limit = Duration::from_secs(u64::from(definition.timeout_minutes) * 60);
        let started = Instant::now();
        let mut status = RunStatus::Success;

        for (index, step) in definition.steps.iter().enumerate() {
            let remaining = limit.saturating_sub(started.elapsed());
            run.steps[index].status = StepStatus::Running;
            let step_start = Instant::now();

            let outcome = if remaining.is_zero() {
                Err(Error::WorkflowTimeout {
                    workflow: definition.name.clone(),
                    minutes: definition.timeout_minutes,
                })
            } else {
                match tokio::time::timeout(remaining, self.run_step(step, &interp, credentials))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(Error::WorkflowTimeout {
                        workflow: definition.name.clone(),
                        minutes: definition.timeout_minutes,
                    }),
                }
            };

            let record = &mut run.steps[index];
            record.duration_ms = Some(step_start.elapsed().as_millis() as u64);

            match outcome {
                Ok(result) if result.success => {
                    for (key, value) in &result.outputs {
                        interp.set_output(&step.name, key, value.clone());
                    }
                    record.status = StepStatus::Success;
                    record.exit_code = Some(result.exit_code);
                    record.outputs = result.outputs;
                    info!(run_id = %run.id, step = %step.name, duration_ms = result.duration_ms, "Step succeeded");
                }
                Ok(result) => {
                    record.status = StepStatus::Failure;
                    record.exit_code = Some(result.exit_code);
                    record.error = Some(
                        Error::StepFailed {
                            step: step.name.clone(),
                            exit_code: result.exit_code,
                        }
                        .to_string(),
                    );
                    error!(run_id = %run.id, step = %step.name, exit_code = result.exit_code, "Step failed");
                    status = RunStatus::Failure;
                    break;
                }
                Err(e) => {
                    let message = credentials.mask(&e.to_string());
                    error!(run_id = %run.id, step = %step.name, error = %message, "Step failed");
                    record.status = StepStatus::Failure;
                    record.error = Some(message);
                    status = RunStatus::Failure;
                    break;
                }
            }
        }

        run.finish(status);
        info!(
            run_id = %run.id,
            workflow = %run.workflow,
            status = ?run.status,
            duration_ms = run.duration_ms.unwrap_or_default(),
            "Workflow run finished"
        );
        Ok(run)
    }

    async fn run_step(
        &self,
        step: &StepDefinition,
        interp: &InterpolationContext,
        credentials: &CredentialStore,
    ) -> Result<crate::runner::StepResult> {
        let exposed = credentials.subset(&step.secrets)?;
        let mut scope = interp.clone();
        scope.secrets = exposed.values();

        let mut variables = scope.variables.clone();
        for (key, value) in &step.env {
            variables.insert(key.clone(), scope.interpolate(value));
        }
        scope.variables = variables.clone();

        let mut resolved = step.clone();
        resolved.run = step.run.as_deref().map(|r| scope.interpolate(r));
        resolved.working_directory = step
            .working_directory
            .as_deref()
            .map(|d| scope.interpolate(d));
        resolved.with = step
            .with
            .iter()
            .map(|(k, v)| (k.clone(), scope.interpolate(v)))
            .collect();
        resolved.env = variables.clone();

        let runner = self
            .runners
            .iter()
            .find(|r| r.can_handle(&resolved))
            .ok_or_else(|| {
                Error::UnknownAction(resolved.uses.clone().unwrap_or_else(|| step.name.clone()))
            })?;

        let ctx = StepContext {
            workspace: self.workspace.clone(),
            variables,
            credentials: exposed,
            step: resolved,
        };

        let (tx, mut rx) = mpsc::channel::<OutputLine>(256);
        let masker = credentials.clone();
        let step_name = step.name.clone();
        let log_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                let content = masker.mask(&line.content);
                match line.stream {
                    OutputStream::Stdout => info!(step = %step_name, line = line.line_number, "{}", content),
                    OutputStream::Stderr => warn!(step = %step_name, line = line.line_number, "{}", content),
                }
            }
        });

        let result = runner.execute(&ctx, tx).await;
        let _ = log_task.await;
        result
    }
}
