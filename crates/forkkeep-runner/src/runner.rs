//! Core runner trait and types.

use async_trait::async_trait;
use forkkeep_core::Result;
use forkkeep_core::credentials::CredentialStore;
use forkkeep_core::workflow::StepDefinition;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line from step execution.
#[derive(Debug, Clone)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub content: String,
    pub line_number: u32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl OutputLine {
    pub fn new(stream: OutputStream, content: impl Into<String>, line_number: u32) -> Self {
        Self {
            stream,
            content: content.into(),
            line_number,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Output stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Result of step execution.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
    pub outputs: HashMap<String, String>,
}

impl StepResult {
    pub fn success(duration_ms: u64, outputs: HashMap<String, String>) -> Self {
        Self {
            exit_code: 0,
            success: true,
            duration_ms,
            outputs,
        }
    }
}

/// Context for step execution. `step` is already interpolated.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub workspace: PathBuf,
    /// Workflow env merged with the step's env.
    pub variables: BTreeMap<String, String>,
    /// Only the credentials the step declares.
    pub credentials: CredentialStore,
    pub step: StepDefinition,
}

impl StepContext {
    /// Directory the step runs in.
    pub fn working_dir(&self) -> PathBuf {
        match &self.step.working_directory {
            Some(dir) => self.workspace.join(dir),
            None => self.workspace.clone(),
        }
    }
}

/// Trait for step execution.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Execute a step, streaming output to the provided channel.
    async fn execute(
        &self,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<StepResult>;

    /// Check if this runner can handle the given step.
    fn can_handle(&self, step: &StepDefinition) -> bool;
}

/// Configuration for step execution. There are no retries: a failed step
/// fails the run.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Upper bound on any single step, on top of its own `timeout_minutes`.
    pub max_step_timeout: Option<Duration>,
}

impl RunnerConfig {
    /// Effective timeout for a step.
    pub fn step_timeout(&self, step: &StepDefinition) -> Duration {
        let own = Duration::from_secs(u64::from(step.timeout_minutes) * 60);
        match self.max_step_timeout {
            Some(cap) => own.min(cap),
            None => own,
        }
    }
}
