//! Shell-based step execution on the host.

use crate::runner::{OutputLine, OutputStream, RunnerConfig, StepContext, StepResult, StepRunner};
use async_trait::async_trait;
use forkkeep_core::workflow::StepDefinition;
use forkkeep_core::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Environment variable naming the file a step appends `key=value`
/// outputs to.
pub const OUTPUT_FILE_VAR: &str = "FORKKEEP_OUTPUT";

/// Shell runner for executing commands on the host.
pub struct ShellRunner {
    config: RunnerConfig,
}

impl ShellRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    async fn execute_command(
        &self,
        command: &str,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<StepResult> {
        let start = std::time::Instant::now();
        let dir = ctx.working_dir();
        let output_file = tempfile::NamedTempFile::new()?;

        info!(step = %ctx.step.name, workspace = %dir.display(), "Executing shell command");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&dir)
            .envs(&ctx.variables)
            .envs(ctx.credentials.values())
            .env(OUTPUT_FILE_VAR, output_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Internal(format!("Failed to spawn process: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("stderr not captured".into()))?;

        let stdout_handle = stream_lines(stdout, OutputStream::Stdout, output_tx.clone());
        let stderr_handle = stream_lines(stderr, OutputStream::Stderr, output_tx);

        let limit = self.config.step_timeout(&ctx.step);
        let status = match timeout(limit, child.wait()).await {
            Ok(result) => {
                result.map_err(|e| Error::Internal(format!("Failed to wait for process: {}", e)))?
            }
            Err(_) => {
                warn!(step = %ctx.step.name, seconds = limit.as_secs(), "Command timed out, killing process");
                let _ = child.kill().await;
                stdout_handle.abort();
                stderr_handle.abort();
                return Err(Error::StepTimeout {
                    step: ctx.step.name.clone(),
                    seconds: limit.as_secs(),
                });
            }
        };

        let _ = stdout_handle.await;
        let _ = stderr_handle.await;

        let exit_code = status.code().unwrap_or(-1);
        let duration_ms = start.elapsed().as_millis() as u64;
        let outputs = read_outputs(output_file.path())?;

        debug!(exit_code, duration_ms, outputs = outputs.len(), "Command completed");

        Ok(StepResult {
            exit_code,
            success: exit_code == 0,
            duration_ms,
            outputs,
        })
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

fn stream_lines<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::Sender<OutputLine>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut line_num = 0u32;
        while let Ok(Some(line)) = lines.next_line().await {
            line_num += 1;
            if tx.send(OutputLine::new(stream, line, line_num)).await.is_err() {
                break;
            }
        }
    })
}

/// Parse `key=value` lines; later keys win.
fn read_outputs(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .collect())
}

#[async_trait]
impl StepRunner for ShellRunner {
    async fn execute(
        &self,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<StepResult> {
        let command = ctx
            .step
            .run
            .as_ref()
            .ok_or_else(|| Error::Internal("No command to run".to_string()))?;
        self.execute_command(command, ctx, output_tx).await
    }

    fn can_handle(&self, step: &StepDefinition) -> bool {
        step.run.is_some() && step.uses.is_none()
    }
}
