//! Runs `uses:` steps through the built-in actions.

use crate::runner::{OutputLine, OutputStream, StepContext, StepResult, StepRunner};
use async_trait::async_trait;
use forkkeep_core::workflow::StepDefinition;
use forkkeep_core::{Error, Result};
use forkkeep_plugins::{ActionInput, ActionRegistry};
use tokio::sync::mpsc;
use tracing::info;

pub struct ActionRunner {
    registry: ActionRegistry,
}

impl ActionRunner {
    pub fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }
}

impl Default for ActionRunner {
    fn default() -> Self {
        Self::new(ActionRegistry::default())
    }
}

#[async_trait]
impl StepRunner for ActionRunner {
    async fn execute(
        &self,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
    ) -> Result<StepResult> {
        let start = std::time::Instant::now();
        let name = ctx
            .step
            .uses
            .as_deref()
            .ok_or_else(|| Error::Internal("No action to run".to_string()))?;
        let action = self
            .registry
            .get(name)
            .ok_or_else(|| Error::UnknownAction(name.to_string()))?;

        let input = ActionInput {
            step_name: ctx.step.name.clone(),
            workspace: ctx.working_dir(),
            params: ctx.step.with.clone(),
            credentials: ctx.credentials.clone(),
        };

        info!(step = %ctx.step.name, action = %name, "Running action");
        let output = action.execute(&input).await?;

        for (line_number, (key, value)) in output.outputs.iter().enumerate() {
            let line = OutputLine::new(
                OutputStream::Stdout,
                format!("{}={}", key, value),
                line_number as u32 + 1,
            );
            if output_tx.send(line).await.is_err() {
                break;
            }
        }

        Ok(StepResult::success(
            start.elapsed().as_millis() as u64,
            output.outputs,
        ))
    }

    fn can_handle(&self, step: &StepDefinition) -> bool {
        step.uses.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forkkeep_core::credentials::CredentialStore;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_unknown_action() {
        let runner = ActionRunner::default();
        let (tx, _rx) = mpsc::channel(8);
        let ctx = StepContext {
            workspace: std::env::temp_dir(),
            variables: BTreeMap::new(),
            credentials: CredentialStore::new(),
            step: StepDefinition::action("x", "docker-build"),
        };
        let err = runner.execute(&ctx, tx).await.unwrap_err();
        assert!(matches!(err, Error::UnknownAction(ref n) if n == "docker-build"));
    }

    #[tokio::test]
    async fn test_version_bump_reports_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("manifest.json"), r#"{"version": "1.2"}"#).unwrap();

        let runner = ActionRunner::default();
        let (tx, mut rx) = mpsc::channel(8);
        let ctx = StepContext {
            workspace: dir.path().to_path_buf(),
            variables: BTreeMap::new(),
            credentials: CredentialStore::new(),
            step: StepDefinition::action("autoincrement", "version-bump"),
        };
        let result = runner.execute(&ctx, tx).await.unwrap();
        assert!(result.success);
        assert_eq!(result.outputs["version"], "1.3");
        assert_eq!(rx.recv().await.unwrap().content, "version=1.3");
    }
}
