//! Run and step records.

use crate::ids::RunId;
use crate::trigger::TriggerEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub workflow: String,
    pub trigger: TriggerEvent,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl WorkflowRun {
    /// A new run with every step pending.
    pub fn start<'a>(
        workflow: &str,
        trigger: TriggerEvent,
        step_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            id: RunId::new(),
            workflow: workflow.to_string(),
            trigger,
            status: RunStatus::Running,
            steps: step_names.into_iter().map(StepRecord::pending).collect(),
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Close the run with a terminal status; pending steps become skipped.
    pub fn finish(&mut self, status: RunStatus) {
        for step in &mut self.steps {
            if step.status == StepStatus::Pending {
                step.status = StepStatus::Skipped;
            }
        }
        let now = Utc::now();
        self.status = status;
        self.duration_ms = Some((now - self.started_at).num_milliseconds().max(0) as u64);
        self.completed_at = Some(now);
    }

    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == StepStatus::Failure)
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Names of steps that actually ran, in order.
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Success | StepStatus::Failure))
            .map(|s| s.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failure,
    Skipped,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Failure | RunStatus::Skipped
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Skipped)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub outputs: HashMap<String, String>,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

impl StepRecord {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Pending,
            exit_code: None,
            outputs: HashMap::new(),
            error: None,
            duration_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failure,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_skips_pending_steps() {
        let mut run = WorkflowRun::start("wf", TriggerEvent::dispatch("x"), ["a", "b", "c"]);
        run.steps[0].status = StepStatus::Success;
        run.steps[1].status = StepStatus::Failure;
        run.finish(RunStatus::Failure);

        assert_eq!(run.steps[2].status, StepStatus::Skipped);
        assert_eq!(run.failed_step().unwrap().name, "b");
        assert_eq!(run.executed_steps(), vec!["a", "b"]);
        assert!(run.status.is_terminal());
        assert!(!run.status.is_success());
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn test_skipped_run_counts_as_success() {
        assert!(RunStatus::Skipped.is_success());
        assert!(!RunStatus::Running.is_terminal());
    }
}
