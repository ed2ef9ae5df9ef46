//! Selects the workflows an event should start.

use crate::triggers::TriggerMatcher;
use forkkeep_core::trigger::TriggerEvent;
use forkkeep_core::workflow::WorkflowDefinition;
use tracing::{debug, info};

/// Holds the loaded workflow definitions and evaluates their guards.
pub struct Scheduler {
    workflows: Vec<WorkflowDefinition>,
    matcher: TriggerMatcher,
}

impl Scheduler {
    pub fn new(workflows: Vec<WorkflowDefinition>) -> Self {
        Self {
            workflows,
            matcher: TriggerMatcher::new(),
        }
    }

    pub fn workflows(&self) -> &[WorkflowDefinition] {
        &self.workflows
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.workflows.iter().find(|w| w.name == name)
    }

    /// Whether a single workflow's guard accepts the event.
    pub fn should_run(&self, workflow: &WorkflowDefinition, event: &TriggerEvent) -> bool {
        let matched = self.matcher.matches(&workflow.triggers, event);
        debug!(
            workflow = %workflow.name,
            event = event.kind(),
            matched,
            "Evaluated trigger guard"
        );
        matched
    }

    /// Every workflow whose guard accepts the event, in definition order.
    /// A workflow appears at most once even if several filters match.
    pub fn select(&self, event: &TriggerEvent) -> Vec<&WorkflowDefinition> {
        let selected: Vec<&WorkflowDefinition> = self
            .workflows
            .iter()
            .filter(|w| self.should_run(w, event))
            .collect();

        info!(
            event = event.kind(),
            selected = selected.len(),
            total = self.workflows.len(),
            "Selected workflows for event"
        );
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE_SYNC: &str = r#"
name: template-sync
on:
  push:
    branches: [master]
    paths: ["templates/**"]
  repository_dispatch:
    types: [update_templates]
steps:
  - name: update
    run: python update_templates.py
"#;

    const LIVE_TEST: &str = r#"
name: live-test-release
on:
  push:
    branches: [master]
    paths: [scripts.py]
steps:
  - name: release
    run: forkkeep release --dir dist
"#;

    const ANY_PUSH: &str = r#"
name: any-push
on:
  push:
    branches: ["*"]
    paths: ["templates/**", "*.py"]
steps:
  - name: noop
    run: "true"
"#;

    fn scheduler() -> Scheduler {
        Scheduler::new(
            [TEMPLATE_SYNC, LIVE_TEST, ANY_PUSH]
                .iter()
                .map(|y| WorkflowDefinition::from_yaml(y).unwrap())
                .collect(),
        )
    }

    fn names<'a>(selected: &[&'a WorkflowDefinition]) -> Vec<&'a str> {
        selected.iter().map(|w| w.name.as_str()).collect()
    }

    #[test]
    fn test_select_in_definition_order() {
        let s = scheduler();
        let event = TriggerEvent::push("master", &["templates/foo.json", "scripts.py"]);
        assert_eq!(
            names(&s.select(&event)),
            vec!["template-sync", "live-test-release", "any-push"]
        );
    }

    #[test]
    fn test_select_once_per_workflow() {
        let s = scheduler();
        // Both path filters of any-push match; it is still selected once.
        let event = TriggerEvent::push("dev", &["templates/a.json", "setup.py"]);
        assert_eq!(names(&s.select(&event)), vec!["any-push"]);
    }

    #[test]
    fn test_dispatch_selects_only_matching_type() {
        let s = scheduler();
        assert_eq!(
            names(&s.select(&TriggerEvent::dispatch("update_templates"))),
            vec!["template-sync"]
        );
        assert!(s.select(&TriggerEvent::dispatch("other_action")).is_empty());
    }

    #[test]
    fn test_should_run_is_deterministic() {
        let s = scheduler();
        let wf = s.get("template-sync").unwrap();
        let event = TriggerEvent::push("master", &["templates/foo.json"]);
        let first = s.should_run(wf, &event);
        for _ in 0..10 {
            assert_eq!(s.should_run(wf, &event), first);
        }
        assert!(!s.should_run(wf, &TriggerEvent::push("dev", &["templates/foo.json"])));
    }
}
