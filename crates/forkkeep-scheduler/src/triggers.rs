//! Trigger matching: decides whether a workflow runs for an event.

use forkkeep_core::trigger::{DispatchTrigger, PushTrigger, TriggerEvent, WorkflowTriggers};

/// Matcher for determining if a workflow should be triggered.
pub struct TriggerMatcher;

impl TriggerMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Check if a workflow's triggers accept an event.
    pub fn matches(&self, triggers: &WorkflowTriggers, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::Push {
                branch,
                paths_changed,
            } => triggers
                .push
                .as_ref()
                .is_some_and(|push| self.push_matches(push, branch, paths_changed)),
            TriggerEvent::Dispatch { action } => triggers
                .repository_dispatch
                .as_ref()
                .is_some_and(|dispatch| self.dispatch_matches(dispatch, action)),
        }
    }

    fn push_matches(&self, trigger: &PushTrigger, branch: &str, changed: &[String]) -> bool {
        self.branch_matches(&trigger.branches, branch)
            && self.paths_match(&trigger.paths, &trigger.paths_ignore, changed)
    }

    fn dispatch_matches(&self, trigger: &DispatchTrigger, action: &str) -> bool {
        trigger.types.is_empty() || trigger.types.iter().any(|t| t == action)
    }

    fn branch_matches(&self, patterns: &[String], branch: &str) -> bool {
        if patterns.is_empty() {
            return true; // Match all branches if no patterns specified
        }
        patterns.iter().any(|p| self.glob_match(p, branch))
    }

    fn paths_match(&self, include: &[String], exclude: &[String], changed: &[String]) -> bool {
        if include.is_empty() && exclude.is_empty() {
            return true; // No path filtering
        }
        if changed.is_empty() {
            return false;
        }

        let included = if include.is_empty() {
            true
        } else {
            changed
                .iter()
                .any(|path| include.iter().any(|p| self.glob_match(p, path)))
        };

        let excluded = !exclude.is_empty()
            && changed
                .iter()
                .all(|path| exclude.iter().any(|p| self.glob_match(p, path)));

        included && !excluded
    }

    fn glob_match(&self, pattern: &str, text: &str) -> bool {
        if pattern == "*" || pattern == "**" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix("/**") {
            return text
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'));
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            let prefix_slash = format!("{}/", prefix);
            return text
                .strip_prefix(&prefix_slash)
                .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'));
        }
        if pattern.contains('*') {
            let parts: Vec<&str> = pattern.split('*').collect();
            if parts.len() == 2 {
                return text.len() >= parts[0].len() + parts[1].len()
                    && text.starts_with(parts[0])
                    && text.ends_with(parts[1]);
            }
        }
        pattern == text
    }
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new()
    }
}
