//! Workflow definition types.
//!
//! These types represent the YAML workflow files shipped in `workflows/`.
//! A workflow is a guard (`on:`) plus a strictly linear list of steps.

use crate::credentials::CredentialBinding;
use crate::error::{Error, Result};
use crate::trigger::WorkflowTriggers;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "on")]
    pub triggers: WorkflowTriggers,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub secrets: Vec<CredentialBinding>,
    #[serde(default = "default_timeout")]
    pub timeout_minutes: u32,
    pub steps: Vec<StepDefinition>,
}

fn default_timeout() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub uses: Option<String>,
    #[serde(default)]
    pub with: BTreeMap<String, String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub secrets: Vec<String>,
    #[serde(default = "default_step_timeout")]
    pub timeout_minutes: u32,
}

fn default_step_timeout() -> u32 {
    10
}

impl StepDefinition {
    /// A shell step with default settings.
    pub fn shell(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: Some(run.into()),
            uses: None,
            with: BTreeMap::new(),
            env: BTreeMap::new(),
            working_directory: None,
            secrets: Vec::new(),
            timeout_minutes: default_step_timeout(),
        }
    }

    /// A built-in action step with default settings.
    pub fn action(name: impl Into<String>, uses: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: None,
            uses: Some(uses.into()),
            with: BTreeMap::new(),
            env: BTreeMap::new(),
            working_directory: None,
            secrets: Vec::new(),
            timeout_minutes: default_step_timeout(),
        }
    }
}

impl WorkflowDefinition {
    /// Parse a workflow from YAML and validate it.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let definition: WorkflowDefinition = serde_yaml::from_str(content)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Load and validate a workflow file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::WorkflowNotFound(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Load every `*.yaml`/`*.yml` workflow in a directory, sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        paths.sort();
        paths.iter().map(|p| Self::load(p)).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidWorkflow("workflow name is empty".into()));
        }
        if self.triggers.is_empty() {
            return Err(Error::InvalidWorkflow(format!(
                "workflow '{}' declares no triggers",
                self.name
            )));
        }
        if self.steps.is_empty() {
            return Err(Error::InvalidWorkflow(format!(
                "workflow '{}' has no steps",
                self.name
            )));
        }

        let declared: HashSet<&str> = self.secrets.iter().map(|s| s.name.as_str()).collect();
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(Error::InvalidWorkflow(format!(
                    "duplicate step name '{}'",
                    step.name
                )));
            }
            match (&step.run, &step.uses) {
                (Some(_), Some(_)) => {
                    return Err(Error::InvalidWorkflow(format!(
                        "step '{}' sets both run and uses",
                        step.name
                    )));
                }
                (None, None) => {
                    return Err(Error::InvalidWorkflow(format!(
                        "step '{}' needs run or uses",
                        step.name
                    )));
                }
                _ => {}
            }
            if let Some(missing) = step.secrets.iter().find(|s| !declared.contains(s.as_str())) {
                return Err(Error::InvalidWorkflow(format!(
                    "step '{}' references undeclared secret '{}'",
                    step.name, missing
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE_SYNC: &str = r#"
name: template-sync
on:
  push:
    branches: [master]
    paths: ["templates/**"]
  repository_dispatch:
    types: [update_templates]
secrets:
  - name: BOT_TOKEN
    env: BOT_TOKEN
steps:
  - name: install
    run: pip install -r requirements.txt
  - name: update
    run: python update_templates.py
    secrets: [BOT_TOKEN]
    env:
      GITHUB_TOKEN: "${{ secrets.BOT_TOKEN }}"
"#;

    #[test]
    fn test_parse_workflow() {
        let wf = WorkflowDefinition::from_yaml(TEMPLATE_SYNC).unwrap();
        assert_eq!(wf.name, "template-sync");
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.timeout_minutes, 30);
        assert_eq!(wf.steps[1].timeout_minutes, 10);
        let push = wf.triggers.push.as_ref().unwrap();
        assert_eq!(push.branches, vec!["master"]);
        assert_eq!(
            wf.triggers.repository_dispatch.as_ref().unwrap().types,
            vec!["update_templates"]
        );
    }

    #[test]
    fn test_reject_duplicate_steps() {
        let yaml = r#"
name: dup
on:
  push: {}
steps:
  - name: a
    run: "true"
  - name: a
    run: "true"
"#;
        let err = WorkflowDefinition::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate step name"));
    }

    #[test]
    fn test_reject_run_and_uses() {
        let yaml = r#"
name: both
on:
  push: {}
steps:
  - name: a
    run: "true"
    uses: version-bump
"#;
        assert!(WorkflowDefinition::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_reject_undeclared_secret() {
        let yaml = r#"
name: leak
on:
  repository_dispatch: {}
steps:
  - name: a
    run: "true"
    secrets: [TOKEN]
"#;
        let err = WorkflowDefinition::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("undeclared secret"));
    }

    #[test]
    fn test_reject_missing_triggers() {
        let yaml = r#"
name: idle
on: {}
steps:
  - name: a
    run: "true"
"#;
        assert!(WorkflowDefinition::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = WorkflowDefinition::load(Path::new("/nonexistent/wf.yaml")).unwrap_err();
        assert!(matches!(err, Error::WorkflowNotFound(_)));
    }
}
