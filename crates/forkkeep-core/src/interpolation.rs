use crate::trigger::TriggerEvent;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{\{\s*([^}]+?)\s*\}\}").expect("valid interpolation regex"))
}

/// Context for `${{ ... }}` interpolation inside workflow steps.
#[derive(Debug, Clone, Default)]
pub struct InterpolationContext {
    /// Workflow and step env
    pub variables: BTreeMap<String, String>,
    /// Step outputs: "step_name.output_key" -> value
    pub outputs: HashMap<String, String>,
    /// Credentials visible to the current step
    pub secrets: BTreeMap<String, String>,
    /// Event that started the run
    pub event: Option<TriggerEvent>,
}

impl InterpolationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(event: TriggerEvent) -> Self {
        Self {
            event: Some(event),
            ..Self::default()
        }
    }

    /// Record a step output for later `steps.<name>.outputs.<key>` lookups.
    pub fn set_output(&mut self, step_name: &str, key: &str, value: impl Into<String>) {
        self.outputs
            .insert(format!("{}.{}", step_name, key), value.into());
    }

    /// Interpolate variables in a string.
    ///
    /// Supports:
    /// - `${{ variable }}` - direct variable lookup
    /// - `${{ env.VAR }}` - workflow/step env, then process env
    /// - `${{ secrets.NAME }}` - credential visible to the step
    /// - `${{ steps.name.outputs.key }}` - step output
    /// - `${{ event.branch }}`, `${{ event.action }}` - trigger event fields
    pub fn interpolate(&self, input: &str) -> String {
        expression_regex()
            .replace_all(input, |caps: &regex::Captures| {
                let expr = caps.get(1).map_or("", |m| m.as_str()).trim();
                self.resolve_expression(expr)
            })
            .to_string()
    }

    fn resolve_expression(&self, expr: &str) -> String {
        if let Some(var_name) = expr.strip_prefix("env.") {
            return self
                .variables
                .get(var_name)
                .cloned()
                .or_else(|| std::env::var(var_name).ok())
                .unwrap_or_default();
        }

        if let Some(name) = expr.strip_prefix("secrets.") {
            return self.secrets.get(name).cloned().unwrap_or_default();
        }

        if let Some(rest) = expr.strip_prefix("steps.")
            && let Some((step_name, output_key)) = rest.split_once(".outputs.")
        {
            let lookup_key = format!("{}.{}", step_name, output_key);
            return self.outputs.get(&lookup_key).cloned().unwrap_or_default();
        }

        if let Some(field) = expr.strip_prefix("event.") {
            return match (&self.event, field) {
                (Some(TriggerEvent::Push { branch, .. }), "branch") => branch.clone(),
                (Some(TriggerEvent::Dispatch { action }), "action") => action.clone(),
                (Some(event), "name") => event.kind().to_string(),
                _ => String::new(),
            };
        }

        self.variables.get(expr).cloned().unwrap_or_default()
    }

    /// Mask secrets in the input string.
    pub fn mask_secrets(&self, input: &str) -> String {
        let mut output = input.to_string();
        for value in self.secrets.values() {
            if !value.is_empty() {
                output = output.replace(value, "***");
            }
        }
        output
    }
}
