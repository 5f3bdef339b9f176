//! `{{ variable }}` interpolation
//!
//! Used for stream paths (`/accounts/{{ config.account_id }}/orders`), params,
//! headers and bookmark filters (`updated_at gt {{ bookmark }}`).

use crate::error::{Error, Result};
use crate::types::StringMap;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Values visible to templates
///
/// `config.*` resolves against the raw configuration document; bare names
/// resolve against run variables first (`bookmark`, `stream`), then
/// top-level config keys.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    config: Value,
    vars: serde_json::Map<String, Value>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create context with config values
    pub fn with_config(config: Value) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Set a run variable
    #[must_use]
    pub fn var(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Set `{{ bookmark }}`
    #[must_use]
    pub fn with_bookmark(self, bookmark: &str) -> Self {
        self.var("bookmark", bookmark)
    }

    /// Get a value by path (e.g., "config.api_key")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["config"] => Some(&self.config),
            ["config", rest @ ..] => get_nested_value(&self.config, rest),
            [first, rest @ ..] => match self.vars.get(*first) {
                Some(root) => get_nested_value(root, rest),
                None => get_nested_value(&self.config, &parts),
            },
            [] => None,
        }
    }
}

fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, part| match current {
        Value::Object(map) => map.get(*part),
        _ => None,
    })
}

/// Render a template string; every variable must resolve
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let var_path = &caps[1];
        match ctx.get(var_path) {
            Some(value) => value_to_string(value),
            None => {
                missing.push(var_path.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Render every value of a map
pub fn render_map(map: &StringMap, ctx: &TemplateContext) -> Result<StringMap> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), render(v, ctx)?)))
        .collect()
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
