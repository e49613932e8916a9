//! Placeholder substitution in declared string values.
//!
//! Supported placeholders are `{{ STRATUM_ORG }}`, `{{ STRATUM_STACK }}` and
//! `{{ STRATUM_ENV }}`. Unknown placeholders are left untouched.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use stratum_config::Value;

fn placeholder_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(STRATUM_[A-Z_]+)\s*\}\}").ok())
        .as_ref()
}

/// Names substituted into declared values for the current context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    pub org_name: String,
    pub stack_name: String,
    pub env_name: String,
}

impl TemplateVars {
    pub fn new(
        org_name: impl Into<String>,
        stack_name: impl Into<String>,
        env_name: impl Into<String>,
    ) -> Self {
        Self {
            org_name: org_name.into(),
            stack_name: stack_name.into(),
            env_name: env_name.into(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "STRATUM_ORG" => Some(&self.org_name),
            "STRATUM_STACK" => Some(&self.stack_name),
            "STRATUM_ENV" => Some(&self.env_name),
            _ => None,
        }
    }

    pub fn substitute_str(&self, input: &str) -> String {
        let Some(re) = placeholder_regex() else {
            return input.to_string();
        };
        re.replace_all(input, |caps: &Captures| match self.lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
    }

    /// Substitute into a string value. Every other value is returned as is.
    pub fn substitute_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.substitute_str(s)),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars::new("acme", "core", "dev")
    }

    #[test]
    fn test_substitute_known_placeholders() {
        assert_eq!(
            vars().substitute_str("{{ STRATUM_ORG }}-{{STRATUM_STACK}}-{{  STRATUM_ENV }}"),
            "acme-core-dev"
        );
    }

    #[test]
    fn test_unknown_placeholder_untouched() {
        assert_eq!(
            vars().substitute_str("{{ STRATUM_REGION }}/{{ STRATUM_ENV }}"),
            "{{ STRATUM_REGION }}/dev"
        );
    }

    #[test]
    fn test_non_string_values_untouched() {
        let list = Value::List(vec![Value::from("{{ STRATUM_ENV }}")]);
        assert_eq!(vars().substitute_value(&list), list);
        assert_eq!(vars().substitute_value(&Value::from(5i64)), Value::from(5i64));
        assert_eq!(
            vars().substitute_value(&Value::from("db-{{ STRATUM_ENV }}")),
            Value::from("db-dev")
        );
    }
}
