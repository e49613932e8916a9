//! Base and override configuration layers.

use std::collections::BTreeMap;

use crate::models::EnvConfiguration;

/// Which override tree applies to an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideScope {
    /// A named pipeline environment such as `dev` or `prod`.
    Environment(String),
    /// Any preview environment; previews share one override bucket.
    Preview,
}

/// A base configuration plus the override trees layered on top of it.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    pub base: EnvConfiguration,
    pub env_overrides: BTreeMap<String, EnvConfiguration>,
    pub preview_overrides: Option<EnvConfiguration>,
}

impl ConfigLayers {
    pub fn new(base: EnvConfiguration) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    pub fn with_env_override(mut self, env_name: impl Into<String>, tree: EnvConfiguration) -> Self {
        self.env_overrides.insert(env_name.into(), tree);
        self
    }

    pub fn with_preview_override(mut self, tree: EnvConfiguration) -> Self {
        self.preview_overrides = Some(tree);
        self
    }

    pub fn overrides_for(&self, scope: &OverrideScope) -> Option<&EnvConfiguration> {
        match scope {
            OverrideScope::Environment(name) => self.env_overrides.get(name),
            OverrideScope::Preview => self.preview_overrides.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_for_scope() {
        let layers = ConfigLayers::new(EnvConfiguration::new("r", "config.yml"))
            .with_env_override("prod", EnvConfiguration::new("r", "prod.yml"))
            .with_preview_override(EnvConfiguration::new("r", "previews.yml"));

        let prod = layers
            .overrides_for(&OverrideScope::Environment("prod".into()))
            .unwrap();
        assert_eq!(prod.filename, "prod.yml");
        assert!(layers
            .overrides_for(&OverrideScope::Environment("dev".into()))
            .is_none());
        assert_eq!(
            layers.overrides_for(&OverrideScope::Preview).unwrap().filename,
            "previews.yml"
        );
    }
}
