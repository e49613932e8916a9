//! End-to-end passes over a configuration file.
//!
//! The [`Engine`] wires the resolver interfaces into the individual passes:
//! - `check`: normalize connections, then validate against module manifests
//! - `plan`: apply one block's layers onto its persisted workspace and diff

use serde::Serialize;
use stratum_config::{ConfigLayers, EnvConfiguration, OverrideScope, ValidationErrors};
use stratum_modules::ModuleRegistry;
use stratum_workspace::{
    diff_with_policy, ConfigApplier, DiffPolicy, IndexedChanges, SubdomainReserver, TemplateVars,
    WorkspaceConfig,
};
use tracing::info;

use crate::catalog::StaticCatalog;
use crate::channels::{ChannelCache, ChannelSource};
use crate::error::{CoreError, CoreResult};
use crate::normalizer::{ConnectionNormalizer, NormalizeContext};
use crate::topology::{TopologyCache, TopologySource};
use crate::validator::{ConfigValidator, ValidateContext};

/// Integration tool whose channels event targets refer to.
pub const SLACK_TOOL: &str = "slack";

/// Where a configuration file is being processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    pub org_name: String,
    pub stack_name: String,
    pub env_name: String,
    /// Whether `env_name` is a preview environment.
    pub preview: bool,
}

impl RunContext {
    pub fn new(
        org_name: impl Into<String>,
        stack_name: impl Into<String>,
        env_name: impl Into<String>,
    ) -> Self {
        Self {
            org_name: org_name.into(),
            stack_name: stack_name.into(),
            env_name: env_name.into(),
            preview: false,
        }
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn normalize_context(&self) -> NormalizeContext {
        NormalizeContext::new(&self.org_name, &self.stack_name, &self.env_name)
    }

    pub fn validate_context(&self) -> ValidateContext {
        ValidateContext::new(&self.org_name, &self.stack_name, &self.env_name)
    }

    pub fn template_vars(&self) -> TemplateVars {
        TemplateVars::new(&self.org_name, &self.stack_name, &self.env_name)
    }

    pub fn override_scope(&self) -> OverrideScope {
        if self.preview {
            OverrideScope::Preview
        } else {
            OverrideScope::Environment(self.env_name.clone())
        }
    }
}

/// Result of planning one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub block: String,
    /// Workspace state after applying the declared configuration.
    pub desired: WorkspaceConfig,
    /// Changes that take the persisted workspace to `desired`.
    pub changes: IndexedChanges,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Runs the normalize, validate and plan passes.
pub struct Engine<'a> {
    registry: &'a dyn ModuleRegistry,
    topology: TopologyCache<'a>,
    channels: Option<ChannelCache<'a>>,
    reserver: Option<&'a dyn SubdomainReserver>,
    policy: DiffPolicy,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a dyn ModuleRegistry, topology: &'a dyn TopologySource) -> Self {
        Self {
            registry,
            topology: TopologyCache::new(topology),
            channels: None,
            reserver: None,
            policy: DiffPolicy::default(),
        }
    }

    /// Engine backed entirely by one static catalog.
    pub fn from_catalog(catalog: &'a StaticCatalog) -> Self {
        Self::new(catalog, catalog)
            .with_channel_source(catalog)
            .with_subdomain_reserver(catalog)
    }

    pub fn with_channel_source(mut self, source: &'a dyn ChannelSource) -> Self {
        self.channels = Some(ChannelCache::new(SLACK_TOOL, source));
        self
    }

    pub fn with_subdomain_reserver(mut self, reserver: &'a dyn SubdomainReserver) -> Self {
        self.reserver = Some(reserver);
        self
    }

    pub fn with_policy(mut self, policy: DiffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Normalize `config` in place and validate it.
    ///
    /// A normalization failure does not stop validation. Both sets of
    /// findings are returned, except validation findings at a path that
    /// already carries a normalize finding. Transport failures are returned
    /// as `Err`.
    pub fn check(
        &self,
        ctx: &RunContext,
        config: &mut EnvConfiguration,
    ) -> CoreResult<ValidationErrors> {
        let normalizer = ConnectionNormalizer::new(&self.topology);
        let mut errors = match normalizer.normalize_config(&ctx.normalize_context(), config) {
            Ok(()) => ValidationErrors::new(),
            Err(CoreError::Invalid(errors)) => errors,
            Err(e) => return Err(e),
        };

        let mut validator = ConfigValidator::new(self.registry, &self.topology);
        if let Some(channels) = &self.channels {
            validator = validator.with_channels(channels);
        }
        let found = validator.validate(&ctx.validate_context(), config)?;

        let reported: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
        for error in found.into_vec() {
            if !reported.contains(&error.path.to_string()) {
                errors.push(error);
            }
        }
        Ok(errors)
    }

    /// Compute the changes that applying `block_name` would make to `current`.
    pub fn plan(
        &self,
        ctx: &RunContext,
        layers: &ConfigLayers,
        block_name: &str,
        current: &WorkspaceConfig,
    ) -> CoreResult<Plan> {
        let base = layers
            .base
            .find_block(block_name)
            .ok_or_else(|| CoreError::BlockNotFound(block_name.to_string()))?;
        let overrides = layers
            .overrides_for(&ctx.override_scope())
            .and_then(|tree| tree.get_block(base.kind, block_name));

        let mut applier = ConfigApplier::new(self.registry, ctx.template_vars());
        if let Some(reserver) = self.reserver {
            applier = applier.with_subdomain_reserver(reserver);
        }

        let mut desired = current.clone();
        applier.apply_changes_to(base, overrides, &mut desired)?;
        let changes = diff_with_policy(current, &desired, &self.policy);

        info!("Planned {}: {} changes", block_name, changes.len());
        Ok(Plan {
            block: block_name.to_string(),
            desired,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_config::{BlockKind, ErrorFamily, ValidationErrorKind};
    use stratum_workspace::ChangeAction;

    const CATALOG: &str = r#"
domain: acme.dev
modules:
  - org_name: acme
    name: fargate-service
    category: app
    subcategory: container
    provider_types: [aws]
    versions:
      - version: 0.1.0
        manifest:
          variables:
            cpu: { type: number, default: 256 }
            image: { type: string }
          connections:
            network: { contract: network/*/* }
  - org_name: acme
    name: aws-network
    category: network
    subcategory: vpc
    provider_types: [aws]
    versions:
      - version: 0.1.0
stacks:
  - id: 1
    name: core
    environments:
      - { id: 10, name: dev }
    blocks:
      - { id: 100, name: main-network, module: acme/aws-network }
      - { id: 101, name: api, module: acme/fargate-service }
"#;

    const CONFIG: &str = r#"
networks:
  main-network:
    module: acme/aws-network
apps:
  api:
    module: acme/fargate-service
    vars:
      image: "registry/{{ STRATUM_ENV }}/api"
    connections:
      network: main-network
"#;

    fn ctx() -> RunContext {
        RunContext::new("acme", "core", "dev")
    }

    #[test]
    fn test_check_normalizes_then_validates() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();
        let engine = Engine::from_catalog(&catalog);
        let mut config = EnvConfiguration::from_yaml_str("acme/infra", "config.yml", CONFIG).unwrap();

        let errors = engine.check(&ctx(), &mut config).unwrap();
        assert!(errors.is_empty(), "{}", errors);
        let api = config.get_block(BlockKind::Application, "api").unwrap();
        assert_eq!(api.connections["network"].identity_key(), "1.10.100");
    }

    #[test]
    fn test_check_reports_normalize_failure_as_finding() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();
        let engine = Engine::from_catalog(&catalog);
        let mut config = EnvConfiguration::from_yaml_str(
            "acme/infra",
            "config.yml",
            "apps:\n  api:\n    module: acme/fargate-service\n    connections:\n      network: ghost\n",
        )
        .unwrap();

        let errors = engine.check(&ctx(), &mut config).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.iter().next().unwrap().kind,
            ValidationErrorKind::MissingBlock { .. }
        ));
    }

    #[test]
    fn test_check_keeps_validation_findings_after_normalize_failure() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();
        let engine = Engine::from_catalog(&catalog);
        let mut config = EnvConfiguration::from_yaml_str(
            "acme/infra",
            "config.yml",
            "apps:\n  api:\n    module: acme/fargate-service\n    vars:\n      gpu: 1\n    connections:\n      network: ghost\n",
        )
        .unwrap();

        let errors = engine.check(&ctx(), &mut config).unwrap();
        assert_eq!(errors.len(), 2, "{}", errors);
        let network = errors.at("apps.api.connections.network");
        assert_eq!(network.len(), 1);
        assert_eq!(network[0].family, ErrorFamily::Normalize);
        assert_eq!(errors.at("apps.api.vars.gpu")[0].family, ErrorFamily::Validate);
    }

    #[test]
    fn test_plan_new_workspace() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();
        let engine = Engine::from_catalog(&catalog);
        let mut base = EnvConfiguration::from_yaml_str("acme/infra", "config.yml", CONFIG).unwrap();
        engine.check(&ctx(), &mut base).unwrap();
        let layers = ConfigLayers::new(base);

        let current = WorkspaceConfig::new("acme/fargate-service", "0.1.0");
        let plan = engine.plan(&ctx(), &layers, "api", &current).unwrap();

        assert_eq!(
            plan.desired.variables["image"].value,
            Some(stratum_config::Value::from("registry/dev/api"))
        );
        let image = plan.changes.get("variable/image").unwrap();
        assert_eq!(image.action, ChangeAction::Add);
        assert!(plan.changes.contains_key("connection/network"));
    }

    #[test]
    fn test_plan_unknown_block() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();
        let engine = Engine::from_catalog(&catalog);
        let layers = ConfigLayers::new(EnvConfiguration::new("acme/infra", "config.yml"));
        let err = engine
            .plan(&ctx(), &layers, "api", &WorkspaceConfig::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::BlockNotFound(_)));
    }

    #[test]
    fn test_override_scope() {
        assert_eq!(
            ctx().override_scope(),
            OverrideScope::Environment("dev".into())
        );
        assert_eq!(ctx().with_preview(true).override_scope(), OverrideScope::Preview);
    }
}
