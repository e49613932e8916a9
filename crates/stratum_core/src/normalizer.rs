//! Connection normalization.
//!
//! Turns partial connection references into fully qualified ones:
//! - A missing stack defaults to the referencing block's stack
//! - A missing environment defaults to the referencing block's environment,
//!   unless the target block is shared, in which case it moves to the stack's
//!   previews-shared environment
//! - Stack, environment and block ids are filled from the topology cache

use stratum_config::{
    BlockKind, ConnectionTarget, EnvConfiguration, ValidationError, ValidationErrorKind,
};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult, NormalizeError};
use crate::topology::TopologyCache;

/// Organization, stack and environment of the file being normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeContext {
    pub org_name: String,
    pub stack_name: String,
    pub env_name: String,
}

impl NormalizeContext {
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
}

/// Resolves connection targets against a topology cache.
pub struct ConnectionNormalizer<'a> {
    topology: &'a TopologyCache<'a>,
}

impl<'a> ConnectionNormalizer<'a> {
    pub fn new(topology: &'a TopologyCache<'a>) -> Self {
        Self { topology }
    }

    /// Resolve one target. Already normalized targets come back unchanged.
    pub fn normalize(
        &self,
        ctx: &NormalizeContext,
        target: &ConnectionTarget,
    ) -> Result<ConnectionTarget, NormalizeError> {
        let org = ctx.org_name.as_str();
        let stack_name = target.stack_name.as_deref().unwrap_or(&ctx.stack_name);
        let stack = self
            .topology
            .find_stack(org, target.stack_id, Some(stack_name))?
            .ok_or_else(|| {
                NormalizeError::NotFound(ValidationErrorKind::MissingStack {
                    stack: stack_name.to_string(),
                    target: target.to_string(),
                })
            })?;

        let block = self
            .topology
            .find_block(org, stack.id, target.block_id, Some(&target.block_name))?
            .ok_or_else(|| {
                NormalizeError::NotFound(ValidationErrorKind::MissingBlock {
                    block: target.block_name.clone(),
                    target: target.to_string(),
                })
            })?;

        let env = match (&target.env_name, target.env_id) {
            // Environments are indexed per stack, so the organization's
            // previews-shared environment is looked up in the target's stack.
            (None, None) if block.is_shared => self
                .topology
                .previews_shared_environment(org, stack.id)?
                .ok_or_else(|| {
                    NormalizeError::NotFound(ValidationErrorKind::MissingPreviewsSharedEnvironment {
                        stack: stack.name.clone(),
                        target: target.to_string(),
                    })
                })?,
            (name, id) => {
                let env_name = name.as_deref().unwrap_or(&ctx.env_name);
                self.topology
                    .find_environment(org, stack.id, id, Some(env_name))?
                    .ok_or_else(|| {
                        NormalizeError::NotFound(ValidationErrorKind::MissingEnvironment {
                            env: env_name.to_string(),
                            target: target.to_string(),
                        })
                    })?
            }
        };

        let resolved = ConnectionTarget {
            stack_id: Some(stack.id),
            stack_name: Some(stack.name),
            env_id: Some(env.id),
            env_name: Some(env.name),
            block_id: Some(block.id),
            block_name: block.name,
        };
        debug!("Normalized {} to {}", target, resolved.identity_key());
        Ok(resolved)
    }

    /// Normalize every block and capability connection in place.
    ///
    /// Kinds are walked in [`BlockKind::ALL`] order. The first target that
    /// cannot be found aborts the walk with a normalize error located at that
    /// connection; targets already visited stay normalized.
    pub fn normalize_config(
        &self,
        ctx: &NormalizeContext,
        config: &mut EnvConfiguration,
    ) -> CoreResult<()> {
        let file = config.context();
        let mut count = 0usize;

        for kind in BlockKind::ALL {
            for block in config.blocks_of_mut(kind) {
                let path = block.path();
                for (name, target) in block.connections.iter_mut() {
                    let at = path.key("connections", name.as_str());
                    *target = self.normalize(ctx, target).map_err(|e| match e {
                        NormalizeError::NotFound(kind) => {
                            CoreError::Invalid(ValidationError::normalize(&file, at, kind).into())
                        }
                        NormalizeError::Resolver(e) => CoreError::Resolver(e),
                    })?;
                    count += 1;
                }
                for (i, capability) in block.capabilities.iter_mut().enumerate() {
                    let capability_path = path.index("capabilities", i);
                    for (name, target) in capability.connections.iter_mut() {
                        let at = capability_path.key("connections", name.as_str());
                        *target = self.normalize(ctx, target).map_err(|e| match e {
                            NormalizeError::NotFound(kind) => CoreError::Invalid(
                                ValidationError::normalize(&file, at, kind).into(),
                            ),
                            NormalizeError::Resolver(e) => CoreError::Resolver(e),
                        })?;
                        count += 1;
                    }
                }
            }
        }

        info!("Normalized {} connections in {}", count, file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Block, EnvType, Environment, MockTopologySource, Stack};
    use stratum_modules::ResolverError;

    fn source() -> MockTopologySource {
        let mut source = MockTopologySource::new();
        source.expect_list_stacks().returning(|_| {
            Ok(vec![Stack {
                id: 1,
                name: "core".into(),
            }])
        });
        source.expect_list_environments().returning(|_, stack_id| {
            Ok(vec![
                Environment {
                    id: 10,
                    name: "dev".into(),
                    stack_id,
                    env_type: EnvType::Pipeline,
                },
                Environment {
                    id: 11,
                    name: "pr-42".into(),
                    stack_id,
                    env_type: EnvType::Preview,
                },
                Environment {
                    id: 12,
                    name: "previews".into(),
                    stack_id,
                    env_type: EnvType::PreviewsShared,
                },
            ])
        });
        source.expect_list_blocks().returning(|_, stack_id| {
            Ok(vec![
                Block {
                    id: 100,
                    name: "main-network".into(),
                    stack_id,
                    module_source: "acme/aws-network".into(),
                    module_version: None,
                    is_shared: false,
                },
                Block {
                    id: 101,
                    name: "ns-sub-for-acme-docs".into(),
                    stack_id,
                    module_source: "acme/aws-subdomain".into(),
                    module_version: None,
                    is_shared: true,
                },
            ])
        });
        source
    }

    fn ctx(env: &str) -> NormalizeContext {
        NormalizeContext::new("acme", "core", env)
    }

    #[test]
    fn test_defaults_to_own_stack_and_env() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);

        let resolved = normalizer
            .normalize(&ctx("dev"), &ConnectionTarget::block("main-network"))
            .unwrap();
        assert!(resolved.is_normalized());
        assert_eq!(resolved.identity_key(), "1.10.100");
        assert_eq!(resolved.to_string(), "core.dev.main-network");
    }

    #[test]
    fn test_shared_block_moves_to_previews_shared_env() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);

        let resolved = normalizer
            .normalize(&ctx("pr-42"), &ConnectionTarget::block("ns-sub-for-acme-docs"))
            .unwrap();
        assert_eq!(resolved.env_id, Some(12));
        assert_eq!(resolved.env_name.as_deref(), Some("previews"));
    }

    #[test]
    fn test_explicit_env_is_kept_for_shared_block() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);

        let target = ConnectionTarget::block("ns-sub-for-acme-docs")
            .with_stack("core")
            .with_env("dev");
        let resolved = normalizer.normalize(&ctx("pr-42"), &target).unwrap();
        assert_eq!(resolved.env_id, Some(10));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);

        let once = normalizer
            .normalize(&ctx("pr-42"), &ConnectionTarget::block("ns-sub-for-acme-docs"))
            .unwrap();
        let twice = normalizer.normalize(&ctx("dev"), &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_entities() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);

        let missing_block = normalizer.normalize(&ctx("dev"), &ConnectionTarget::block("nope"));
        assert!(matches!(
            missing_block,
            Err(NormalizeError::NotFound(ValidationErrorKind::MissingBlock { .. }))
        ));

        let missing_stack = normalizer.normalize(
            &ctx("dev"),
            &ConnectionTarget::block("main-network").with_stack("ghost"),
        );
        assert!(matches!(
            missing_stack,
            Err(NormalizeError::NotFound(ValidationErrorKind::MissingStack { .. }))
        ));

        let missing_env = normalizer.normalize(&ctx("staging"), &ConnectionTarget::block("main-network"));
        match missing_env {
            Err(NormalizeError::NotFound(ValidationErrorKind::MissingEnvironment { env, target })) => {
                assert_eq!(env, "staging");
                assert_eq!(target, "main-network");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_normalize_config_reports_location_and_aborts() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);

        let mut config = EnvConfiguration::from_yaml_str(
            "acme/infra",
            "config.yml",
            r#"
networks:
  main-network:
    module: acme/aws-network
apps:
  api:
    module: acme/fargate-service
    connections:
      network: main-network
      cache: redis
"#,
        )
        .unwrap();

        let err = normalizer.normalize_config(&ctx("dev"), &mut config).unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.path.to_string(), "apps.api.connections.cache");
        assert_eq!(error.family, stratum_config::ErrorFamily::Normalize);
    }

    #[test]
    fn test_transport_failure_is_hard() {
        let mut source = MockTopologySource::new();
        source.expect_list_stacks().returning(|_| {
            Err(ResolverError::Timeout {
                service: "stacks".into(),
            })
        });
        let cache = TopologyCache::new(&source);
        let normalizer = ConnectionNormalizer::new(&cache);
        assert!(matches!(
            normalizer.normalize(&ctx("dev"), &ConnectionTarget::block("main-network")),
            Err(NormalizeError::Resolver(ResolverError::Timeout { .. }))
        ));
    }
}
