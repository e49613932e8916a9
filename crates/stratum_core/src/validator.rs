//! Configuration validation against module manifests.
//!
//! Validation is read-only and collects every finding in the file. Within a
//! block, a module that fails to resolve stops further checks of that block
//! only. Transport failures abort the whole pass.

use std::collections::BTreeMap;

use stratum_config::{
    BlockConfiguration, CapabilityConfiguration, ConnectionTarget, EnvConfiguration,
    EventConfiguration, FileContext, ObjectPath, ValidationError, ValidationErrorKind,
    ValidationErrors, Value, CAPABILITY_CONTRACT,
};
use stratum_modules::{
    match_contract, Manifest, ModuleRegistry, ModuleResolver, ModuleSource, ResolveModuleError,
    ResolverError,
};
use stratum_workspace::CapabilityIdentity;
use tracing::{debug, info};

use crate::channels::ChannelCache;
use crate::error::CoreResult;
use crate::topology::BlockResolver;

/// Organization, stack and environment of the file being validated.
///
/// Used to fill in the stack and environment of connection targets that
/// have not been normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateContext {
    pub org_name: String,
    pub stack_name: String,
    pub env_name: String,
}

impl ValidateContext {
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

/// Validates parsed configuration files.
pub struct ConfigValidator<'a> {
    registry: &'a dyn ModuleRegistry,
    modules: ModuleResolver<'a>,
    blocks: &'a dyn BlockResolver,
    channels: Option<&'a ChannelCache<'a>>,
}

struct Pass<'p> {
    file: FileContext,
    ctx: &'p ValidateContext,
    errors: ValidationErrors,
}

impl Pass<'_> {
    fn resolve_error(&mut self, path: ObjectPath, kind: ValidationErrorKind) {
        self.errors.push(ValidationError::resolve(&self.file, path, kind));
    }

    fn validate_error(&mut self, path: ObjectPath, kind: ValidationErrorKind) {
        self.errors
            .push(ValidationError::validate(&self.file, path, kind));
    }
}

impl<'a> ConfigValidator<'a> {
    pub fn new(registry: &'a dyn ModuleRegistry, blocks: &'a dyn BlockResolver) -> Self {
        Self {
            registry,
            modules: ModuleResolver::new(registry),
            blocks,
            channels: None,
        }
    }

    /// Check event Slack targets against this channel cache.
    pub fn with_channels(mut self, channels: &'a ChannelCache<'a>) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Validate a whole file, returning every finding.
    pub fn validate(
        &self,
        ctx: &ValidateContext,
        config: &EnvConfiguration,
    ) -> CoreResult<ValidationErrors> {
        let mut pass = Pass {
            file: config.context(),
            ctx,
            errors: ValidationErrors::new(),
        };

        for block in config.iter_blocks() {
            self.validate_block(&mut pass, block)?;
        }
        for (name, event) in &config.events {
            self.validate_event(&mut pass, config, name, event)?;
        }

        info!(
            "Validated {}: {} errors",
            pass.file,
            pass.errors.len()
        );
        Ok(pass.errors)
    }

    fn validate_block(&self, pass: &mut Pass<'_>, block: &BlockConfiguration) -> Result<(), ResolverError> {
        let path = block.path();
        debug!("Validating {} {}", block.kind, path);

        let resolved = match self.modules.resolve(
            &block.module_source,
            block.module_version(),
            &block.kind.required_contract(),
        ) {
            Ok(resolved) => resolved,
            Err(ResolveModuleError::Invalid(kind)) => {
                pass.resolve_error(path.field("module"), kind);
                return Ok(());
            }
            Err(ResolveModuleError::Resolver(e)) => return Err(e),
        };

        let manifest = &resolved.version.manifest;
        self.check_variables(pass, &path, &block.module_source, manifest, &block.variables);
        self.check_connections(pass, &path, &block.module_source, manifest, &block.connections)?;

        let mut seen: Vec<CapabilityIdentity> = Vec::new();
        for (i, capability) in block.capabilities.iter().enumerate() {
            let identity = CapabilityIdentity::of_declared(capability);
            if seen.contains(&identity) {
                pass.validate_error(
                    path.index("capabilities", i),
                    ValidationErrorKind::DuplicateCapability {
                        source_ref: capability.module_source.clone(),
                    },
                );
            } else {
                seen.push(identity);
            }
            self.validate_capability(
                pass,
                path.index("capabilities", i),
                &resolved.module.subcategory,
                capability,
            )?;
        }
        Ok(())
    }

    fn validate_capability(
        &self,
        pass: &mut Pass<'_>,
        path: ObjectPath,
        app_category: &str,
        capability: &CapabilityConfiguration,
    ) -> Result<(), ResolverError> {
        let resolved = match self.modules.resolve(
            &capability.module_source,
            capability.module_version(),
            CAPABILITY_CONTRACT,
        ) {
            Ok(resolved) => resolved,
            Err(ResolveModuleError::Invalid(kind)) => {
                pass.resolve_error(path.field("module"), kind);
                return Ok(());
            }
            Err(ResolveModuleError::Resolver(e)) => return Err(e),
        };

        if !resolved.module.supports_app_category(app_category) {
            pass.validate_error(
                path.field("module"),
                ValidationErrorKind::UnsupportedAppCategory {
                    source_ref: capability.module_source.clone(),
                    category: app_category.to_string(),
                    supported: resolved.module.app_categories.clone(),
                },
            );
        }

        let manifest = &resolved.version.manifest;
        self.check_variables(pass, &path, &capability.module_source, manifest, &capability.variables);
        self.check_connections(pass, &path, &capability.module_source, manifest, &capability.connections)
    }

    fn check_variables(
        &self,
        pass: &mut Pass<'_>,
        path: &ObjectPath,
        source: &str,
        manifest: &Manifest,
        variables: &BTreeMap<String, Value>,
    ) {
        for name in variables.keys() {
            if !manifest.variables.contains_key(name) {
                pass.validate_error(
                    path.key("vars", name.as_str()),
                    ValidationErrorKind::UnknownVariable {
                        name: name.clone(),
                        source_ref: source.to_string(),
                    },
                );
            }
        }
    }

    fn check_connections(
        &self,
        pass: &mut Pass<'_>,
        path: &ObjectPath,
        source: &str,
        manifest: &Manifest,
        connections: &BTreeMap<String, ConnectionTarget>,
    ) -> Result<(), ResolverError> {
        for (name, target) in connections {
            let at = path.key("connections", name.as_str());
            let Some(schema) = manifest.connections.get(name) else {
                pass.validate_error(
                    at,
                    ValidationErrorKind::UnknownConnection {
                        name: name.clone(),
                        source_ref: source.to_string(),
                    },
                );
                continue;
            };

            let lookup = with_defaults(target, pass.ctx);
            let Some(block) = self.blocks.resolve_block(&pass.ctx.org_name, &lookup)? else {
                pass.validate_error(
                    at,
                    ValidationErrorKind::MissingConnectionBlock {
                        connection: name.clone(),
                        target: target.to_string(),
                    },
                );
                continue;
            };

            // The target's own module problems are reported where it is declared.
            let Ok(target_source) = block.module_source.parse::<ModuleSource>() else {
                debug!("Skipping contract check for {}: no valid module", block.name);
                continue;
            };
            let Some(module) = self
                .registry
                .get_module(&target_source.org_name, &target_source.module_name)?
            else {
                debug!("Skipping contract check for {}: module not found", block.name);
                continue;
            };

            let actual = module.contract_name();
            match match_contract(&schema.contract, &actual) {
                Ok(true) => {}
                Ok(false) => pass.validate_error(
                    at,
                    ValidationErrorKind::InvalidConnectionContract {
                        connection: name.clone(),
                        target: target.to_string(),
                        source_ref: block.module_source.clone(),
                        expected: schema.contract.clone(),
                        actual: actual.to_string(),
                    },
                ),
                Err(e) => pass.resolve_error(
                    at,
                    ValidationErrorKind::MalformedContract {
                        contract: e.contract,
                        reason: e.reason,
                    },
                ),
            }
        }
        Ok(())
    }

    fn validate_event(
        &self,
        pass: &mut Pass<'_>,
        config: &EnvConfiguration,
        name: &str,
        event: &EventConfiguration,
    ) -> Result<(), ResolverError> {
        let path = ObjectPath::root().key("events", name);

        for (i, block) in event.blocks.iter().enumerate() {
            if config.find_block(block).is_none() {
                pass.validate_error(
                    path.index("blocks", i),
                    ValidationErrorKind::MissingBlock {
                        block: block.clone(),
                        target: name.to_string(),
                    },
                );
            }
        }

        let (Some(slack), Some(cache)) = (&event.targets.slack, self.channels) else {
            return Ok(());
        };
        let slack_path = path.field("targets").field("slack");
        for (i, channel) in slack.channels.iter().enumerate() {
            if cache.find(channel)?.is_none() {
                let available = cache.channels()?.iter().map(|c| c.name.clone()).collect();
                pass.validate_error(
                    slack_path.index("channels", i),
                    ValidationErrorKind::UnknownChannel {
                        tool: cache.tool().to_string(),
                        channel: channel.clone(),
                        available,
                    },
                );
            }
        }
        Ok(())
    }
}

/// Fill the stack and environment a bare target implicitly refers to.
fn with_defaults(target: &ConnectionTarget, ctx: &ValidateContext) -> ConnectionTarget {
    let mut lookup = target.clone();
    if lookup.stack_id.is_none() && lookup.stack_name.is_none() {
        lookup.stack_name = Some(ctx.stack_name.clone());
    }
    if lookup.env_id.is_none() && lookup.env_name.is_none() {
        lookup.env_name = Some(ctx.env_name.clone());
    }
    lookup
}
