//! Applies declared block configuration onto persisted workspace state.
//!
//! Application is two-phase: the base layer first, then the environment or
//! preview override layer, so override values win. Nothing is rolled back if
//! the second phase fails.

use std::collections::BTreeSet;

use stratum_config::{BlockConfiguration, BlockKind, CapabilityConfiguration, CAPABILITY_CONTRACT};
use stratum_modules::{ModuleRegistry, ModuleResolver, ResolvedModule, ResolverError};
use tracing::{debug, info, warn};

use crate::capability::CapabilityIdentity;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::SubdomainReservation;
use crate::template::TemplateVars;
use crate::updater::{CapabilityConfigUpdater, WorkspaceConfigUpdater};

/// Reserves DNS subdomains for subdomain blocks.
#[cfg_attr(test, mockall::automock)]
pub trait SubdomainReserver {
    fn reserve_subdomain(
        &self,
        block_name: &str,
        requested: &str,
    ) -> Result<SubdomainReservation, ResolverError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Base,
    Override,
}

/// Applies a block's base and override layers through an updater.
pub struct ConfigApplier<'a> {
    resolver: ModuleResolver<'a>,
    reserver: Option<&'a dyn SubdomainReserver>,
    vars: TemplateVars,
}

impl<'a> ConfigApplier<'a> {
    pub fn new(registry: &'a dyn ModuleRegistry, vars: TemplateVars) -> Self {
        Self {
            resolver: ModuleResolver::new(registry),
            reserver: None,
            vars,
        }
    }

    pub fn with_subdomain_reserver(mut self, reserver: &'a dyn SubdomainReserver) -> Self {
        self.reserver = Some(reserver);
        self
    }

    /// Apply `base`, then `overrides`, onto the workspace behind `updater`.
    ///
    /// Capabilities and env variables end up as exactly the union declared by
    /// both layers. Persisted capabilities are matched by identity so their
    /// ids and destroy flags survive.
    pub fn apply_changes_to(
        &self,
        base: &BlockConfiguration,
        overrides: Option<&BlockConfiguration>,
        updater: &mut dyn WorkspaceConfigUpdater,
    ) -> WorkspaceResult<()> {
        let layers: Vec<&BlockConfiguration> = std::iter::once(base).chain(overrides).collect();

        let mut identities: Vec<CapabilityIdentity> = Vec::new();
        for capability in layers.iter().flat_map(|l| &l.capabilities) {
            let (identity, _) = self.declared_identity(&base.name, capability)?;
            if !identities.contains(&identity) {
                identities.push(identity);
            }
        }
        updater.retain_capabilities(&identities);

        let env_names: BTreeSet<String> = layers
            .iter()
            .flat_map(|l| l.env_variables.keys().cloned())
            .collect();
        updater.remove_env_variables_not_in(&env_names);

        self.apply_layer(base, base, Layer::Base, updater)?;
        if let Some(overrides) = overrides {
            self.apply_layer(base, overrides, Layer::Override, updater)?;
        }

        info!(
            "Applied {} {} ({} capabilities)",
            base.kind,
            base.name,
            identities.len()
        );
        Ok(())
    }

    fn apply_layer(
        &self,
        base: &BlockConfiguration,
        layer: &BlockConfiguration,
        which: Layer,
        updater: &mut dyn WorkspaceConfigUpdater,
    ) -> WorkspaceResult<()> {
        debug!("Applying {:?} layer to {}", which, base.name);

        if !layer.module_source.is_empty() {
            let resolved = self
                .resolver
                .resolve(
                    &layer.module_source,
                    layer.module_version(),
                    &base.kind.required_contract(),
                )
                .map_err(|source| WorkspaceError::Resolve {
                    block: base.name.clone(),
                    source,
                })?;
            updater.update_schema(&layer.module_source, &resolved.version);
        }

        for (name, value) in &layer.variables {
            if !updater.update_variable(name, self.vars.substitute_value(value)) {
                warn!("Ignoring variable {} on {}: not in module manifest", name, base.name);
            }
        }
        for (name, target) in &layer.connections {
            if !updater.update_connection_target(name, target.clone()) {
                warn!("Ignoring connection {} on {}: not in module manifest", name, base.name);
            }
        }
        for (name, env) in &layer.env_variables {
            updater.add_or_update_env_variable(
                name,
                &self.vars.substitute_str(env.value()),
                env.sensitive(),
            );
        }

        for capability in &layer.capabilities {
            let (identity, resolved) = self.declared_identity(&base.name, capability)?;
            if updater.find_capability(&identity).is_none() {
                updater.add_capability(&identity);
            }
            let target = updater
                .find_capability(&identity)
                .ok_or_else(|| WorkspaceError::CapabilityNotFound(identity.key()))?;
            self.apply_capability(capability, resolved.as_ref(), which, target);
        }

        if let Some(dns_name) = &layer.dns_name {
            self.apply_dns_name(base, &self.vars.substitute_str(dns_name), updater)?;
        }
        Ok(())
    }

    /// Resolve a declared capability's module and derive the identity it will
    /// be persisted under.
    fn declared_identity(
        &self,
        block: &str,
        capability: &CapabilityConfiguration,
    ) -> WorkspaceResult<(CapabilityIdentity, Option<ResolvedModule>)> {
        if capability.module_source.is_empty() {
            return Ok((CapabilityIdentity::of_declared(capability), None));
        }
        let resolved = self
            .resolver
            .resolve(
                &capability.module_source,
                capability.module_version(),
                CAPABILITY_CONTRACT,
            )
            .map_err(|source| WorkspaceError::Resolve {
                block: block.to_string(),
                source,
            })?;
        let identity = CapabilityIdentity::of_declared_in(capability, &resolved.version);
        Ok((identity, Some(resolved)))
    }

    fn apply_capability(
        &self,
        capability: &CapabilityConfiguration,
        resolved: Option<&ResolvedModule>,
        which: Layer,
        updater: &mut dyn CapabilityConfigUpdater,
    ) {
        if let Some(resolved) = resolved {
            updater.update_schema(&capability.module_source, &resolved.version);
        }

        for (name, value) in &capability.variables {
            if !updater.update_variable(name, self.vars.substitute_value(value)) {
                warn!(
                    "Ignoring variable {} on capability {}: not in module manifest",
                    name, capability.module_source
                );
            }
        }
        for (name, target) in &capability.connections {
            if !updater.update_connection_target(name, target.clone()) {
                warn!(
                    "Ignoring connection {} on capability {}: not in module manifest",
                    name, capability.module_source
                );
            }
        }
        if which == Layer::Base || capability.namespace.is_some() {
            updater.update_namespace(capability.namespace.clone());
        }
    }

    fn apply_dns_name(
        &self,
        block: &BlockConfiguration,
        dns_name: &str,
        updater: &mut dyn WorkspaceConfigUpdater,
    ) -> WorkspaceResult<()> {
        match block.kind {
            BlockKind::Domain => updater.update_domain_name(dns_name),
            BlockKind::Subdomain => match self.reserver {
                Some(reserver) => {
                    let reservation = reserver.reserve_subdomain(&block.name, dns_name)?;
                    debug!("Reserved {} for {}", reservation.fqdn, block.name);
                    updater.update_subdomain_reservation(reservation);
                }
                None => warn!(
                    "No subdomain reserver configured; skipping reservation for {}",
                    block.name
                ),
            },
            _ => warn!("Ignoring dns_name on {} {}", block.kind, block.name),
        }
        Ok(())
    }
}
