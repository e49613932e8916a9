//! Mutation surface used by the config applier.
//!
//! The applier only talks to these traits, so any persisted representation
//! can be reconciled. [`WorkspaceConfig`] and [`CapabilityConfig`] implement
//! them for the in-memory model.

use std::collections::{BTreeMap, BTreeSet};

use stratum_config::{ConnectionTarget, Value};
use stratum_modules::ModuleVersion;

use crate::capability::CapabilityIdentity;
use crate::models::{
    CapabilityConfig, Connection, DomainExtra, EnvVariable, SubdomainReservation, Variable,
    WorkspaceConfig,
};

/// Updates one persisted capability.
pub trait CapabilityConfigUpdater {
    /// Switch to a module version, pruning slots its manifest no longer has.
    fn update_schema(&mut self, source: &str, version: &ModuleVersion);

    /// Set a variable value. Returns `false` if the manifest has no such variable.
    fn update_variable(&mut self, name: &str, value: Value) -> bool;

    /// Point a connection at a target. Returns `false` if the manifest has no such connection.
    fn update_connection_target(&mut self, name: &str, target: ConnectionTarget) -> bool;

    fn update_namespace(&mut self, namespace: Option<String>);
}

/// Updates one persisted block workspace.
pub trait WorkspaceConfigUpdater {
    /// Switch to a module version, pruning slots its manifest no longer has.
    fn update_schema(&mut self, source: &str, version: &ModuleVersion);

    /// Set a variable value. Returns `false` if the manifest has no such variable.
    fn update_variable(&mut self, name: &str, value: Value) -> bool;

    /// Point a connection at a target. Returns `false` if the manifest has no such connection.
    fn update_connection_target(&mut self, name: &str, target: ConnectionTarget) -> bool;

    fn add_or_update_env_variable(&mut self, name: &str, value: &str, sensitive: bool);

    fn remove_env_variables_not_in(&mut self, keep: &BTreeSet<String>);

    fn find_capability(
        &mut self,
        identity: &CapabilityIdentity,
    ) -> Option<&mut dyn CapabilityConfigUpdater>;

    fn add_capability(&mut self, identity: &CapabilityIdentity) -> &mut dyn CapabilityConfigUpdater;

    /// Drop every capability that matches none of `identities`.
    fn retain_capabilities(&mut self, identities: &[CapabilityIdentity]);

    fn update_domain_name(&mut self, dns_name: &str);

    fn update_subdomain_reservation(&mut self, reservation: SubdomainReservation);
}

fn sync_variables(variables: &mut BTreeMap<String, Variable>, version: &ModuleVersion) {
    let manifest = &version.manifest.variables;
    variables.retain(|name, _| manifest.contains_key(name));
    for (name, schema) in manifest {
        let slot = variables
            .entry(name.clone())
            .or_insert_with(|| Variable::from_schema(schema));
        slot.default = schema.default.clone();
        slot.sensitive = schema.sensitive;
    }
}

fn sync_connections(connections: &mut BTreeMap<String, Connection>, version: &ModuleVersion) {
    let manifest = &version.manifest.connections;
    connections.retain(|name, _| manifest.contains_key(name));
    for (name, schema) in manifest {
        let slot = connections
            .entry(name.clone())
            .or_insert_with(|| Connection::from_schema(schema));
        slot.contract = schema.contract.clone();
        slot.optional = schema.optional;
    }
}

fn set_variable(variables: &mut BTreeMap<String, Variable>, name: &str, value: Value) -> bool {
    match variables.get_mut(name) {
        Some(slot) => {
            slot.value = Some(value);
            true
        }
        None => false,
    }
}

fn set_connection(
    connections: &mut BTreeMap<String, Connection>,
    name: &str,
    target: ConnectionTarget,
) -> bool {
    match connections.get_mut(name) {
        Some(slot) => {
            slot.reference = Some(target);
            true
        }
        None => false,
    }
}

impl CapabilityConfigUpdater for CapabilityConfig {
    fn update_schema(&mut self, source: &str, version: &ModuleVersion) {
        self.source = source.to_string();
        self.source_version = version.version.clone();
        sync_variables(&mut self.variables, version);
        sync_connections(&mut self.connections, version);
    }

    fn update_variable(&mut self, name: &str, value: Value) -> bool {
        set_variable(&mut self.variables, name, value)
    }

    fn update_connection_target(&mut self, name: &str, target: ConnectionTarget) -> bool {
        set_connection(&mut self.connections, name, target)
    }

    fn update_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace;
    }
}

impl WorkspaceConfigUpdater for WorkspaceConfig {
    fn update_schema(&mut self, source: &str, version: &ModuleVersion) {
        self.source = source.to_string();
        self.source_version = version.version.clone();
        sync_variables(&mut self.variables, version);
        sync_connections(&mut self.connections, version);
    }

    fn update_variable(&mut self, name: &str, value: Value) -> bool {
        set_variable(&mut self.variables, name, value)
    }

    fn update_connection_target(&mut self, name: &str, target: ConnectionTarget) -> bool {
        set_connection(&mut self.connections, name, target)
    }

    fn add_or_update_env_variable(&mut self, name: &str, value: &str, sensitive: bool) {
        self.env_variables
            .insert(name.to_string(), EnvVariable::new(value, sensitive));
    }

    fn remove_env_variables_not_in(&mut self, keep: &BTreeSet<String>) {
        self.env_variables.retain(|name, _| keep.contains(name));
    }

    fn find_capability(
        &mut self,
        identity: &CapabilityIdentity,
    ) -> Option<&mut dyn CapabilityConfigUpdater> {
        self.capabilities
            .iter_mut()
            .find(|c| identity.matches(c))
            .map(|c| c as &mut dyn CapabilityConfigUpdater)
    }

    fn add_capability(&mut self, identity: &CapabilityIdentity) -> &mut dyn CapabilityConfigUpdater {
        let capability = match identity {
            CapabilityIdentity::Durable(id) => CapabilityConfig {
                id: Some(*id),
                ..Default::default()
            },
            CapabilityIdentity::Ephemeral {
                source,
                connections,
                namespace,
            } => CapabilityConfig {
                source: source.clone(),
                namespace: namespace.clone(),
                connections: connections
                    .iter()
                    .map(|(name, target)| (name.clone(), Connection::to(target.clone())))
                    .collect(),
                ..Default::default()
            },
        };
        let index = self.capabilities.len();
        self.capabilities.push(capability);
        &mut self.capabilities[index]
    }

    fn retain_capabilities(&mut self, identities: &[CapabilityIdentity]) {
        self.capabilities
            .retain(|c| identities.iter().any(|identity| identity.matches(c)));
    }

    fn update_domain_name(&mut self, dns_name: &str) {
        self.extra.domain = Some(DomainExtra {
            dns_name: dns_name.to_string(),
        });
    }

    fn update_subdomain_reservation(&mut self, reservation: SubdomainReservation) {
        self.extra.subdomain = Some(reservation);
    }
}
