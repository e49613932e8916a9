//! Capability identity.
//!
//! Before a capability is saved it is known only by what it is: its module
//! source and the blocks it connects to. Saving assigns a numeric id, and from
//! then on the id alone identifies it.
//!
//! A namespace tells apart several unsaved instances of the same module wired
//! to the same blocks. An identity without one matches any namespace.

use std::collections::BTreeMap;

use stratum_config::{CapabilityConfiguration, ConnectionTarget};
use stratum_modules::ModuleVersion;

use crate::models::CapabilityConfig;

/// How a capability instance is recognized across diff and apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityIdentity {
    /// Not yet persisted: module source plus resolved connection targets.
    Ephemeral {
        source: String,
        connections: BTreeMap<String, ConnectionTarget>,
        namespace: Option<String>,
    },
    /// Persisted: the id assigned on first save.
    Durable(i64),
}

impl CapabilityIdentity {
    pub fn ephemeral(source: impl Into<String>, connections: BTreeMap<String, ConnectionTarget>) -> Self {
        CapabilityIdentity::Ephemeral {
            source: source.into(),
            connections,
            namespace: None,
        }
    }

    /// Narrow an ephemeral identity to one namespace.
    pub fn with_namespace(self, namespace: Option<String>) -> Self {
        match self {
            CapabilityIdentity::Ephemeral {
                source,
                connections,
                ..
            } => CapabilityIdentity::Ephemeral {
                source,
                connections,
                namespace,
            },
            durable => durable,
        }
    }

    /// Identity of a declared capability, which never has an id.
    pub fn of_declared(capability: &CapabilityConfiguration) -> Self {
        Self::ephemeral(&capability.module_source, capability.connections.clone())
            .with_namespace(capability.namespace.clone())
    }

    /// Identity of a declared capability as it will be persisted under
    /// `version`: connections the manifest does not know are pruned on apply,
    /// so they take no part in the identity either.
    pub fn of_declared_in(capability: &CapabilityConfiguration, version: &ModuleVersion) -> Self {
        let connections = capability
            .connections
            .iter()
            .filter(|(name, _)| version.manifest.connections.contains_key(*name))
            .map(|(name, target)| (name.clone(), target.clone()))
            .collect();
        Self::ephemeral(&capability.module_source, connections)
            .with_namespace(capability.namespace.clone())
    }

    /// Check whether a persisted capability has this identity.
    ///
    /// An ephemeral identity matches on module source and on every connection
    /// target, compared by resolved id. Entry order does not matter, but one
    /// differing target breaks the match. A namespace, when set, must also be
    /// equal.
    pub fn matches(&self, capability: &CapabilityConfig) -> bool {
        match self {
            CapabilityIdentity::Durable(id) => capability.id == Some(*id),
            CapabilityIdentity::Ephemeral {
                source,
                connections,
                namespace,
            } => {
                let persisted: BTreeMap<&String, &ConnectionTarget> = capability
                    .connections
                    .iter()
                    .filter_map(|(name, c)| c.reference.as_ref().map(|r| (name, r)))
                    .collect();
                *source == capability.source
                    && namespace
                        .as_ref()
                        .map_or(true, |ns| capability.namespace.as_ref() == Some(ns))
                    && persisted.len() == connections.len()
                    && connections.iter().all(|(name, target)| {
                        persisted
                            .get(name)
                            .map_or(false, |p| p.resolved_eq(target))
                    })
            }
        }
    }

    /// Stable string form, used as a change identifier.
    pub fn key(&self) -> String {
        match self {
            CapabilityIdentity::Durable(id) => id.to_string(),
            CapabilityIdentity::Ephemeral {
                source,
                connections,
                namespace,
            } => {
                let targets: Vec<String> = connections
                    .iter()
                    .map(|(name, target)| format!("{}={}", name, target.identity_key()))
                    .collect();
                match namespace {
                    Some(ns) => format!("{}[{}]@{}", source, targets.join(","), ns),
                    None => format!("{}[{}]", source, targets.join(",")),
                }
            }
        }
    }
}

impl CapabilityConfig {
    /// Durable identity once persisted, ephemeral before.
    pub fn identity(&self) -> CapabilityIdentity {
        match self.id {
            Some(id) => CapabilityIdentity::Durable(id),
            None => self.ephemeral_identity(),
        }
    }

    /// Module source plus connection targets, regardless of persistence.
    pub fn ephemeral_identity(&self) -> CapabilityIdentity {
        let connections = self
            .connections
            .iter()
            .filter_map(|(name, c)| c.reference.clone().map(|r| (name.clone(), r)))
            .collect();
        CapabilityIdentity::ephemeral(&self.source, connections).with_namespace(self.namespace.clone())
    }

    /// Record the id assigned on first save.
    pub fn persist(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
