//! Persisted workspace configuration models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratum_config::{ConnectionTarget, Value};
use stratum_modules::{ConnectionSchema, VariableSchema};

/// A module variable slot and its current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub sensitive: bool,
}

impl Variable {
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn from_schema(schema: &VariableSchema) -> Self {
        Self {
            value: None,
            default: schema.default.clone(),
            sensitive: schema.sensitive,
        }
    }

    /// The explicit value, falling back to the schema default.
    pub fn effective(&self) -> Option<&Value> {
        self.value.as_ref().or(self.default.as_ref())
    }
}

/// A module connection slot and the block it points at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub contract: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub reference: Option<ConnectionTarget>,
}

impl Connection {
    pub fn from_schema(schema: &ConnectionSchema) -> Self {
        Self {
            contract: schema.contract.clone(),
            optional: schema.optional,
            reference: None,
        }
    }

    pub fn to(reference: ConnectionTarget) -> Self {
        Self {
            reference: Some(reference),
            ..Default::default()
        }
    }

    /// Equality of the resolved reference, ignoring the declared spelling.
    pub fn reference_eq(&self, other: &Connection) -> bool {
        match (&self.reference, &other.reference) {
            (Some(a), Some(b)) => a.resolved_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// An environment variable injected into an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVariable {
    pub value: String,
    #[serde(default)]
    pub sensitive: bool,
}

impl EnvVariable {
    pub fn new(value: impl Into<String>, sensitive: bool) -> Self {
        Self {
            value: value.into(),
            sensitive,
        }
    }
}

/// A persisted capability attached to an application workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityConfig {
    /// Assigned the first time the capability is saved.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub source: String,
    #[serde(default)]
    pub source_version: String,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
    #[serde(default)]
    pub connections: BTreeMap<String, Connection>,
    #[serde(default)]
    pub namespace: Option<String>,
    /// Marked for teardown on the next run.
    #[serde(default)]
    pub needs_destroyed: bool,
}

impl CapabilityConfig {
    pub fn new(source: impl Into<String>, source_version: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_version: source_version.into(),
            ..Default::default()
        }
    }

    pub fn with_connection(mut self, name: impl Into<String>, target: ConnectionTarget) -> Self {
        self.connections.insert(name.into(), Connection::to(target));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables
            .insert(name.into(), Variable::with_value(value.into()));
        self
    }
}

/// A reserved subdomain backing a subdomain block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainReservation {
    #[serde(default)]
    pub subdomain_name: String,
    #[serde(default)]
    pub domain_name: String,
    #[serde(default)]
    pub fqdn: String,
}

/// DNS settings backing a domain block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainExtra {
    #[serde(default)]
    pub dns_name: String,
}

/// Kind-specific sub-objects stored alongside the workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<DomainExtra>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<SubdomainReservation>,
}

/// The persisted configuration of one block's workspace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub source_version: String,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
    #[serde(default)]
    pub env_variables: BTreeMap<String, EnvVariable>,
    #[serde(default)]
    pub connections: BTreeMap<String, Connection>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityConfig>,
    #[serde(default)]
    pub extra: WorkspaceExtra,
}

impl WorkspaceConfig {
    pub fn new(source: impl Into<String>, source_version: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_version: source_version.into(),
            ..Default::default()
        }
    }

    /// A workspace that has never been applied has no module.
    pub fn is_unapplied(&self) -> bool {
        self.source.is_empty()
    }
}
