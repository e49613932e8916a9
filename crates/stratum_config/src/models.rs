//! Configuration tree models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::ConnectionTarget;
use crate::error::ConfigResult;
use crate::kind::BlockKind;
use crate::path::{FileContext, ObjectPath};
use crate::value::Value;

/// Version constraint used when a block does not pin one.
pub const DEFAULT_MODULE_VERSION: &str = "latest";

/// An environment variable as declared on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvVariableConfiguration {
    Plain(String),
    Detailed {
        value: String,
        #[serde(default)]
        sensitive: bool,
    },
}

impl EnvVariableConfiguration {
    pub fn value(&self) -> &str {
        match self {
            EnvVariableConfiguration::Plain(v) => v,
            EnvVariableConfiguration::Detailed { value, .. } => value,
        }
    }

    pub fn sensitive(&self) -> bool {
        match self {
            EnvVariableConfiguration::Plain(_) => false,
            EnvVariableConfiguration::Detailed { sensitive, .. } => *sensitive,
        }
    }
}

/// A capability attached to an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityConfiguration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "module", default)]
    pub module_source: String,
    #[serde(default)]
    pub module_version: Option<String>,
    #[serde(rename = "vars", default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionTarget>,
    /// Distinguishes several instances of the same capability module.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl CapabilityConfiguration {
    pub fn new(module_source: impl Into<String>) -> Self {
        Self {
            module_source: module_source.into(),
            ..Default::default()
        }
    }

    pub fn module_version(&self) -> &str {
        self.module_version
            .as_deref()
            .unwrap_or(DEFAULT_MODULE_VERSION)
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_connection(mut self, name: impl Into<String>, target: ConnectionTarget) -> Self {
        self.connections.insert(name.into(), target);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// A declared infrastructure block of any kind.
///
/// `name` and `kind` come from where the block sits in the file, not from
/// the block body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockConfiguration {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub kind: BlockKind,
    #[serde(rename = "module", default)]
    pub module_source: String,
    #[serde(default)]
    pub module_version: Option<String>,
    #[serde(rename = "vars", default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionTarget>,
    /// Shared blocks live in the stack's previews-shared environment.
    #[serde(default)]
    pub is_shared: bool,
    #[serde(rename = "environment", default)]
    pub env_variables: BTreeMap<String, EnvVariableConfiguration>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityConfiguration>,
    /// Requested DNS name for domain and subdomain blocks.
    #[serde(default)]
    pub dns_name: Option<String>,
}

impl BlockConfiguration {
    pub fn new(kind: BlockKind, name: impl Into<String>, module_source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            module_source: module_source.into(),
            ..Default::default()
        }
    }

    pub fn module_version(&self) -> &str {
        self.module_version
            .as_deref()
            .unwrap_or(DEFAULT_MODULE_VERSION)
    }

    /// Location of this block inside its file, e.g. `apps.api`.
    pub fn path(&self) -> ObjectPath {
        ObjectPath::root().key(self.kind.field_key(), &self.name)
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn with_connection(mut self, name: impl Into<String>, target: ConnectionTarget) -> Self {
        self.connections.insert(name.into(), target);
        self
    }

    pub fn with_capability(mut self, capability: CapabilityConfiguration) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_env_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_variables
            .insert(name.into(), EnvVariableConfiguration::Plain(value.into()));
        self
    }

    pub fn shared(mut self) -> Self {
        self.is_shared = true;
        self
    }
}

/// Slack notification target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackTarget {
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Where event notifications are delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTargets {
    #[serde(default)]
    pub slack: Option<SlackTarget>,
}

/// A notification subscription declared alongside the blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfiguration {
    #[serde(default)]
    pub actions: Vec<String>,
    /// Restrict the subscription to these blocks; empty means all blocks.
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub targets: EventTargets,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawEnvConfiguration {
    blocks: BTreeMap<String, BlockConfiguration>,
    networks: BTreeMap<String, BlockConfiguration>,
    clusters: BTreeMap<String, BlockConfiguration>,
    cluster_namespaces: BTreeMap<String, BlockConfiguration>,
    ingresses: BTreeMap<String, BlockConfiguration>,
    domains: BTreeMap<String, BlockConfiguration>,
    subdomains: BTreeMap<String, BlockConfiguration>,
    datastores: BTreeMap<String, BlockConfiguration>,
    apps: BTreeMap<String, BlockConfiguration>,
    events: BTreeMap<String, EventConfiguration>,
}

impl RawEnvConfiguration {
    fn take(&mut self, kind: BlockKind) -> BTreeMap<String, BlockConfiguration> {
        let slot = match kind {
            BlockKind::Block => &mut self.blocks,
            BlockKind::Network => &mut self.networks,
            BlockKind::Cluster => &mut self.clusters,
            BlockKind::ClusterNamespace => &mut self.cluster_namespaces,
            BlockKind::Ingress => &mut self.ingresses,
            BlockKind::Domain => &mut self.domains,
            BlockKind::Subdomain => &mut self.subdomains,
            BlockKind::Datastore => &mut self.datastores,
            BlockKind::Application => &mut self.apps,
        };
        std::mem::take(slot)
    }
}

/// One parsed configuration file: every declared block, keyed by kind then name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfiguration {
    pub repo_name: String,
    pub filename: String,
    blocks: BTreeMap<BlockKind, BTreeMap<String, BlockConfiguration>>,
    pub events: BTreeMap<String, EventConfiguration>,
}

impl EnvConfiguration {
    pub fn new(repo_name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Parse a YAML document into a configuration tree.
    pub fn from_yaml_str(
        repo_name: impl Into<String>,
        filename: impl Into<String>,
        content: &str,
    ) -> ConfigResult<Self> {
        let mut raw: RawEnvConfiguration = if content.trim().is_empty() {
            RawEnvConfiguration::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let mut config = Self::new(repo_name, filename);
        for kind in BlockKind::ALL {
            for (name, mut block) in raw.take(kind) {
                block.name = name;
                block.kind = kind;
                config.insert_block(block);
            }
        }
        config.events = raw.events;

        debug!(
            "Parsed {} with {} blocks",
            config.context(),
            config.iter_blocks().count()
        );
        Ok(config)
    }

    pub fn context(&self) -> FileContext {
        FileContext::new(&self.repo_name, &self.filename)
    }

    /// Insert a block under its kind and name, returning any block it replaced.
    pub fn insert_block(&mut self, block: BlockConfiguration) -> Option<BlockConfiguration> {
        self.blocks
            .entry(block.kind)
            .or_default()
            .insert(block.name.clone(), block)
    }

    pub fn get_block(&self, kind: BlockKind, name: &str) -> Option<&BlockConfiguration> {
        self.blocks.get(&kind).and_then(|m| m.get(name))
    }

    pub fn get_block_mut(&mut self, kind: BlockKind, name: &str) -> Option<&mut BlockConfiguration> {
        self.blocks.get_mut(&kind).and_then(|m| m.get_mut(name))
    }

    /// Look a block up by name across all kinds.
    pub fn find_block(&self, name: &str) -> Option<&BlockConfiguration> {
        self.iter_blocks().find(|b| b.name == name)
    }

    pub fn blocks_of(&self, kind: BlockKind) -> impl Iterator<Item = &BlockConfiguration> {
        self.blocks.get(&kind).into_iter().flat_map(|m| m.values())
    }

    pub fn blocks_of_mut(
        &mut self,
        kind: BlockKind,
    ) -> impl Iterator<Item = &mut BlockConfiguration> {
        self.blocks
            .get_mut(&kind)
            .into_iter()
            .flat_map(|m| m.values_mut())
    }

    /// All blocks, kinds in [`BlockKind::ALL`] order, names sorted within a kind.
    pub fn iter_blocks(&self) -> impl Iterator<Item = &BlockConfiguration> {
        self.blocks.values().flat_map(|m| m.values())
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.values().all(|m| m.is_empty()) && self.events.is_empty()
    }
}
