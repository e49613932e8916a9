//! Static catalog loaded from a YAML document.
//!
//! Bundles modules, topology, integration channels and the DNS domain of one
//! organization, so validation and planning can run fully offline:
//!
//! ```yaml
//! domain: acme.dev
//! modules:
//!   - org_name: acme
//!     name: aws-network
//!     category: network
//!     subcategory: vpc
//!     versions:
//!       - version: 0.1.0
//! stacks:
//!   - id: 1
//!     name: core
//!     environments:
//!       - { id: 10, name: dev }
//!     blocks:
//!       - { id: 100, name: main-network, module: acme/aws-network }
//! channels:
//!   slack:
//!     - { id: C1, name: deploys }
//! ```
//!
//! The catalog serves any organization name it is asked about.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use stratum_modules::{CatalogModule, InMemoryRegistry, Module, ModuleRegistry, ModuleVersion, ResolverError};
use stratum_workspace::{SubdomainReservation, SubdomainReserver};
use tracing::debug;

use crate::channels::{Channel, ChannelSource};
use crate::error::{CoreError, CoreResult};
use crate::topology::{Block, Environment, Stack, TopologySource};

#[derive(Deserialize)]
struct RawStack {
    id: i64,
    name: String,
    #[serde(default)]
    environments: Vec<Environment>,
    #[serde(default)]
    blocks: Vec<Block>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawCatalog {
    domain: Option<String>,
    modules: Vec<CatalogModule>,
    stacks: Vec<RawStack>,
    channels: BTreeMap<String, Vec<Channel>>,
}

#[derive(Debug)]
struct StackEntry {
    stack: Stack,
    environments: Vec<Environment>,
    blocks: Vec<Block>,
}

/// Everything the engine looks up, held in memory.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    registry: InMemoryRegistry,
    stacks: Vec<StackEntry>,
    channels: HashMap<String, Vec<Channel>>,
    domain: Option<String>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog document.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let raw: RawCatalog = if content.trim().is_empty() {
            RawCatalog::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let registry = InMemoryRegistry::from_catalog(raw.modules)?;

        let mut stacks = Vec::with_capacity(raw.stacks.len());
        for raw_stack in raw.stacks {
            if stacks.iter().any(|s: &StackEntry| s.stack.name == raw_stack.name) {
                return Err(CoreError::Catalog(format!(
                    "duplicate stack {:?}",
                    raw_stack.name
                )));
            }
            let stack_id = raw_stack.id;
            let environments = raw_stack
                .environments
                .into_iter()
                .map(|env| Environment { stack_id, ..env })
                .collect();
            let blocks = raw_stack
                .blocks
                .into_iter()
                .map(|block| Block { stack_id, ..block })
                .collect();
            stacks.push(StackEntry {
                stack: Stack {
                    id: raw_stack.id,
                    name: raw_stack.name,
                },
                environments,
                blocks,
            });
        }

        debug!(
            "Loaded catalog: {} modules, {} stacks, {} channel tools",
            registry.len(),
            stacks.len(),
            raw.channels.len()
        );

        Ok(Self {
            registry,
            stacks,
            channels: raw.channels.into_iter().collect(),
            domain: raw.domain,
        })
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    fn stack(&self, stack_id: i64) -> Option<&StackEntry> {
        self.stacks.iter().find(|s| s.stack.id == stack_id)
    }
}

impl ModuleRegistry for StaticCatalog {
    fn get_module(&self, org_name: &str, module_name: &str) -> Result<Option<Module>, ResolverError> {
        self.registry.get_module(org_name, module_name)
    }

    fn get_module_version(
        &self,
        org_name: &str,
        module_name: &str,
        version: &str,
    ) -> Result<Option<ModuleVersion>, ResolverError> {
        self.registry
            .get_module_version(org_name, module_name, version)
    }
}

impl TopologySource for StaticCatalog {
    fn list_stacks(&self, _org_name: &str) -> Result<Vec<Stack>, ResolverError> {
        Ok(self.stacks.iter().map(|s| s.stack.clone()).collect())
    }

    fn list_environments(
        &self,
        _org_name: &str,
        stack_id: i64,
    ) -> Result<Vec<Environment>, ResolverError> {
        Ok(self
            .stack(stack_id)
            .map(|s| s.environments.clone())
            .unwrap_or_default())
    }

    fn list_blocks(&self, _org_name: &str, stack_id: i64) -> Result<Vec<Block>, ResolverError> {
        Ok(self
            .stack(stack_id)
            .map(|s| s.blocks.clone())
            .unwrap_or_default())
    }
}

impl ChannelSource for StaticCatalog {
    fn list_channels(&self, tool: &str) -> Result<Vec<Channel>, ResolverError> {
        Ok(self.channels.get(tool).cloned().unwrap_or_default())
    }
}

impl SubdomainReserver for StaticCatalog {
    fn reserve_subdomain(
        &self,
        block_name: &str,
        requested: &str,
    ) -> Result<SubdomainReservation, ResolverError> {
        let domain = self.domain.as_deref().ok_or_else(|| {
            ResolverError::backend(
                "dns",
                format!("no domain configured to reserve {:?} for {}", requested, block_name),
            )
        })?;
        Ok(SubdomainReservation {
            subdomain_name: requested.to_string(),
            domain_name: domain.to_string(),
            fqdn: format!("{}.{}", requested, domain),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::EnvType;

    const CATALOG: &str = r#"
domain: acme.dev
modules:
  - org_name: acme
    name: aws-network
    category: network
    subcategory: vpc
    provider_types: [aws]
    versions:
      - version: 0.1.0
      - version: 0.2.0
stacks:
  - id: 1
    name: core
    environments:
      - { id: 10, name: dev }
      - { id: 12, name: previews, type: previews_shared }
    blocks:
      - { id: 100, name: main-network, module: acme/aws-network, module_version: 0.2.0 }
channels:
  slack:
    - { id: C1, name: deploys }
"#;

    #[test]
    fn test_loads_all_sections() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();

        let module = catalog.get_module("acme", "aws-network").unwrap().unwrap();
        assert_eq!(module.latest_version.as_deref(), Some("0.2.0"));

        let stacks = catalog.list_stacks("acme").unwrap();
        assert_eq!(stacks, vec![Stack { id: 1, name: "core".into() }]);

        let envs = catalog.list_environments("acme", 1).unwrap();
        assert_eq!(envs.len(), 2);
        assert!(envs.iter().all(|e| e.stack_id == 1));
        assert_eq!(envs[1].env_type, EnvType::PreviewsShared);

        let blocks = catalog.list_blocks("acme", 1).unwrap();
        assert_eq!(blocks[0].module_version(), "0.2.0");
        assert!(catalog.list_blocks("acme", 2).unwrap().is_empty());

        assert_eq!(catalog.list_channels("slack").unwrap().len(), 1);
        assert!(catalog.list_channels("teams").unwrap().is_empty());
    }

    #[test]
    fn test_reserve_subdomain() {
        let catalog = StaticCatalog::from_yaml_str(CATALOG).unwrap();
        let reservation = catalog.reserve_subdomain("docs", "docs").unwrap();
        assert_eq!(reservation.fqdn, "docs.acme.dev");

        let bare = StaticCatalog::new();
        assert!(bare.reserve_subdomain("docs", "docs").is_err());
        let with_domain = StaticCatalog::new().with_domain("example.org");
        assert_eq!(with_domain.domain(), Some("example.org"));
    }

    #[test]
    fn test_rejects_duplicate_stacks() {
        let err = StaticCatalog::from_yaml_str(
            "stacks:\n  - { id: 1, name: core }\n  - { id: 2, name: core }\n",
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Catalog(_)));
    }

    #[test]
    fn test_empty_document() {
        let catalog = StaticCatalog::from_yaml_str("").unwrap();
        assert!(catalog.list_stacks("acme").unwrap().is_empty());
    }
}
