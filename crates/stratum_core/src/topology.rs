//! Stack, environment and block topology.
//!
//! Topology comes from a [`TopologySource`] and is cached per organization.
//! Each stack's environments and blocks are loaded the first time anything
//! in that stack is looked up, then indexed by id and by name.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use stratum_config::{ConnectionTarget, DEFAULT_MODULE_VERSION};
use stratum_modules::ResolverError;
use tracing::debug;

/// A deployable grouping of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvType {
    #[default]
    Pipeline,
    Preview,
    /// Hosts the shared blocks used by every preview environment.
    PreviewsShared,
}

/// A deployment context inside a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub stack_id: i64,
    #[serde(rename = "type", default)]
    pub env_type: EnvType,
}

/// A block as registered in a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub stack_id: i64,
    #[serde(rename = "module", default)]
    pub module_source: String,
    #[serde(default)]
    pub module_version: Option<String>,
    #[serde(default)]
    pub is_shared: bool,
}

impl Block {
    pub fn module_version(&self) -> &str {
        self.module_version
            .as_deref()
            .unwrap_or(DEFAULT_MODULE_VERSION)
    }
}

/// Where topology is fetched from.
#[cfg_attr(test, mockall::automock)]
pub trait TopologySource {
    fn list_stacks(&self, org_name: &str) -> Result<Vec<Stack>, ResolverError>;

    fn list_environments(
        &self,
        org_name: &str,
        stack_id: i64,
    ) -> Result<Vec<Environment>, ResolverError>;

    fn list_blocks(&self, org_name: &str, stack_id: i64) -> Result<Vec<Block>, ResolverError>;
}

/// Looks up the block a connection target points at.
///
/// `Ok(None)` means the block does not exist.
pub trait BlockResolver {
    fn resolve_block(
        &self,
        org_name: &str,
        target: &ConnectionTarget,
    ) -> Result<Option<Block>, ResolverError>;
}

trait Entity {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

impl Entity for Stack {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Environment {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Block {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
struct Indexed<T> {
    items: Vec<T>,
    by_id: HashMap<i64, usize>,
    by_name: HashMap<String, usize>,
}

impl<T: Entity> Indexed<T> {
    fn new(items: Vec<T>) -> Self {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            by_id.insert(item.id(), i);
            by_name.insert(item.name().to_string(), i);
        }
        Self {
            items,
            by_id,
            by_name,
        }
    }

    /// Find by id when one is given, otherwise by name.
    fn find(&self, id: Option<i64>, name: Option<&str>) -> Option<&T> {
        let index = match (id, name) {
            (Some(id), _) => self.by_id.get(&id),
            (None, Some(name)) => self.by_name.get(name),
            (None, None) => None,
        };
        index.and_then(|i| self.items.get(*i))
    }
}

#[derive(Debug)]
struct StackTopology {
    environments: Indexed<Environment>,
    blocks: Indexed<Block>,
}

#[derive(Debug, Default)]
struct OrgTopology {
    stacks: Option<Indexed<Stack>>,
    by_stack: HashMap<i64, StackTopology>,
}

/// Lazily populated, per-organization topology cache.
pub struct TopologyCache<'a> {
    source: &'a dyn TopologySource,
    orgs: RefCell<HashMap<String, OrgTopology>>,
}

impl<'a> TopologyCache<'a> {
    pub fn new(source: &'a dyn TopologySource) -> Self {
        Self {
            source,
            orgs: RefCell::new(HashMap::new()),
        }
    }

    pub fn find_stack(
        &self,
        org_name: &str,
        id: Option<i64>,
        name: Option<&str>,
    ) -> Result<Option<Stack>, ResolverError> {
        let mut orgs = self.orgs.borrow_mut();
        let org = orgs.entry(org_name.to_string()).or_default();
        if org.stacks.is_none() {
            let stacks = self.source.list_stacks(org_name)?;
            debug!("Loaded {} stacks for {}", stacks.len(), org_name);
            org.stacks = Some(Indexed::new(stacks));
        }
        Ok(org
            .stacks
            .as_ref()
            .and_then(|stacks| stacks.find(id, name))
            .cloned())
    }

    pub fn find_environment(
        &self,
        org_name: &str,
        stack_id: i64,
        id: Option<i64>,
        name: Option<&str>,
    ) -> Result<Option<Environment>, ResolverError> {
        self.with_stack(org_name, stack_id, |stack| {
            stack.environments.find(id, name).cloned()
        })
    }

    /// The environment that hosts a stack's shared blocks, if it has one.
    pub fn previews_shared_environment(
        &self,
        org_name: &str,
        stack_id: i64,
    ) -> Result<Option<Environment>, ResolverError> {
        self.with_stack(org_name, stack_id, |stack| {
            stack
                .environments
                .items
                .iter()
                .find(|env| env.env_type == EnvType::PreviewsShared)
                .cloned()
        })
    }

    pub fn find_block(
        &self,
        org_name: &str,
        stack_id: i64,
        id: Option<i64>,
        name: Option<&str>,
    ) -> Result<Option<Block>, ResolverError> {
        self.with_stack(org_name, stack_id, |stack| stack.blocks.find(id, name).cloned())
    }

    fn with_stack<R>(
        &self,
        org_name: &str,
        stack_id: i64,
        f: impl FnOnce(&StackTopology) -> R,
    ) -> Result<R, ResolverError> {
        let mut orgs = self.orgs.borrow_mut();
        let org = orgs.entry(org_name.to_string()).or_default();
        let stack = match org.by_stack.entry(stack_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let environments = self.source.list_environments(org_name, stack_id)?;
                let blocks = self.source.list_blocks(org_name, stack_id)?;
                debug!(
                    "Loaded stack {} for {}: {} environments, {} blocks",
                    stack_id,
                    org_name,
                    environments.len(),
                    blocks.len()
                );
                entry.insert(StackTopology {
                    environments: Indexed::new(environments),
                    blocks: Indexed::new(blocks),
                })
            }
        };
        Ok(f(stack))
    }
}

impl BlockResolver for TopologyCache<'_> {
    fn resolve_block(
        &self,
        org_name: &str,
        target: &ConnectionTarget,
    ) -> Result<Option<Block>, ResolverError> {
        let Some(stack) = self.find_stack(org_name, target.stack_id, target.stack_name.as_deref())?
        else {
            return Ok(None);
        };
        self.find_block(org_name, stack.id, target.block_id, Some(&target.block_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> MockTopologySource {
        let mut source = MockTopologySource::new();
        source.expect_list_stacks().times(1).returning(|_| {
            Ok(vec![Stack {
                id: 1,
                name: "core".into(),
            }])
        });
        source.expect_list_environments().times(1).returning(|_, stack_id| {
            Ok(vec![
                Environment {
                    id: 10,
                    name: "dev".into(),
                    stack_id,
                    env_type: EnvType::Pipeline,
                },
                Environment {
                    id: 12,
                    name: "previews".into(),
                    stack_id,
                    env_type: EnvType::PreviewsShared,
                },
            ])
        });
        source.expect_list_blocks().times(1).returning(|_, stack_id| {
            Ok(vec![Block {
                id: 100,
                name: "main-network".into(),
                stack_id,
                module_source: "acme/aws-network".into(),
                module_version: None,
                is_shared: false,
            }])
        });
        source
    }

    #[test]
    fn test_lookups_load_each_stack_once() {
        let source = source();
        let cache = TopologyCache::new(&source);

        let stack = cache.find_stack("acme", None, Some("core")).unwrap().unwrap();
        assert_eq!(stack.id, 1);
        assert_eq!(cache.find_stack("acme", Some(1), None).unwrap(), Some(stack));

        let env = cache.find_environment("acme", 1, None, Some("dev")).unwrap();
        assert_eq!(env.map(|e| e.id), Some(10));
        let shared = cache.previews_shared_environment("acme", 1).unwrap();
        assert_eq!(shared.map(|e| e.name), Some("previews".to_string()));
        let block = cache.find_block("acme", 1, Some(100), None).unwrap().unwrap();
        assert_eq!(block.module_version(), "latest");
        assert!(cache.find_block("acme", 1, None, Some("nope")).unwrap().is_none());
    }

    #[test]
    fn test_resolve_block_by_target() {
        let source = source();
        let cache = TopologyCache::new(&source);
        let target = ConnectionTarget::block("main-network").with_stack("core");
        let block = cache.resolve_block("acme", &target).unwrap().unwrap();
        assert_eq!(block.id, 100);
    }

    #[test]
    fn test_missing_stack_resolves_to_none() {
        let mut source = MockTopologySource::new();
        source.expect_list_stacks().returning(|_| Ok(vec![]));
        let cache = TopologyCache::new(&source);
        let target = ConnectionTarget::block("x").with_stack("ghost");
        assert_eq!(cache.resolve_block("acme", &target).unwrap(), None);
    }

    #[test]
    fn test_transport_error_propagates() {
        let mut source = MockTopologySource::new();
        source
            .expect_list_stacks()
            .returning(|_| Err(ResolverError::Unauthorized { resource: "stacks".into() }));
        let cache = TopologyCache::new(&source);
        assert!(matches!(
            cache.find_stack("acme", None, Some("core")),
            Err(ResolverError::Unauthorized { .. })
        ));
    }
}
