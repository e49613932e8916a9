//! In-memory module registry.
//!
//! Backs tests and offline tooling with a catalog held entirely in memory,
//! optionally loaded from a YAML document.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ModuleError, ModuleResult, ResolverError};
use crate::module::{Module, ModuleVersion};
use crate::registry::ModuleRegistry;

#[derive(Debug, Clone)]
struct CatalogEntry {
    module: Module,
    versions: Vec<ModuleVersion>,
}

/// A module as written in a catalog document: module fields plus versions.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogModule {
    #[serde(flatten)]
    pub module: Module,
    #[serde(default)]
    pub versions: Vec<ModuleVersion>,
}

/// Registry of modules held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    modules: HashMap<(String, String), CatalogEntry>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module and its versions.
    ///
    /// When the module has no `latest_version`, the last listed version
    /// becomes its latest pointer.
    pub fn register(&mut self, mut module: Module, versions: Vec<ModuleVersion>) {
        if module.latest_version.is_none() {
            module.latest_version = versions.last().map(|v| v.version.clone());
        }
        debug!(
            "Registering module {} ({} versions)",
            module.source(),
            versions.len()
        );
        let key = (module.org_name.clone(), module.name.clone());
        self.modules.insert(key, CatalogEntry { module, versions });
    }

    pub fn with_module(mut self, module: Module, versions: Vec<ModuleVersion>) -> Self {
        self.register(module, versions);
        self
    }

    /// Load a list of modules from YAML.
    pub fn from_yaml_str(content: &str) -> ModuleResult<Self> {
        let modules: Vec<CatalogModule> = serde_yaml::from_str(content)?;
        Self::from_catalog(modules)
    }

    /// Build a registry from catalog entries, rejecting unnamed modules.
    pub fn from_catalog(modules: Vec<CatalogModule>) -> ModuleResult<Self> {
        let mut registry = Self::new();
        for entry in modules {
            if entry.module.org_name.is_empty() || entry.module.name.is_empty() {
                return Err(ModuleError::InvalidCatalog(
                    "every module needs an org_name and a name".to_string(),
                ));
            }
            registry.register(entry.module, entry.versions);
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleRegistry for InMemoryRegistry {
    fn get_module(&self, org_name: &str, module_name: &str) -> Result<Option<Module>, ResolverError> {
        Ok(self
            .modules
            .get(&(org_name.to_string(), module_name.to_string()))
            .map(|e| e.module.clone()))
    }

    fn get_module_version(
        &self,
        org_name: &str,
        module_name: &str,
        version: &str,
    ) -> Result<Option<ModuleVersion>, ResolverError> {
        Ok(self
            .modules
            .get(&(org_name.to_string(), module_name.to_string()))
            .and_then(|e| e.versions.iter().find(|v| v.version == version))
            .cloned())
    }
}
