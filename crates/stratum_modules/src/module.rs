//! Module, version and manifest definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratum_config::Value;

use crate::contract::ModuleContractName;

/// Schema of one module variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSchema {
    #[serde(rename = "type", default)]
    pub var_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub sensitive: bool,
}

/// Schema of one module connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSchema {
    /// Contract pattern the connected block's module must satisfy.
    pub contract: String,
    #[serde(default)]
    pub optional: bool,
}

/// What a module version expects from the blocks that use it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSchema>,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionSchema>,
}

/// A published version of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub version: String,
    #[serde(default)]
    pub manifest: Manifest,
}

impl ModuleVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            manifest: Manifest::default(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, schema: VariableSchema) -> Self {
        self.manifest.variables.insert(name.into(), schema);
        self
    }

    pub fn with_connection(mut self, name: impl Into<String>, contract: impl Into<String>) -> Self {
        self.manifest.connections.insert(
            name.into(),
            ConnectionSchema {
                contract: contract.into(),
                optional: false,
            },
        );
        self
    }
}

/// A reusable infrastructure template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub org_name: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    #[serde(default)]
    pub provider_types: Vec<String>,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub subplatform: String,
    /// Application subcategories a capability module can attach to.
    #[serde(default)]
    pub app_categories: Vec<String>,
    /// Version that `latest` resolves to.
    #[serde(default)]
    pub latest_version: Option<String>,
}

impl Module {
    pub fn new(
        org_name: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        subcategory: impl Into<String>,
    ) -> Self {
        Self {
            org_name: org_name.into(),
            name: name.into(),
            category: category.into(),
            subcategory: subcategory.into(),
            ..Default::default()
        }
    }

    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provider_types = providers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>, subplatform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self.subplatform = subplatform.into();
        self
    }

    pub fn with_app_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn source(&self) -> String {
        format!("{}/{}", self.org_name, self.name)
    }

    /// Classify this module for contract matching.
    pub fn contract_name(&self) -> ModuleContractName {
        ModuleContractName::new(
            &self.category,
            &self.subcategory,
            self.provider_types.join(","),
            &self.platform,
            &self.subplatform,
        )
    }

    pub fn supports_app_category(&self, category: &str) -> bool {
        self.app_categories.iter().any(|c| c == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_name_joins_providers() {
        let module = Module::new("acme", "postgres", "datastore", "postgres")
            .with_providers(["aws", "gcp"]);
        let contract = module.contract_name();
        assert_eq!(contract.provider, "aws,gcp");
        assert_eq!(module.source(), "acme/postgres");
    }

    #[test]
    fn test_manifest_from_yaml() {
        let version: ModuleVersion = serde_yaml::from_str(
            r#"
version: 1.2.0
manifest:
  variables:
    cpu:
      type: number
      default: 256
  connections:
    network:
      contract: network/aws/*
"#,
        )
        .unwrap();
        assert_eq!(
            version.manifest.variables["cpu"].default,
            Some(Value::from(256i64))
        );
        assert_eq!(version.manifest.connections["network"].contract, "network/aws/*");
    }
}
