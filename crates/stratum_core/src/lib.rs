//! # stratum_core
//!
//! Connection normalization and configuration validation for Stratum.
//!
//! ## Features
//!
//! - **Topology**: per-organization cache of stacks, environments and blocks
//! - **Normalization**: resolve partial connection references to fully
//!   qualified, id-bearing targets
//! - **Validation**: check blocks, capabilities and events against module
//!   manifests, collecting every finding
//! - **Channels**: load an integration tool's channel list at most once
//! - **Catalog**: a static, YAML-backed implementation of every lookup
//!   interface for offline use
//!
//! ## Example
//!
//! ```rust
//! use stratum_config::EnvConfiguration;
//! use stratum_core::{Engine, RunContext, StaticCatalog};
//!
//! let catalog = StaticCatalog::from_yaml_str(r#"
//! modules:
//!   - { org_name: acme, name: aws-network, category: network, versions: [{ version: 0.1.0 }] }
//! stacks:
//!   - id: 1
//!     name: core
//!     environments: [{ id: 10, name: dev }]
//!     blocks: [{ id: 100, name: main-network, module: acme/aws-network }]
//! "#).unwrap();
//!
//! let mut config = EnvConfiguration::from_yaml_str(
//!     "acme/infra",
//!     "config.yml",
//!     "networks:\n  main-network:\n    module: acme/aws-network\n",
//! ).unwrap();
//!
//! let engine = Engine::from_catalog(&catalog);
//! let errors = engine.check(&RunContext::new("acme", "core", "dev"), &mut config).unwrap();
//! assert!(errors.is_empty());
//! ```

pub mod catalog;
pub mod channels;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod topology;
pub mod validator;

pub use catalog::StaticCatalog;
pub use channels::{Channel, ChannelCache, ChannelSource};
pub use engine::{Engine, Plan, RunContext, SLACK_TOOL};
pub use error::{CoreError, CoreResult, NormalizeError};
pub use normalizer::{ConnectionNormalizer, NormalizeContext};
pub use topology::{
    Block, BlockResolver, EnvType, Environment, Stack, TopologyCache, TopologySource,
};
pub use validator::{ConfigValidator, ValidateContext};
