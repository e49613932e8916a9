//! # stratum_modules
//!
//! Module catalog model, contract matching and module resolution for Stratum.
//!
//! Every block is backed by a versioned module. A module is classified by a
//! five-part contract (`category/subcategory/provider:platform:subplatform`)
//! and each version carries a manifest listing the variables and connections
//! it accepts.
//!
//! ## Example
//!
//! ```rust
//! use stratum_modules::{InMemoryRegistry, Module, ModuleResolver, ModuleVersion};
//!
//! let registry = InMemoryRegistry::new().with_module(
//!     Module::new("acme", "fargate-service", "app", "container")
//!         .with_providers(["aws"])
//!         .with_platform("ecs", "fargate"),
//!     vec![ModuleVersion::new("0.1.0")],
//! );
//!
//! let resolver = ModuleResolver::new(&registry);
//! let resolved = resolver
//!     .resolve("acme/fargate-service", "latest", "app/container/aws:ecs")
//!     .unwrap();
//! assert_eq!(resolved.version.version, "0.1.0");
//! ```

pub mod contract;
pub mod error;
pub mod memory;
pub mod module;
pub mod registry;
pub mod resolver;
pub mod source;

pub use contract::{match_contract, ContractParseError, ModuleContractName};
pub use error::{ModuleError, ModuleResult, ResolveModuleError, ResolverError};
pub use memory::{CatalogModule, InMemoryRegistry};
pub use module::{ConnectionSchema, Manifest, Module, ModuleVersion, VariableSchema};
pub use registry::ModuleRegistry;
pub use resolver::{ModuleResolver, ResolvedModule};
pub use source::ModuleSource;
