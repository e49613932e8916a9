//! # stratum_config
//!
//! Declarative block configuration model for Stratum.
//!
//! This crate holds the typed form of an infrastructure configuration file:
//! blocks of every kind, their module references, variables, connections and
//! capabilities, plus the path-addressed error model shared by the resolve,
//! validate and normalize passes.
//!
//! ## Block kinds
//!
//! All nine block kinds (generic blocks, networks, clusters, cluster
//! namespaces, ingresses, domains, subdomains, datastores and applications)
//! share one [`BlockConfiguration`] type. The differences between them are
//! captured by a [`KindDescriptor`], looked up through [`BlockKind`].
//!
//! ## Example
//!
//! ```rust
//! use stratum_config::{BlockKind, EnvConfiguration};
//!
//! let config = EnvConfiguration::from_yaml_str("acme/infra", "config.yml", r#"
//! apps:
//!   api:
//!     module: acme/fargate-service
//!     vars:
//!       cpu: 256
//!     connections:
//!       network: core.dev.main-network
//! "#).unwrap();
//!
//! let api = config.get_block(BlockKind::Application, "api").unwrap();
//! assert_eq!(api.module_version(), "latest");
//! ```

pub mod connection;
pub mod error;
pub mod kind;
pub mod layers;
pub mod models;
pub mod path;
pub mod value;

pub use connection::ConnectionTarget;
pub use error::{
    ConfigError, ConfigResult, ErrorFamily, ValidationError, ValidationErrorKind,
    ValidationErrors,
};
pub use kind::{BlockKind, KindDescriptor, CAPABILITY_CONTRACT};
pub use layers::{ConfigLayers, OverrideScope};
pub use models::{
    BlockConfiguration, CapabilityConfiguration, EnvConfiguration, EnvVariableConfiguration,
    EventConfiguration, EventTargets, SlackTarget, DEFAULT_MODULE_VERSION,
};
pub use path::{FileContext, ObjectPath};
pub use value::Value;
