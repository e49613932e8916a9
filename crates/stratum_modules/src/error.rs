//! Error types for module handling.

use stratum_config::ValidationErrorKind;
use thiserror::Error;

use crate::contract::ContractParseError;

/// Result type alias for module operations.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// A lookup could not be completed.
///
/// This is distinct from "not found": resolver interfaces return `Ok(None)`
/// for missing entities and reserve errors for transport or backend failures.
/// The error is `Clone` so one failed load can be handed to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("Request to {service} timed out")]
    Timeout { service: String },

    #[error("Not authorized to access {resource}")]
    Unauthorized { resource: String },

    #[error("{service} request failed: {message}")]
    Backend { service: String, message: String },
}

impl ResolverError {
    pub fn backend(service: impl Into<String>, message: impl Into<String>) -> Self {
        ResolverError::Backend {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while loading module catalogs.
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Invalid contract: {0}")]
    Contract(#[from] ContractParseError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Outcome of a failed module resolution.
///
/// `Invalid` means the configuration is wrong and becomes a reported
/// validation error; `Resolver` means the check itself could not run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveModuleError {
    #[error("{0}")]
    Invalid(ValidationErrorKind),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}
