//! Error types for the core engine.

use stratum_config::{ValidationErrorKind, ValidationErrors};
use stratum_modules::{ModuleError, ResolverError};
use stratum_workspace::WorkspaceError;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while normalizing, validating or planning.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration is invalid:\n{0}")]
    Invalid(ValidationErrors),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CoreError {
    /// The located findings, if this is a configuration error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            CoreError::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Outcome of a failed connection normalization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A stack, environment or block named by the reference does not exist.
    #[error("{0}")]
    NotFound(ValidationErrorKind),

    #[error(transparent)]
    Resolver(#[from] ResolverError),
}
