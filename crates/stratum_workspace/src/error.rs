//! Error types for workspace reconciliation.

use stratum_modules::{ResolveModuleError, ResolverError};
use thiserror::Error;

/// Result type alias for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Errors that can occur while applying configuration or changes.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Module resolution failed for {block}: {source}")]
    Resolve {
        block: String,
        #[source]
        source: ResolveModuleError,
    },

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Invalid change {key}: {reason}")]
    InvalidChange { key: String, reason: String },

    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),
}
