//! # stratum_workspace
//!
//! Workspace configuration reconciliation for Stratum.
//!
//! A workspace configuration is the persisted, already-applied state of one
//! block. This crate turns declared configuration into desired workspace
//! state, computes the changes between two states, merges independently
//! computed change sets, and replays changes onto persisted state.
//!
//! ## Features
//!
//! - Diff engine producing changes indexed by `"changeType/identifier"`
//! - Change merging with cancellation of opposing changes
//! - Two-phase config applier (base layer, then override layer)
//! - Template placeholder substitution for org, stack and environment names
//!
//! ## Example
//!
//! ```rust
//! use stratum_config::Value;
//! use stratum_workspace::{apply_changes, diff, ChangeAction, Variable, WorkspaceConfig};
//!
//! let mut current = WorkspaceConfig::new("acme/fargate-service", "0.1.0");
//! current.variables.insert("cpu".into(), Variable::with_value(Value::from(256i64)));
//!
//! let mut desired = current.clone();
//! desired.variables.insert("cpu".into(), Variable::with_value(Value::from(512i64)));
//!
//! let changes = diff(&current, &desired);
//! assert_eq!(changes.get("variable/cpu").unwrap().action, ChangeAction::Update);
//!
//! apply_changes(&mut current, changes.iter()).unwrap();
//! assert_eq!(current.variables["cpu"].effective(), Some(&Value::from(512i64)));
//! ```

pub mod apply;
pub mod applier;
pub mod capability;
pub mod change;
pub mod diff;
pub mod error;
pub mod merge;
pub mod models;
pub mod template;
pub mod updater;

pub use apply::apply_changes;
pub use applier::{ConfigApplier, SubdomainReserver};
pub use capability::CapabilityIdentity;
pub use change::{ChangeAction, ChangeType, ChangeValue, IndexedChanges, WorkspaceChange};
pub use diff::{diff, diff_with_policy, DiffPolicy};
pub use error::{WorkspaceError, WorkspaceResult};
pub use merge::merge;
pub use models::{
    CapabilityConfig, Connection, DomainExtra, EnvVariable, SubdomainReservation, Variable,
    WorkspaceConfig, WorkspaceExtra,
};
pub use template::TemplateVars;
pub use updater::{CapabilityConfigUpdater, WorkspaceConfigUpdater};
