//! Diff engine: the changes that turn one workspace state into another.
//!
//! Each category is compared independently:
//! - Module source and version
//! - Variables, by effective value
//! - Environment variables, by value and sensitivity
//! - Connections, by resolved reference
//! - Capabilities, by persisted id or by ephemeral identity
//! - Extras, atomically per sub-object

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::change::{ChangeAction, ChangeType, ChangeValue, IndexedChanges, WorkspaceChange};
use crate::models::{CapabilityConfig, WorkspaceConfig};

const MODULE_IDENTIFIER: &str = "module";
const DOMAIN_IDENTIFIER: &str = "domain";
const SUBDOMAIN_IDENTIFIER: &str = "subdomain";

/// Knobs for the diff engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPolicy {
    /// Variables reconciled elsewhere and never diffed.
    pub reserved_variables: BTreeSet<String>,
}

impl Default for DiffPolicy {
    fn default() -> Self {
        Self {
            reserved_variables: ["env_vars", "secrets"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl DiffPolicy {
    pub fn with_reserved_variable(mut self, name: impl Into<String>) -> Self {
        self.reserved_variables.insert(name.into());
        self
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved_variables.contains(name)
    }
}

/// Diff two workspace states with the default policy.
pub fn diff(current: &WorkspaceConfig, desired: &WorkspaceConfig) -> IndexedChanges {
    diff_with_policy(current, desired, &DiffPolicy::default())
}

/// Diff two workspace states.
pub fn diff_with_policy(
    current: &WorkspaceConfig,
    desired: &WorkspaceConfig,
    policy: &DiffPolicy,
) -> IndexedChanges {
    let mut changes = IndexedChanges::new();

    diff_module(current, desired, &mut changes);
    diff_variables(current, desired, policy, &mut changes);
    diff_env_variables(current, desired, &mut changes);
    diff_connections(current, desired, &mut changes);
    diff_capabilities(&current.capabilities, &desired.capabilities, &mut changes);
    diff_extras(current, desired, &mut changes);

    debug!("Computed {} workspace changes", changes.len());
    changes
}

fn diff_module(current: &WorkspaceConfig, desired: &WorkspaceConfig, changes: &mut IndexedChanges) {
    // First apply has nothing to compare against.
    if current.source.is_empty() {
        return;
    }
    if current.source != desired.source || current.source_version != desired.source_version {
        changes.insert(WorkspaceChange::update(
            ChangeType::ModuleVersion,
            MODULE_IDENTIFIER,
            ChangeValue::Module {
                source: current.source.clone(),
                version: current.source_version.clone(),
            },
            ChangeValue::Module {
                source: desired.source.clone(),
                version: desired.source_version.clone(),
            },
        ));
    }
}

/// Shared add/update/delete walk over two keyed maps.
fn diff_map<T>(
    change_type: ChangeType,
    current: &BTreeMap<String, T>,
    desired: &BTreeMap<String, T>,
    skip: impl Fn(&str) -> bool,
    differs: impl Fn(&T, &T) -> bool,
    wrap: impl Fn(&T) -> ChangeValue,
    changes: &mut IndexedChanges,
) {
    for (name, want) in desired.iter().filter(|(name, _)| !skip(name)) {
        match current.get(name) {
            None => {
                changes.insert(WorkspaceChange::add(change_type, name, wrap(want)));
            }
            Some(have) if differs(have, want) => {
                changes.insert(WorkspaceChange::update(
                    change_type,
                    name,
                    wrap(have),
                    wrap(want),
                ));
            }
            Some(_) => {}
        }
    }
    for (name, have) in current.iter().filter(|(name, _)| !skip(name)) {
        if !desired.contains_key(name) {
            changes.insert(WorkspaceChange::delete(change_type, name, wrap(have)));
        }
    }
}

fn diff_variables(
    current: &WorkspaceConfig,
    desired: &WorkspaceConfig,
    policy: &DiffPolicy,
    changes: &mut IndexedChanges,
) {
    diff_map(
        ChangeType::Variable,
        &current.variables,
        &desired.variables,
        |name| policy.is_reserved(name),
        |a, b| a.effective() != b.effective(),
        |v| ChangeValue::Variable(v.clone()),
        changes,
    );
}

fn diff_env_variables(
    current: &WorkspaceConfig,
    desired: &WorkspaceConfig,
    changes: &mut IndexedChanges,
) {
    diff_map(
        ChangeType::EnvVariable,
        &current.env_variables,
        &desired.env_variables,
        |_| false,
        |a, b| a.value != b.value || a.sensitive != b.sensitive,
        |v| ChangeValue::EnvVariable(v.clone()),
        changes,
    );
}

fn diff_connections(
    current: &WorkspaceConfig,
    desired: &WorkspaceConfig,
    changes: &mut IndexedChanges,
) {
    diff_map(
        ChangeType::Connection,
        &current.connections,
        &desired.connections,
        |_| false,
        |a, b| !a.reference_eq(b),
        |v| ChangeValue::Connection(v.clone()),
        changes,
    );
}

fn diff_capabilities(
    current: &[CapabilityConfig],
    desired: &[CapabilityConfig],
    changes: &mut IndexedChanges,
) {
    let mut matched = vec![false; current.len()];

    for want in desired {
        let found = match want.id {
            Some(id) => current
                .iter()
                .enumerate()
                .position(|(i, c)| !matched[i] && c.id == Some(id)),
            None => {
                let identity = want.ephemeral_identity();
                current
                    .iter()
                    .enumerate()
                    .position(|(i, c)| !matched[i] && identity.matches(c))
            }
        };

        let Some(index) = found else {
            if !want.needs_destroyed {
                changes.insert(WorkspaceChange::add(
                    ChangeType::Capability,
                    want.identity().key(),
                    ChangeValue::Capability(want.clone()),
                ));
            }
            continue;
        };
        matched[index] = true;

        let have = &current[index];
        let identifier = have.identity().key();
        let mut change = WorkspaceChange::update(
            ChangeType::Capability,
            identifier,
            ChangeValue::Capability(have.clone()),
            ChangeValue::Capability(want.clone()),
        );
        change.action = match (have.needs_destroyed, want.needs_destroyed) {
            (false, true) => ChangeAction::Delete,
            (true, false) => ChangeAction::Add,
            _ if have != want => ChangeAction::Update,
            _ => continue,
        };
        changes.insert(change);
    }

    for (have, _) in current.iter().zip(&matched).filter(|(_, m)| !**m) {
        if !have.needs_destroyed {
            changes.insert(WorkspaceChange::delete(
                ChangeType::Capability,
                have.identity().key(),
                ChangeValue::Capability(have.clone()),
            ));
        }
    }
}

fn diff_extras(current: &WorkspaceConfig, desired: &WorkspaceConfig, changes: &mut IndexedChanges) {
    let have = current.extra.domain.clone().unwrap_or_default();
    let want = desired.extra.domain.clone().unwrap_or_default();
    if have != want {
        changes.insert(WorkspaceChange::update(
            ChangeType::Extra,
            DOMAIN_IDENTIFIER,
            ChangeValue::Domain(have),
            ChangeValue::Domain(want),
        ));
    }

    let have = current.extra.subdomain.clone().unwrap_or_default();
    let want = desired.extra.subdomain.clone().unwrap_or_default();
    if have != want {
        changes.insert(WorkspaceChange::update(
            ChangeType::Extra,
            SUBDOMAIN_IDENTIFIER,
            ChangeValue::Subdomain(have),
            ChangeValue::Subdomain(want),
        ));
    }
}
