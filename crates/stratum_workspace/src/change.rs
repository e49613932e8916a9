//! Typed workspace changes and the index that keys them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{
    CapabilityConfig, Connection, DomainExtra, EnvVariable, SubdomainReservation, Variable,
};

/// Category of a workspace change.
///
/// Declared in presentation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    ModuleVersion,
    Variable,
    EnvVariable,
    Connection,
    Capability,
    Extra,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::ModuleVersion => "module_version",
            ChangeType::Variable => "variable",
            ChangeType::EnvVariable => "env_variable",
            ChangeType::Connection => "connection",
            ChangeType::Capability => "capability",
            ChangeType::Extra => "extra",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Add,
    Update,
    Delete,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeAction::Add => "add",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// The value on one side of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ChangeValue {
    Module { source: String, version: String },
    Variable(Variable),
    EnvVariable(EnvVariable),
    Connection(Connection),
    Capability(CapabilityConfig),
    Domain(DomainExtra),
    Subdomain(SubdomainReservation),
}

/// One entry of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceChange {
    pub change_type: ChangeType,
    pub identifier: String,
    pub action: ChangeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<ChangeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired: Option<ChangeValue>,
}

impl WorkspaceChange {
    pub fn add(change_type: ChangeType, identifier: impl Into<String>, desired: ChangeValue) -> Self {
        Self {
            change_type,
            identifier: identifier.into(),
            action: ChangeAction::Add,
            current: None,
            desired: Some(desired),
        }
    }

    pub fn update(
        change_type: ChangeType,
        identifier: impl Into<String>,
        current: ChangeValue,
        desired: ChangeValue,
    ) -> Self {
        Self {
            change_type,
            identifier: identifier.into(),
            action: ChangeAction::Update,
            current: Some(current),
            desired: Some(desired),
        }
    }

    pub fn delete(change_type: ChangeType, identifier: impl Into<String>, current: ChangeValue) -> Self {
        Self {
            change_type,
            identifier: identifier.into(),
            action: ChangeAction::Delete,
            current: Some(current),
            desired: None,
        }
    }

    /// Index key, `"changeType/identifier"`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.change_type, self.identifier)
    }
}

impl fmt::Display for WorkspaceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.key())
    }
}

/// Changes keyed by `"changeType/identifier"`, at most one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexedChanges {
    changes: BTreeMap<String, WorkspaceChange>,
}

impl IndexedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a change, replacing any previous change with the same key.
    pub fn insert(&mut self, change: WorkspaceChange) -> Option<WorkspaceChange> {
        self.changes.insert(change.key(), change)
    }

    pub fn get(&self, key: &str) -> Option<&WorkspaceChange> {
        self.changes.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<WorkspaceChange> {
        self.changes.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.changes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkspaceChange> {
        self.changes.values()
    }

    /// Changes sorted by change type, then identifier.
    pub fn ordered(&self) -> Vec<&WorkspaceChange> {
        let mut ordered: Vec<&WorkspaceChange> = self.changes.values().collect();
        ordered.sort_by(|a, b| {
            a.change_type
                .cmp(&b.change_type)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        ordered
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, WorkspaceChange> {
        self.changes
    }
}

impl FromIterator<WorkspaceChange> for IndexedChanges {
    fn from_iter<I: IntoIterator<Item = WorkspaceChange>>(iter: I) -> Self {
        let mut changes = IndexedChanges::new();
        for change in iter {
            changes.insert(change);
        }
        changes
    }
}

impl IntoIterator for IndexedChanges {
    type Item = WorkspaceChange;
    type IntoIter = std::collections::btree_map::IntoValues<String, WorkspaceChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_values()
    }
}
