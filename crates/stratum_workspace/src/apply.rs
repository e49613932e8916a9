//! Replaying changes onto a workspace configuration.

use tracing::debug;

use crate::change::{ChangeAction, ChangeType, ChangeValue, WorkspaceChange};
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::models::{CapabilityConfig, WorkspaceConfig};

/// Apply changes to a workspace in iteration order.
///
/// Changes already applied before a failing change stay applied.
pub fn apply_changes<'a>(
    workspace: &mut WorkspaceConfig,
    changes: impl IntoIterator<Item = &'a WorkspaceChange>,
) -> WorkspaceResult<()> {
    for change in changes {
        apply_change(workspace, change)?;
        debug!("Applied {}", change);
    }
    Ok(())
}

fn invalid(change: &WorkspaceChange, reason: &str) -> WorkspaceError {
    WorkspaceError::InvalidChange {
        key: change.key(),
        reason: reason.to_string(),
    }
}

fn apply_change(workspace: &mut WorkspaceConfig, change: &WorkspaceChange) -> WorkspaceResult<()> {
    let name = change.identifier.clone();
    let desired = match change.action {
        ChangeAction::Delete => None,
        ChangeAction::Add | ChangeAction::Update => Some(
            change
                .desired
                .as_ref()
                .ok_or_else(|| invalid(change, "missing desired value"))?,
        ),
    };

    match (change.change_type, desired) {
        (ChangeType::ModuleVersion, Some(ChangeValue::Module { source, version })) => {
            workspace.source = source.clone();
            workspace.source_version = version.clone();
        }
        (ChangeType::Variable, Some(ChangeValue::Variable(v))) => {
            workspace.variables.insert(name, v.clone());
        }
        (ChangeType::Variable, None) => {
            workspace.variables.remove(&name);
        }
        (ChangeType::EnvVariable, Some(ChangeValue::EnvVariable(v))) => {
            workspace.env_variables.insert(name, v.clone());
        }
        (ChangeType::EnvVariable, None) => {
            workspace.env_variables.remove(&name);
        }
        (ChangeType::Connection, Some(ChangeValue::Connection(c))) => {
            workspace.connections.insert(name, c.clone());
        }
        (ChangeType::Connection, None) => {
            workspace.connections.remove(&name);
        }
        (ChangeType::Capability, _) => apply_capability(workspace, change)?,
        (ChangeType::Extra, Some(ChangeValue::Domain(d))) => {
            workspace.extra.domain = (*d != Default::default()).then(|| d.clone());
        }
        (ChangeType::Extra, Some(ChangeValue::Subdomain(s))) => {
            workspace.extra.subdomain = (*s != Default::default()).then(|| s.clone());
        }
        _ => return Err(invalid(change, "value does not match change type")),
    }
    Ok(())
}

fn capability_value<'c>(
    change: &'c WorkspaceChange,
    value: &'c Option<ChangeValue>,
) -> WorkspaceResult<Option<&'c CapabilityConfig>> {
    match value {
        None => Ok(None),
        Some(ChangeValue::Capability(c)) => Ok(Some(c)),
        Some(_) => Err(invalid(change, "value does not match change type")),
    }
}

fn apply_capability(workspace: &mut WorkspaceConfig, change: &WorkspaceChange) -> WorkspaceResult<()> {
    let current = capability_value(change, &change.current)?;
    let desired = capability_value(change, &change.desired)?;
    let position = current.and_then(|c| {
        let identity = c.identity();
        workspace
            .capabilities
            .iter()
            .position(|existing| identity.matches(existing))
    });

    match (change.action, position, desired) {
        (ChangeAction::Add, Some(index), Some(want)) => {
            workspace.capabilities[index] = want.clone();
        }
        (ChangeAction::Add, None, Some(want)) => {
            workspace.capabilities.push(want.clone());
        }
        (ChangeAction::Update, Some(index), Some(want))
        | (ChangeAction::Delete, Some(index), Some(want)) => {
            workspace.capabilities[index] = want.clone();
        }
        (ChangeAction::Delete, Some(index), None) => {
            workspace.capabilities.remove(index);
        }
        (_, None, _) => {
            return Err(WorkspaceError::CapabilityNotFound(change.identifier.clone()));
        }
        (_, Some(_), None) => return Err(invalid(change, "missing desired value")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use crate::models::{DomainExtra, EnvVariable, Variable};
    use stratum_config::{ConnectionTarget, Value};

    #[test]
    fn test_apply_update_leaves_other_variables() {
        let mut current = WorkspaceConfig::new("acme/fargate-service", "0.1.0");
        current
            .variables
            .insert("cpu".into(), Variable::with_value(Value::from(256i64)));
        current
            .variables
            .insert("memory".into(), Variable::with_value(Value::from(512i64)));
        let mut desired = current.clone();
        desired
            .variables
            .insert("cpu".into(), Variable::with_value(Value::from(512i64)));

        let changes = diff(&current, &desired);
        apply_changes(&mut current, changes.iter()).unwrap();
        assert_eq!(current.variables["cpu"].effective(), Some(&Value::from(512i64)));
        assert_eq!(current.variables["memory"].effective(), Some(&Value::from(512i64)));
    }

    #[test]
    fn test_apply_env_and_extras() {
        let mut current = WorkspaceConfig::new("acme/fargate-service", "0.1.0");
        current
            .env_variables
            .insert("OLD".into(), EnvVariable::new("1", false));
        current.extra.domain = Some(DomainExtra {
            dns_name: "acme.dev".into(),
        });

        let mut desired = WorkspaceConfig::new("acme/fargate-service", "0.1.0");
        desired
            .env_variables
            .insert("NEW".into(), EnvVariable::new("2", true));

        let changes = diff(&current, &desired);
        apply_changes(&mut current, changes.iter()).unwrap();
        assert_eq!(current, desired);
        assert_eq!(current.extra.domain, None);
    }

    #[test]
    fn test_apply_capability_delete_keeps_flagged_entry() {
        let mut cap = CapabilityConfig::new("acme/aws-load-balancer", "0.1.0")
            .with_connection("subdomain", ConnectionTarget::block("docs").with_ids(1, 2, 3));
        cap.persist(7);
        let mut current = WorkspaceConfig::new("acme/fargate-service", "0.1.0");
        current.capabilities.push(cap.clone());

        let mut desired = current.clone();
        desired.capabilities[0].needs_destroyed = true;

        let changes = diff(&current, &desired);
        apply_changes(&mut current, changes.iter()).unwrap();
        assert_eq!(current, desired);
    }

    #[test]
    fn test_apply_rejects_mismatched_value() {
        let mut ws = WorkspaceConfig::default();
        let change = WorkspaceChange::add(
            ChangeType::Variable,
            "cpu",
            ChangeValue::EnvVariable(EnvVariable::new("1", false)),
        );
        let err = apply_changes(&mut ws, [&change]).unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidChange { .. }));
    }

    #[test]
    fn test_apply_missing_capability() {
        let mut ws = WorkspaceConfig::default();
        let cap = CapabilityConfig::new("acme/aws-load-balancer", "0.1.0");
        let change = WorkspaceChange::delete(
            ChangeType::Capability,
            "acme/aws-load-balancer[]",
            ChangeValue::Capability(cap),
        );
        let err = apply_changes(&mut ws, [&change]).unwrap_err();
        assert!(matches!(err, WorkspaceError::CapabilityNotFound(_)));
    }
}
