//! Merging of independently computed change sets.

use tracing::debug;

use crate::change::{ChangeAction, IndexedChanges, WorkspaceChange};

/// Merge `latest` over `mine`.
///
/// Keys on only one side pass through. For keys on both sides the result
/// starts from `mine`'s current value and ends at `latest`'s desired value;
/// when those cancel out the key is dropped.
pub fn merge(mine: IndexedChanges, latest: IndexedChanges) -> IndexedChanges {
    let mut merged = mine.into_map();

    for (key, theirs) in latest.into_map() {
        match merged.remove(&key) {
            None => {
                merged.insert(key, theirs);
            }
            Some(ours) => match merge_change(ours, theirs) {
                Some(change) => {
                    merged.insert(key, change);
                }
                None => debug!("Dropped cancelled change {}", key),
            },
        }
    }

    merged.into_values().collect()
}

fn merge_change(mine: WorkspaceChange, latest: WorkspaceChange) -> Option<WorkspaceChange> {
    let existed_before = mine.action != ChangeAction::Add;
    let exists_after = latest.action != ChangeAction::Delete;

    let action = match (existed_before, exists_after) {
        (false, false) => return None,
        (false, true) => ChangeAction::Add,
        (true, false) => ChangeAction::Delete,
        (true, true) => {
            if mine.current == latest.desired {
                return None;
            }
            ChangeAction::Update
        }
    };

    Some(WorkspaceChange {
        change_type: latest.change_type,
        identifier: latest.identifier,
        action,
        current: mine.current,
        desired: latest.desired,
    })
}
