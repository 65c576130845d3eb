// SPDX-License-Identifier: MIT
//! Reconciliation of freshly generated actions against a saved selection.
//!
//! This is the merge rule the whole HUD hinges on. Saved entries come
//! first, in saved order, with their saved `selected` flag; saved entries
//! whose encoded value no longer appears in the fresh list are stale and
//! skipped; fresh actions the save has never seen are appended afterward,
//! in generator order, selected. The result replaces the group's actions
//! wholesale — a full replace-by-merge, not an incremental patch.
//!
//! Everything here is pure, which is what makes the assembler's merge
//! deterministic regardless of which generator finished first.

#![forbid(unsafe_code)]

use ahash::AHashMap;
use hud_core::node::Action;
use hud_core::snapshot::{GroupSelection, SelectionEntry};

use crate::generator::ActionRecord;

/// Merge fresh generator output with the saved order/visibility for one
/// group.
///
/// With no saved entry the fallback is "all selected, generator order".
pub fn reconcile(saved: Option<&GroupSelection>, fresh: &[ActionRecord]) -> Vec<Action> {
    let Some(saved) = saved else {
        return fresh.iter().map(|record| to_action(record, true)).collect();
    };

    // Index fresh records by identity; `consumed` tracks which have been
    // emitted through the saved order so the append pass skips them.
    let mut by_value: AHashMap<_, usize> = AHashMap::with_capacity(fresh.len());
    for (idx, record) in fresh.iter().enumerate() {
        // First occurrence wins when a generator emits duplicate values.
        by_value.entry(&record.encoded_value).or_insert(idx);
    }
    let mut consumed = vec![false; fresh.len()];

    let mut actions = Vec::with_capacity(fresh.len());
    for entry in &saved.actions {
        let Some(&idx) = by_value.get(&entry.encoded_value) else {
            // Stale: the capability no longer exists.
            continue;
        };
        if consumed[idx] {
            continue;
        }
        consumed[idx] = true;
        actions.push(to_action(&fresh[idx], entry.selected));
    }

    for (idx, record) in fresh.iter().enumerate() {
        if !consumed[idx] && by_value.get(&record.encoded_value) == Some(&idx) {
            actions.push(to_action(record, true));
        }
    }

    actions
}

/// Resurrect actions directly from a saved selection, used when a group's
/// generator failed and no fresh list exists.
pub fn materialize(saved: Option<&GroupSelection>) -> Vec<Action> {
    let Some(saved) = saved else {
        return Vec::new();
    };
    saved
        .actions
        .iter()
        .map(|entry| {
            let mut action = Action::new(
                entry.encoded_value.as_str(),
                &entry.name,
                entry.encoded_value.clone(),
            );
            action.selected = entry.selected;
            action
        })
        .collect()
}

/// Snapshot entries for an assembled action list, in presentation order.
pub fn selection_from_actions(actions: &[Action]) -> Vec<SelectionEntry> {
    actions
        .iter()
        .map(|action| {
            SelectionEntry::new(action.encoded_value.clone(), &action.name)
                .with_selected(action.selected)
        })
        .collect()
}

fn to_action(record: &ActionRecord, selected: bool) -> Action {
    let mut action = Action::new(&record.id, &record.name, record.encoded_value.clone());
    action.selected = selected;
    action.icon = record.icon.clone();
    action.info = record.info.clone();
    action
}

// =============================================================================
// Tests
// =============================================================================
