// SPDX-License-Identifier: MIT
//! The session controller: guards, resets, and persisted-state edits.
//!
//! A [`HudSession`] owns one [`TreeAssembler`] and one [`RebuildScheduler`]
//! and sits between the host's event hooks and the rebuild machinery.
//! Every trigger funnels through [`on_trigger`](HudSession::on_trigger),
//! which applies the controller guards in order:
//!
//! 1. disabled sessions skip everything;
//! 2. a single setting change only marks a rebuild as pending;
//! 3. closing the settings dialog rebuilds once, and only if something is
//!    pending;
//! 4. no selected character means nothing to build.
//!
//! Past the guards, the scheduler decides whether this request actually
//! builds or coalesces into a newer one.
//!
//! Edit operations ([`save_selection`](HudSession::save_selection),
//! [`save_layout_group`](HudSession::save_layout_group),
//! [`delete_layout_group`](HudSession::delete_layout_group)) write the
//! persisted snapshots directly and then request a rebuild, so the visible
//! tree always reflects what was just saved. Layout edits touch the
//! snapshot only; nest ids are recomputed from scratch when the next
//! rebuild expands the skeleton.

#![forbid(unsafe_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use hud_assembly::assembler::{AssembledTree, TreeAssembler};
use hud_assembly::generator::GroupSpec;
use hud_core::character::Character;
use hud_core::nest::{self, InvalidId};
use hud_core::node::NodeSource;
use hud_core::snapshot::{
    GroupSelection, LayoutGroup, SelectionEntry, resolve_layout, resolve_layout_mut,
};
use hud_core::store::StoreScope;
use tracing::{debug, warn};

use crate::scheduler::{RebuildOutcome, RebuildScheduler, SkipReason};
use crate::trigger::{Trigger, TriggerKind};

/// One user's HUD session over a game world.
pub struct HudSession {
    assembler: TreeAssembler,
    scheduler: RebuildScheduler,
    enabled: AtomicBool,
    pending_settings: AtomicBool,
    character: Mutex<Option<Character>>,
    current_tree: Mutex<Option<AssembledTree>>,
}

impl HudSession {
    /// Create an enabled session with no character selected.
    pub fn new(assembler: TreeAssembler, scheduler: RebuildScheduler) -> Self {
        Self {
            assembler,
            scheduler,
            enabled: AtomicBool::new(true),
            pending_settings: AtomicBool::new(false),
            character: Mutex::new(None),
            current_tree: Mutex::new(None),
        }
    }

    /// The assembler behind this session.
    pub fn assembler(&self) -> &TreeAssembler {
        &self.assembler
    }

    /// Enable or disable the session. Disabled sessions skip every trigger.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the session is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Switch the controlled character. `None` clears the selection and the
    /// cached tree; no rebuild is requested either way.
    pub fn set_character(&self, character: Option<Character>) {
        let mut slot = self.character.lock().unwrap_or_else(|e| e.into_inner());
        if character.is_none() {
            *self
                .current_tree
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = None;
        }
        *slot = character;
    }

    /// The tree from the most recent successful build, if any.
    pub fn current_tree(&self) -> Option<AssembledTree> {
        self.current_tree
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Route a trigger through the controller guards and the scheduler.
    pub fn on_trigger(&self, trigger: &Trigger) -> RebuildOutcome<AssembledTree> {
        if !self.is_enabled() {
            debug!(trigger = %trigger, "session disabled; trigger ignored");
            return RebuildOutcome::Skipped(SkipReason::Disabled);
        }

        match trigger.kind {
            TriggerKind::SettingChange => {
                self.pending_settings.store(true, Ordering::SeqCst);
                debug!(trigger = %trigger, "settings rebuild pending");
                return RebuildOutcome::Skipped(SkipReason::SettingsDeferred);
            }
            TriggerKind::SettingsClosed => {
                if !self.pending_settings.swap(false, Ordering::SeqCst) {
                    debug!("settings closed with nothing pending");
                    return RebuildOutcome::Skipped(SkipReason::SettingsNotPending);
                }
            }
            TriggerKind::GameEvent | TriggerKind::ControllerRequest => {}
        }

        let Some(character) = self
            .character
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        else {
            debug!(trigger = %trigger, "no character selected; trigger ignored");
            return RebuildOutcome::Skipped(SkipReason::NoCharacter);
        };

        let outcome = self
            .scheduler
            .request(trigger, || self.assembler.build(&character));
        if let RebuildOutcome::Built { value, .. } = &outcome {
            *self
                .current_tree
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(value.clone());
        }
        outcome
    }

    /// Request a rebuild on the session's own behalf.
    pub fn rebuild(&self) -> RebuildOutcome<AssembledTree> {
        self.on_trigger(&Trigger::controller("rebuild"))
    }

    // -----------------------------------------------------------------------
    // Resets
    // -----------------------------------------------------------------------

    /// Discard the current character's saved selection and rebuild. Order
    /// and visibility revert to generator defaults.
    pub fn reset_actor_selection(&self) -> RebuildOutcome<AssembledTree> {
        let actor_id = self
            .character
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|c| c.actor_id.clone());
        let Some(actor_id) = actor_id else {
            debug!("no character selected; nothing to reset");
            return RebuildOutcome::Skipped(SkipReason::NoCharacter);
        };
        if let Err(e) = self
            .assembler
            .store()
            .clear(StoreScope::ActorSelection, &actor_id)
        {
            warn!(actor = %actor_id, error = %e, "selection reset skipped");
        }
        self.on_trigger(&Trigger::controller("reset-selection"))
    }

    /// Discard the user's saved layout and rebuild. The next build re-seeds
    /// the layout from the game system's defaults.
    pub fn reset_user_layout(&self) -> RebuildOutcome<AssembledTree> {
        let user_id = self.assembler.user_id().to_owned();
        if let Err(e) = self
            .assembler
            .store()
            .clear(StoreScope::UserLayout, &user_id)
        {
            warn!(user = %user_id, error = %e, "layout reset skipped");
        }
        self.on_trigger(&Trigger::controller("reset-layout"))
    }

    // -----------------------------------------------------------------------
    // Persisted-state edits
    // -----------------------------------------------------------------------

    /// Save a user-reordered or re-filtered action list for one subcategory
    /// of the current tree, then rebuild.
    ///
    /// Returns `false` when no character is selected or `nest_id` does not
    /// name a group in the current tree; nothing is written in that case.
    pub fn save_selection(&self, nest_id: &str, entries: Vec<SelectionEntry>) -> bool {
        let actor_id = self
            .character
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|c| c.actor_id.clone());
        let Some(actor_id) = actor_id else {
            debug!(nest = %nest_id, "no character selected; selection edit dropped");
            return false;
        };

        // The group's source must come from the assembled tree so the saved
        // entry matches on the next lookup.
        let source = {
            let tree = self.current_tree.lock().unwrap_or_else(|e| e.into_inner());
            tree.as_ref()
                .and_then(|t| nest::resolve(&t.groups, nest_id))
                .map(|group| group.source)
        };
        let Some(source) = source else {
            warn!(nest = %nest_id, "selection edit targets a group not in the current tree");
            return false;
        };

        let mut selection = self.assembler.load_selection(&actor_id);
        selection.set_entry(
            nest_id,
            GroupSelection {
                source,
                actions: entries,
            },
        );
        self.assembler.store_selection(&actor_id, &selection);
        self.on_trigger(&Trigger::controller("save-selection"));
        true
    }

    /// Add a group to the persisted layout, then rebuild.
    ///
    /// `parent_nest_id` of `None` appends a root category. A
    /// [`NodeSource::SystemDerived`] spec goes through the derived-node
    /// registry; anything else is inserted as an ordinary child. Adding an
    /// id that already exists at the target is a no-op, and an unknown
    /// parent is logged and dropped rather than surfaced.
    pub fn save_layout_group(
        &self,
        parent_nest_id: Option<&str>,
        spec: GroupSpec,
    ) -> Result<(), InvalidId> {
        nest::validate_id(&spec.id)?;

        let mut layout = self.assembler.load_layout();
        let changed = match parent_nest_id {
            None => {
                if layout.groups.iter().any(|g| g.id == spec.id) {
                    false
                } else {
                    layout
                        .groups
                        .push(LayoutGroup::new(&spec.id, &spec.name, spec.source));
                    true
                }
            }
            Some(parent) if spec.source == NodeSource::SystemDerived => {
                layout.register_derived(parent, LayoutGroup::new(&spec.id, &spec.name, spec.source))
            }
            Some(parent) => match resolve_layout_mut(&mut layout.groups, parent) {
                Some(parent_group) => {
                    if parent_group.groups.iter().any(|g| g.id == spec.id) {
                        false
                    } else {
                        parent_group
                            .groups
                            .push(LayoutGroup::new(&spec.id, &spec.name, spec.source));
                        true
                    }
                }
                None => {
                    warn!(parent = %parent, group = %spec.id, "layout edit targets an unknown parent");
                    false
                }
            },
        };

        if changed {
            self.assembler.store_layout(&layout);
            self.on_trigger(&Trigger::controller("save-layout-group"));
        }
        Ok(())
    }

    /// Remove a group from the persisted layout, then rebuild.
    ///
    /// System-owned groups cannot be deleted. Returns `true` when the
    /// layout changed; `false` for unknown nest ids and refused deletes.
    pub fn delete_layout_group(&self, nest_id: &str) -> bool {
        let mut layout = self.assembler.load_layout();
        let found = resolve_layout(&layout.groups, nest_id).map(|g| g.source);

        let removed = match found {
            Some(NodeSource::System) => {
                warn!(nest = %nest_id, "system groups cannot be deleted");
                false
            }
            Some(_) => {
                let leaf = nest::leaf_id(nest_id).to_owned();
                match nest::parent_path(nest_id) {
                    None => {
                        layout.groups.retain(|g| g.id != leaf);
                        true
                    }
                    Some(parent) => match resolve_layout_mut(&mut layout.groups, parent) {
                        Some(parent_group) => {
                            parent_group.groups.retain(|g| g.id != leaf);
                            true
                        }
                        None => false,
                    },
                }
            }
            // Not in the layout proper; it may live in the derived registry.
            None => match nest::parent_path(nest_id) {
                Some(parent) => layout.unregister_derived(parent, nest::leaf_id(nest_id)),
                None => false,
            },
        };

        if removed {
            self.assembler.store_layout(&layout);
            self.on_trigger(&Trigger::controller("delete-layout-group"));
        } else {
            debug!(nest = %nest_id, "layout delete changed nothing");
        }
        removed
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hud_assembly::generator::{GeneratorError, GeneratorOutput, SystemActionProvider};
    use hud_core::snapshot::LayoutSnapshot;
    use hud_core::store::MemoryStore;

    struct EmptyProvider;

    impl SystemActionProvider for EmptyProvider {
        fn default_layout(&self) -> LayoutSnapshot {
            LayoutSnapshot::new(vec![LayoutGroup::new(
                "melee",
                "Melee",
                NodeSource::System,
            )])
        }

        fn populate(
            &self,
            _character: &Character,
            _group_ids: &[String],
            _out: &mut GeneratorOutput,
        ) -> Result<(), GeneratorError> {
            Ok(())
        }
    }

    fn session() -> HudSession {
        let assembler = TreeAssembler::new(
            Arc::new(MemoryStore::new()),
            Arc::new(EmptyProvider),
            "user-1",
        );
        HudSession::new(assembler, RebuildScheduler::default())
    }

    #[test]
    fn disabled_session_skips_triggers() {
        let session = session();
        session.set_enabled(false);
        assert_eq!(
            session.on_trigger(&Trigger::game_event("updateItem")),
            RebuildOutcome::Skipped(SkipReason::Disabled)
        );
    }

    #[test]
    fn no_character_skips_triggers() {
        let session = session();
        assert_eq!(
            session.on_trigger(&Trigger::game_event("updateItem")),
            RebuildOutcome::Skipped(SkipReason::NoCharacter)
        );
    }

    #[test]
    fn setting_changes_defer_until_dialog_closes() {
        let session = session();
        session.set_character(Some(Character::new("actor-1", "Vex")));

        assert_eq!(
            session.on_trigger(&Trigger::setting_change("grid")),
            RebuildOutcome::Skipped(SkipReason::SettingsDeferred)
        );
        assert!(matches!(
            session.on_trigger(&Trigger::settings_closed()),
            RebuildOutcome::Built { .. }
        ));
        // A second close has nothing pending.
        assert_eq!(
            session.on_trigger(&Trigger::settings_closed()),
            RebuildOutcome::Skipped(SkipReason::SettingsNotPending)
        );
    }

    #[test]
    fn clearing_the_character_drops_the_cached_tree() {
        let session = session();
        session.set_character(Some(Character::new("actor-1", "Vex")));
        assert!(session.rebuild().built().is_some());
        assert!(session.current_tree().is_some());

        session.set_character(None);
        assert!(session.current_tree().is_none());
    }
}
