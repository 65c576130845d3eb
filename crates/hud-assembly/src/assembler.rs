// SPDX-License-Identifier: MIT
//! The tree assembler: skeleton, fan-out, merge, prune, truncate, persist.
//!
//! One call to [`TreeAssembler::build`] produces a complete, consistent
//! tree for a character from three sources of truth: the user's layout
//! snapshot (shape), the actor's selection snapshot (order/visibility),
//! and whatever the content generators report right now.
//!
//! `build` never fails. Store trouble degrades to defaults with a warning,
//! and a failing generator only affects the groups it owns — the rest of
//! the tree assembles normally. The caller is expected to hold rebuilds
//! mutually exclusive (see the scheduler in `hud-runtime`); the store is
//! not assumed concurrency-safe on its own.

#![forbid(unsafe_code)]

use std::sync::Arc;

use ahash::AHashSet;
use hud_core::character::Character;
use hud_core::node::{Group, NodeSource, apply_character_limits};
use hud_core::snapshot::{GroupSelection, LayoutGroup, LayoutSnapshot, SelectionSnapshot};
use hud_core::store::{SnapshotStore, StoreScope};
use tracing::{debug, warn};

use crate::generator::{ActionGenerator, GeneratorOutput, SystemActionProvider};
use crate::merge;

/// A finished assembly: a fresh tree plus the names of generators that
/// failed during the fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTree {
    /// Root categories, ready for presentation.
    pub groups: Vec<Group>,
    /// Generators whose populate call failed this cycle.
    pub failed_generators: Vec<String>,
}

/// Builds HUD trees for one user against one store and one game-system
/// provider.
pub struct TreeAssembler {
    store: Arc<dyn SnapshotStore>,
    provider: Arc<dyn SystemActionProvider>,
    generators: Vec<Arc<dyn ActionGenerator>>,
    user_id: String,
    character_limit: Option<usize>,
}

impl TreeAssembler {
    /// Create an assembler with no built-in generators.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        provider: Arc<dyn SystemActionProvider>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            generators: Vec::new(),
            user_id: user_id.into(),
            character_limit: None,
        }
    }

    /// Register a built-in generator (utility, compendium, macro, ...).
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn ActionGenerator>) -> Self {
        self.generators.push(generator);
        self
    }

    /// Set the category-level default character limit for display names.
    #[must_use]
    pub fn with_character_limit(mut self, limit: usize) -> Self {
        self.character_limit = Some(limit);
        self
    }

    /// The user whose layout this assembler reads and writes.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The snapshot store behind this assembler.
    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Assemble a fresh tree for `character`.
    pub fn build(&self, character: &Character) -> AssembledTree {
        // 1. Skeleton from the layout snapshot.
        let mut layout = self.load_layout();
        let mut roots = layout.skeleton();
        let mut layout_dirty = false;

        // 2. Saved selection for this actor.
        let (selection, selection_writable) = self.load_selection_checked(&character.actor_id);

        // 3. Generator fan-out. Failures are isolated per generator and
        //    scoped to the slots that generator owns.
        let mut out = GeneratorOutput::new();
        let mut failed_generators = Vec::new();
        let mut failed_targets: AHashSet<(String, NodeSource)> = AHashSet::new();

        let system_ids = collect_system_subcategory_ids(&roots);
        if let Err(e) = self.provider.populate(character, &system_ids, &mut out) {
            warn!(error = %e, "system provider failed; keeping previous snapshot actions");
            failed_generators.push("system".to_owned());
            failed_targets.extend(
                system_ids
                    .iter()
                    .map(|id| (id.clone(), NodeSource::System)),
            );
        }
        for generator in &self.generators {
            if let Err(e) = generator.populate(character, &mut out) {
                warn!(
                    generator = generator.name(),
                    error = %e,
                    "generator failed; keeping previous snapshot actions"
                );
                failed_generators.push(generator.name().to_owned());
                failed_targets.extend(
                    generator
                        .targets(character)
                        .into_iter()
                        .map(|t| (t.id, t.source)),
                );
            }
        }

        // 4. Insert newly reported derived groups and remember everything
        //    repopulated this cycle; unreported derived groups get pruned.
        //    Keyed by (parent nest id, child id): the same derived id may
        //    live under several parents, each with its own lifecycle.
        let mut repopulated: AHashSet<(String, String)> = AHashSet::new();
        for (parent_id, spec) in out.derived().to_vec() {
            let Some(parent) = find_group_mut_by_id(&mut roots, &parent_id) else {
                warn!(parent = %parent_id, derived = %spec.id, "derived group parent not in skeleton");
                continue;
            };
            let parent_nest = parent.nest_id.clone();
            repopulated.insert((parent_nest.clone(), spec.id.clone()));
            if !parent.groups.iter().any(|g| g.id == spec.id) {
                parent.push_group(Group::new(&spec.id, &spec.name, spec.source));
            }
            let registered = layout.register_derived(
                &parent_nest,
                LayoutGroup::new(&spec.id, &spec.name, spec.source),
            );
            if registered {
                debug!(parent = %parent_nest, derived = %spec.id, "derived group registered");
                layout_dirty = true;
            }
        }

        // 5. Merge generated slots against the saved selection.
        for root in &mut roots {
            merge_group(root, &selection, &mut out, &failed_targets);
        }
        for (id, source) in out.unclaimed() {
            debug!(id = %id, source = ?source, "generated slot has no matching group");
        }

        // 6. Prune derived groups nothing repopulated.
        for root in &mut roots {
            prune_derived(root, &repopulated, &mut layout, &mut layout_dirty);
        }
        if layout_dirty {
            self.store_layout(&layout);
        }

        // 7. Presentation constraints on the display copies only.
        apply_character_limits(&mut roots, self.character_limit);

        // 8. Persist the new authoritative selection. A degraded load means
        //    the stored blob stays in place for recovery, as with layouts.
        if selection_writable {
            let mut new_selection = SelectionSnapshot::new();
            collect_selection(&roots, &mut new_selection);
            self.store_selection(&character.actor_id, &new_selection);
        } else {
            warn!(actor = %character.actor_id, "selection persist skipped after degraded load");
        }

        AssembledTree {
            groups: roots,
            failed_generators,
        }
    }

    /// Load the user's layout, falling back to the provider's default.
    ///
    /// A missing snapshot is first use: the default is persisted. Store or
    /// decode trouble degrades to the default without overwriting whatever
    /// is persisted.
    pub fn load_layout(&self) -> LayoutSnapshot {
        match self.store.get(StoreScope::UserLayout, &self.user_id) {
            Ok(Some(blob)) => match LayoutSnapshot::decode(&blob) {
                Ok(layout) => layout,
                Err(e) => {
                    warn!(user = %self.user_id, error = %e, "layout snapshot unreadable; using defaults");
                    self.provider.default_layout()
                }
            },
            Ok(None) => {
                let layout = self.provider.default_layout();
                debug!(user = %self.user_id, "no layout snapshot; persisting defaults");
                self.store_layout(&layout);
                layout
            }
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "layout store unavailable; using defaults");
                self.provider.default_layout()
            }
        }
    }

    /// Persist the user's layout. Store trouble is logged, not surfaced.
    pub fn store_layout(&self, layout: &LayoutSnapshot) {
        let blob = match layout.encode() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "layout snapshot not serializable");
                return;
            }
        };
        if let Err(e) = self.store.set(StoreScope::UserLayout, &self.user_id, blob) {
            warn!(user = %self.user_id, error = %e, "layout write skipped");
        }
    }

    /// Load an actor's selection; absent or unreadable means empty.
    pub fn load_selection(&self, actor_id: &str) -> SelectionSnapshot {
        self.load_selection_checked(actor_id).0
    }

    /// As [`load_selection`](Self::load_selection), plus whether the stored
    /// blob may safely be overwritten. An absent snapshot may be; a read
    /// error or corrupt blob degrades to empty but must stay on disk.
    fn load_selection_checked(&self, actor_id: &str) -> (SelectionSnapshot, bool) {
        match self.store.get(StoreScope::ActorSelection, actor_id) {
            Ok(Some(blob)) => match SelectionSnapshot::decode(&blob) {
                Ok(selection) => (selection, true),
                Err(e) => {
                    warn!(actor = %actor_id, error = %e, "selection snapshot unreadable; starting empty");
                    (SelectionSnapshot::new(), false)
                }
            },
            Ok(None) => (SelectionSnapshot::new(), true),
            Err(e) => {
                warn!(actor = %actor_id, error = %e, "selection store unavailable; starting empty");
                (SelectionSnapshot::new(), false)
            }
        }
    }

    /// Persist an actor's selection. Store trouble is logged, not surfaced.
    pub fn store_selection(&self, actor_id: &str, selection: &SelectionSnapshot) {
        let blob = match selection.encode() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(actor = %actor_id, error = %e, "selection snapshot not serializable");
                return;
            }
        };
        if let Err(e) = self.store.set(StoreScope::ActorSelection, actor_id, blob) {
            warn!(actor = %actor_id, error = %e, "selection write skipped");
        }
    }
}

/// Ids of every non-root `system`-typed group, skeleton order.
fn collect_system_subcategory_ids(roots: &[Group]) -> Vec<String> {
    fn walk(group: &Group, out: &mut Vec<String>) {
        for child in &group.groups {
            if child.source == NodeSource::System {
                out.push(child.id.clone());
            }
            walk(child, out);
        }
    }
    let mut ids = Vec::new();
    for root in roots {
        walk(root, &mut ids);
    }
    ids
}

/// Depth-first search for a group by id.
fn find_group_mut_by_id<'a>(roots: &'a mut [Group], id: &str) -> Option<&'a mut Group> {
    for root in roots {
        if root.id == id {
            return Some(root);
        }
        if let Some(found) = find_group_mut_by_id(&mut root.groups, id) {
            return Some(found);
        }
    }
    None
}

fn merge_group(
    group: &mut Group,
    selection: &SelectionSnapshot,
    out: &mut GeneratorOutput,
    failed_targets: &AHashSet<(String, NodeSource)>,
) {
    let saved = selection.entry(&group.nest_id, group.source);

    if group.source == NodeSource::Custom {
        // Custom children are never generator-supplied; they persist
        // verbatim from the snapshot.
        group.actions = merge::materialize(saved);
    } else if failed_targets.contains(&(group.id.clone(), group.source)) {
        group.generator_failed = true;
        group.actions = merge::materialize(saved);
    } else if let Some(records) = out.take_slot(&group.id, group.source) {
        group.actions = merge::reconcile(saved, &records);
    } else {
        // Generator-owned actions are fully replaced each cycle; nothing
        // generated means nothing shown.
        group.actions.clear();
    }

    for child in &mut group.groups {
        merge_group(child, selection, out, failed_targets);
    }
}

fn prune_derived(
    group: &mut Group,
    repopulated: &AHashSet<(String, String)>,
    layout: &mut LayoutSnapshot,
    layout_dirty: &mut bool,
) {
    let parent_nest = group.nest_id.clone();
    group.groups.retain(|child| {
        if child.source == NodeSource::SystemDerived
            && !repopulated.contains(&(parent_nest.clone(), child.id.clone()))
        {
            debug!(parent = %parent_nest, derived = %child.id, "pruning stale derived group");
            if layout.unregister_derived(&parent_nest, &child.id) {
                *layout_dirty = true;
            }
            false
        } else {
            true
        }
    });
    for child in &mut group.groups {
        prune_derived(child, repopulated, layout, layout_dirty);
    }
}

fn collect_selection(roots: &[Group], selection: &mut SelectionSnapshot) {
    for group in roots {
        if !group.actions.is_empty() {
            selection.set_entry(
                group.nest_id.clone(),
                GroupSelection {
                    source: group.source,
                    actions: merge::selection_from_actions(&group.actions),
                },
            );
        }
        collect_selection(&group.groups, selection);
    }
}
