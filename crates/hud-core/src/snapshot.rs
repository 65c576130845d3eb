// SPDX-License-Identifier: MIT
//! Persisted snapshots: the user's layout and the actor's selection.
//!
//! Two snapshots feed every rebuild:
//!
//! - **Layout** (user scope): the skeleton shape — categories and
//!   subcategories only, no actions. Created once from the game system's
//!   defaults, thereafter fully user-owned. Carries the derived-node
//!   registry so runtime-created groups stay addressable by edit
//!   operations.
//! - **Selection** (actor scope): per subcategory, the saved order and
//!   `selected` flag of its actions, keyed by encoded value. Read and
//!   rewritten on every rebuild.
//!
//! # File format
//!
//! Both snapshots serialize as JSON with an explicit `version` field.
//! A missing blob means "no snapshot" (fall back to defaults); a version
//! mismatch or parse failure is an error the caller downgrades to
//! defaults with a warning.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoded::EncodedValue;
use crate::nest;
use crate::node::{AdvancedOptions, Group, NodeSource};

/// Current layout snapshot format version.
pub const LAYOUT_FORMAT_VERSION: u64 = 1;
/// Current selection snapshot format version.
pub const SELECTION_FORMAT_VERSION: u64 = 1;

/// A snapshot blob could not be decoded or encoded.
#[derive(Debug)]
pub enum SnapshotError {
    /// JSON (de)serialization failure.
    Json(serde_json::Error),
    /// The blob was written by an unsupported format version.
    UnsupportedVersion {
        /// Version found in the blob.
        found: u64,
        /// Version this build expects.
        expected: u64,
    },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "snapshot JSON error: {e}"),
            Self::UnsupportedVersion { found, expected } => {
                write!(f, "unsupported snapshot version: {found} (expected {expected})")
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::UnsupportedVersion { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// A category or subcategory in the persisted layout. No actions here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutGroup {
    /// Short identifier, unique among siblings.
    pub id: String,
    /// Presentation label.
    pub name: String,
    /// Ownership class.
    pub source: NodeSource,
    /// Per-group presentation overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedOptions>,
    /// Child subcategories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<LayoutGroup>,
}

impl LayoutGroup {
    /// Create a layout group with no children.
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: NodeSource) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source,
            advanced: None,
            groups: Vec::new(),
        }
    }

    /// Builder-style child append.
    #[must_use]
    pub fn with_group(mut self, child: LayoutGroup) -> Self {
        self.groups.push(child);
        self
    }

    /// Set presentation overrides.
    #[must_use]
    pub fn with_advanced(mut self, advanced: AdvancedOptions) -> Self {
        self.advanced = Some(advanced);
        self
    }

    fn to_group(&self, parent_nest_id: Option<&str>) -> Group {
        let mut group = Group::new(&self.id, &self.name, self.source);
        group.advanced = self.advanced;
        group.nest_id = match parent_nest_id {
            Some(parent) => format!("{parent}{sep}{id}", sep = nest::SEPARATOR, id = self.id),
            None => self.id.clone(),
        };
        for child in &self.groups {
            group.groups.push(child.to_group(Some(&group.nest_id)));
        }
        group
    }
}

/// Walk a layout group tree by nest id, mirroring [`nest::resolve`].
pub fn resolve_layout<'a>(roots: &'a [LayoutGroup], nest_id: &str) -> Option<&'a LayoutGroup> {
    let mut parts = nest::segments(nest_id);
    let first = parts.next()?;
    let mut current = roots.iter().find(|g| g.id == first)?;
    for part in parts {
        current = current.groups.iter().find(|g| g.id == part)?;
    }
    Some(current)
}

/// Mutable counterpart of [`resolve_layout`].
pub fn resolve_layout_mut<'a>(
    roots: &'a mut [LayoutGroup],
    nest_id: &str,
) -> Option<&'a mut LayoutGroup> {
    let mut parts = nest::segments(nest_id);
    let first = parts.next()?;
    let mut current = roots.iter_mut().find(|g| g.id == first)?;
    for part in parts {
        current = current.groups.iter_mut().find(|g| g.id == part)?;
    }
    Some(current)
}

/// The user-owned persisted layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    /// Format version, checked on decode.
    pub version: u64,
    /// Root categories in presentation order.
    pub groups: Vec<LayoutGroup>,
    /// Derived-node registry: runtime-created groups keyed by the nest id of
    /// the parent they were inserted under. `BTreeMap` keeps serialization
    /// deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub derived: BTreeMap<String, Vec<LayoutGroup>>,
}

impl LayoutSnapshot {
    /// Create a layout snapshot at the current format version.
    pub fn new(groups: Vec<LayoutGroup>) -> Self {
        Self {
            version: LAYOUT_FORMAT_VERSION,
            groups,
            derived: BTreeMap::new(),
        }
    }

    /// Deep-copy the layout (including registered derived groups) into an
    /// in-memory tree with empty action lists.
    ///
    /// Derived entries whose parent no longer exists in the layout are
    /// skipped; the next rebuild's prune pass drops them from the registry.
    pub fn skeleton(&self) -> Vec<Group> {
        let mut roots: Vec<Group> = self.groups.iter().map(|g| g.to_group(None)).collect();
        for (parent_nest_id, children) in &self.derived {
            let Some(parent) = nest::resolve_mut(&mut roots, parent_nest_id) else {
                continue;
            };
            let parent_nest = parent.nest_id.clone();
            for child in children {
                if parent.groups.iter().any(|g| g.id == child.id) {
                    continue;
                }
                parent.groups.push(child.to_group(Some(&parent_nest)));
            }
        }
        roots
    }

    /// Record a derived group under `parent_nest_id`.
    ///
    /// Returns `true` if the registry changed.
    pub fn register_derived(&mut self, parent_nest_id: &str, group: LayoutGroup) -> bool {
        let children = self.derived.entry(parent_nest_id.to_owned()).or_default();
        if children.iter().any(|g| g.id == group.id) {
            return false;
        }
        children.push(group);
        true
    }

    /// Drop a derived group from the registry.
    ///
    /// Returns `true` if the registry changed.
    pub fn unregister_derived(&mut self, parent_nest_id: &str, id: &str) -> bool {
        let Some(children) = self.derived.get_mut(parent_nest_id) else {
            return false;
        };
        let before = children.len();
        children.retain(|g| g.id != id);
        let changed = children.len() != before;
        if children.is_empty() {
            self.derived.remove(parent_nest_id);
        }
        changed
    }

    /// Serialize to a store blob.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(SnapshotError::Json)
    }

    /// Deserialize from a store blob, checking the format version.
    pub fn decode(blob: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(blob).map_err(SnapshotError::Json)?;
        if snapshot.version != LAYOUT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: LAYOUT_FORMAT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// One saved action: identity, label, and visibility.
///
/// The label is retained so that a group whose generator failed can
/// resurface its previous actions with readable names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    /// Stable action identity across rebuilds.
    pub encoded_value: EncodedValue,
    /// Label as last assembled.
    pub name: String,
    /// Whether the user keeps the action visible. Defaults to `true` when
    /// unspecified in the blob.
    #[serde(default = "default_selected")]
    pub selected: bool,
}

impl SelectionEntry {
    /// Create a selected entry.
    pub fn new(encoded_value: EncodedValue, name: impl Into<String>) -> Self {
        Self {
            encoded_value,
            name: name.into(),
            selected: true,
        }
    }

    /// Set the selected flag.
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

fn default_selected() -> bool {
    true
}

/// Saved order and visibility of one subcategory's actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSelection {
    /// Ownership class of the group the entry belongs to; a lookup only
    /// matches when the source agrees, so a custom group and a system group
    /// sharing a nest id never read each other's data.
    pub source: NodeSource,
    /// Saved actions; vector order is the saved order.
    pub actions: Vec<SelectionEntry>,
}

/// The actor-owned persisted selection, keyed by subcategory nest id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// Format version, checked on decode.
    pub version: u64,
    /// Per-subcategory saved state. `BTreeMap` keeps serialization
    /// deterministic.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, GroupSelection>,
}

impl Default for SelectionSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionSnapshot {
    /// Create an empty selection snapshot at the current format version.
    pub fn new() -> Self {
        Self {
            version: SELECTION_FORMAT_VERSION,
            groups: BTreeMap::new(),
        }
    }

    /// Look up the saved entry for `(nest_id, source)`.
    ///
    /// `None` when the nest id is unknown or the saved source disagrees.
    pub fn entry(&self, nest_id: &str, source: NodeSource) -> Option<&GroupSelection> {
        self.groups
            .get(nest_id)
            .filter(|selection| selection.source == source)
    }

    /// Insert or replace the entry for `nest_id`.
    pub fn set_entry(&mut self, nest_id: impl Into<String>, selection: GroupSelection) {
        self.groups.insert(nest_id.into(), selection);
    }

    /// Serialize to a store blob.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(SnapshotError::Json)
    }

    /// Deserialize from a store blob, checking the format version.
    pub fn decode(blob: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(blob).map_err(SnapshotError::Json)?;
        if snapshot.version != SELECTION_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SELECTION_FORMAT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> LayoutSnapshot {
        LayoutSnapshot::new(vec![
            LayoutGroup::new("melee", "Melee", NodeSource::System)
                .with_group(LayoutGroup::new("weapons", "Weapons", NodeSource::System)),
            LayoutGroup::new("notes", "Notes", NodeSource::Custom),
        ])
    }

    #[test]
    fn skeleton_copies_shape_with_empty_actions() {
        let skeleton = layout().skeleton();
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton[0].nest_id, "melee");
        assert_eq!(skeleton[0].groups[0].nest_id, "melee_weapons");
        assert!(skeleton[0].groups[0].actions.is_empty());
        assert_eq!(skeleton[1].source, NodeSource::Custom);
    }

    #[test]
    fn skeleton_includes_registered_derived_groups() {
        let mut layout = layout();
        assert!(layout.register_derived(
            "melee",
            LayoutGroup::new("pack-swords", "Swords Pack", NodeSource::SystemDerived),
        ));

        let skeleton = layout.skeleton();
        let derived = &skeleton[0].groups[1];
        assert_eq!(derived.id, "pack-swords");
        assert_eq!(derived.nest_id, "melee_pack-swords");
        assert_eq!(derived.source, NodeSource::SystemDerived);
    }

    #[test]
    fn derived_with_missing_parent_is_skipped() {
        let mut layout = layout();
        layout.register_derived(
            "vanished",
            LayoutGroup::new("orphan", "Orphan", NodeSource::SystemDerived),
        );
        let skeleton = layout.skeleton();
        assert!(nest::resolve(&skeleton, "vanished_orphan").is_none());
    }

    #[test]
    fn register_derived_is_idempotent() {
        let mut layout = layout();
        let group = LayoutGroup::new("pack", "Pack", NodeSource::SystemDerived);
        assert!(layout.register_derived("melee", group.clone()));
        assert!(!layout.register_derived("melee", group));
    }

    #[test]
    fn unregister_derived_removes_entry() {
        let mut layout = layout();
        layout.register_derived(
            "melee",
            LayoutGroup::new("pack", "Pack", NodeSource::SystemDerived),
        );
        assert!(layout.unregister_derived("melee", "pack"));
        assert!(!layout.unregister_derived("melee", "pack"));
        assert!(layout.derived.is_empty());
    }

    #[test]
    fn layout_round_trips_through_blob() {
        let layout = layout();
        let blob = layout.encode().unwrap();
        let back = LayoutSnapshot::decode(&blob).unwrap();
        assert_eq!(back, layout);
    }

    #[test]
    fn layout_version_mismatch_is_an_error() {
        let mut layout = layout();
        layout.version = 99;
        let blob = layout.encode().unwrap();
        let err = LayoutSnapshot::decode(&blob).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::UnsupportedVersion { found: 99, .. }
        ));
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        assert!(LayoutSnapshot::decode(b"not json {{{").is_err());
        assert!(SelectionSnapshot::decode(b"not json {{{").is_err());
    }

    #[test]
    fn resolve_layout_walks_by_id() {
        let layout = layout();
        assert_eq!(
            resolve_layout(&layout.groups, "melee_weapons").unwrap().id,
            "weapons"
        );
        assert!(resolve_layout(&layout.groups, "melee_armour").is_none());
    }

    #[test]
    fn selection_lookup_requires_matching_source() {
        let mut selection = SelectionSnapshot::new();
        selection.set_entry(
            "melee_weapons",
            GroupSelection {
                source: NodeSource::System,
                actions: vec![SelectionEntry::new(
                    EncodedValue::new("action", &["sword"]).unwrap(),
                    "Sword",
                )],
            },
        );

        assert!(selection.entry("melee_weapons", NodeSource::System).is_some());
        assert!(selection.entry("melee_weapons", NodeSource::Custom).is_none());
        assert!(selection.entry("melee_armour", NodeSource::System).is_none());
    }

    #[test]
    fn selected_defaults_to_true_in_blob() {
        let json = br#"{
            "version": 1,
            "groups": {
                "melee_weapons": {
                    "source": "system",
                    "actions": [
                        { "encoded_value": "action|sword", "name": "Sword" }
                    ]
                }
            }
        }"#;
        let snapshot = SelectionSnapshot::decode(json).unwrap();
        let entry = snapshot.entry("melee_weapons", NodeSource::System).unwrap();
        assert!(entry.actions[0].selected);
    }
}
