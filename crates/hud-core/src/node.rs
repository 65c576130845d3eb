// SPDX-License-Identifier: MIT
//! The in-memory HUD tree: groups (categories and subcategories) holding
//! ordered child groups and actions.
//!
//! Root groups are categories (`nest_id == id`); nested groups are
//! subcategories. Depth is not hard-capped, but the addressing scheme
//! assumes a small finite depth.
//!
//! Trees are values. Every rebuild produces a fresh tree and never mutates
//! the previously returned one, so a consumer holding the old tree can never
//! observe tearing even while a new assembly is in flight.
//!
//! # Example
//!
//! ```
//! use hud_core::node::{Group, NodeSource};
//!
//! let mut melee = Group::new("melee", "Melee", NodeSource::System);
//! melee.push_group(Group::new("weapons", "Weapons", NodeSource::System));
//! assert_eq!(melee.groups[0].nest_id, "melee_weapons");
//! ```

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::encoded::EncodedValue;
use crate::nest;

/// Ownership class of a node, deciding who may create, repopulate, and
/// delete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeSource {
    /// Generator-owned; present in the default layout; not user-deletable.
    /// Its actions are fully replaced on every rebuild.
    System,
    /// Generator-owned but created at runtime under a system node (one per
    /// compendium pack, per spellbook, ...). Pruned when no generator
    /// repopulates it.
    SystemDerived,
    /// Backed by a compendium pack.
    Compendium,
    /// User-created. Children are never generator-supplied and persist
    /// verbatim across rebuilds, apart from user-made order changes.
    Custom,
}

/// Optional per-group presentation overrides.
///
/// A subcategory-level value wins over the category-level default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdvancedOptions {
    /// Truncate `display_name`s to this many characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_count: Option<usize>,
    /// Fixed width in pixels for this group's panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_width: Option<u32>,
    /// Render the group title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_title: Option<bool>,
    /// Lay actions out as a grid instead of a column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<bool>,
}

/// A leaf action ready for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Short identifier, unique among siblings.
    pub id: String,
    /// Stored label; never truncated.
    pub name: String,
    /// Presentation label; truncation applies here only.
    pub display_name: String,
    /// Stable key identifying the underlying game capability.
    pub encoded_value: EncodedValue,
    /// Whether the user keeps this action visible on the HUD.
    pub selected: bool,
    /// Optional icon class or path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Optional info badge text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl Action {
    /// Create a selected action with `display_name == name`.
    pub fn new(id: impl Into<String>, name: impl Into<String>, encoded_value: EncodedValue) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            display_name: name.clone(),
            name,
            encoded_value,
            selected: true,
            icon: None,
            info: None,
        }
    }

    /// Set the icon decoration.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the info badge.
    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Set the selected flag.
    #[must_use]
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

/// A category or subcategory node with ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Short identifier, unique among siblings.
    pub id: String,
    /// Full path from the root; recomputed whenever the group moves.
    pub nest_id: String,
    /// Stored label; never truncated.
    pub name: String,
    /// Presentation label; truncation applies here only.
    pub display_name: String,
    /// Ownership class.
    pub source: NodeSource,
    /// Per-group presentation overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedOptions>,
    /// Set when this group's generator errored during the last rebuild and
    /// the previous snapshot's actions were kept instead.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub generator_failed: bool,
    /// Child subcategories, in presentation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    /// Child actions, in presentation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Group {
    /// Create a root-level group (`nest_id == id`).
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: NodeSource) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            nest_id: id.clone(),
            id,
            display_name: name.clone(),
            name,
            source,
            advanced: None,
            generator_failed: false,
            groups: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Set presentation overrides.
    #[must_use]
    pub fn with_advanced(mut self, advanced: AdvancedOptions) -> Self {
        self.advanced = Some(advanced);
        self
    }

    /// Append a child group, renumbering its subtree under this group.
    pub fn push_group(&mut self, mut child: Group) {
        nest::renumber(&mut child, Some(&self.nest_id));
        self.groups.push(child);
    }

    /// Builder-style [`push_group`](Self::push_group).
    #[must_use]
    pub fn with_group(mut self, child: Group) -> Self {
        self.push_group(child);
        self
    }

    /// Whether this group is a root category.
    pub fn is_root(&self) -> bool {
        !self.nest_id.contains(nest::SEPARATOR)
    }
}

/// Truncate `display_name`s to the effective per-group character limit.
///
/// `default_limit` is the category-level default; a group carrying its own
/// `character_count` override wins for itself and everything beneath it.
/// Stored `name`s are never touched.
pub fn apply_character_limits(groups: &mut [Group], default_limit: Option<usize>) {
    for group in groups {
        let effective = group
            .advanced
            .and_then(|a| a.character_count)
            .or(default_limit);
        if let Some(limit) = effective {
            truncate_chars(&mut group.display_name, limit);
            for action in &mut group.actions {
                truncate_chars(&mut action.display_name, limit);
            }
        }
        apply_character_limits(&mut group.groups, effective);
    }
}

/// Truncate in place to `limit` characters (not bytes).
fn truncate_chars(text: &mut String, limit: usize) {
    if let Some((idx, _)) = text.char_indices().nth(limit) {
        text.truncate(idx);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, name: &str) -> Action {
        Action::new(id, name, EncodedValue::new("action", &[id]).unwrap())
    }

    #[test]
    fn push_group_renumbers_subtree() {
        let mut root = Group::new("inventory", "Inventory", NodeSource::System);
        let mut sub = Group::new("weapons", "Weapons", NodeSource::System);
        sub.push_group(Group::new("swords", "Swords", NodeSource::System));
        root.push_group(sub);

        assert_eq!(root.groups[0].nest_id, "inventory_weapons");
        assert_eq!(root.groups[0].groups[0].nest_id, "inventory_weapons_swords");
    }

    #[test]
    fn root_detection_uses_nest_id() {
        let root = Group::new("inventory", "Inventory", NodeSource::System);
        assert!(root.is_root());

        let child = Group::new("inventory", "Inventory", NodeSource::System)
            .with_group(Group::new("weapons", "Weapons", NodeSource::System));
        assert!(!child.groups[0].is_root());
    }

    #[test]
    fn character_limit_truncates_display_name_only() {
        let mut group = Group::new("spells", "Spells", NodeSource::System);
        group.actions.push(action("fireball", "Fireball of Doom"));
        let mut groups = vec![group];

        apply_character_limits(&mut groups, Some(8));

        let a = &groups[0].actions[0];
        assert_eq!(a.display_name, "Fireball");
        assert_eq!(a.name, "Fireball of Doom");
    }

    #[test]
    fn subcategory_override_wins_over_default() {
        let sub = Group::new("weapons", "Weapons", NodeSource::System).with_advanced(
            AdvancedOptions {
                character_count: Some(3),
                ..AdvancedOptions::default()
            },
        );
        let mut root = Group::new("inventory", "Inventory", NodeSource::System).with_group(sub);
        root.groups[0].actions.push(action("sword", "Longsword"));
        let mut groups = vec![root];

        apply_character_limits(&mut groups, Some(20));

        assert_eq!(groups[0].groups[0].actions[0].display_name, "Lon");
        assert_eq!(groups[0].groups[0].display_name, "Wea");
    }

    #[test]
    fn no_limit_leaves_names_alone() {
        let mut group = Group::new("spells", "Spells", NodeSource::System);
        group.actions.push(action("fireball", "Fireball of Doom"));
        let mut groups = vec![group];

        apply_character_limits(&mut groups, None);
        assert_eq!(groups[0].actions[0].display_name, "Fireball of Doom");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let mut group = Group::new("spells", "Spells", NodeSource::System);
        group.actions.push(action("ray", "Röntgenstrahl"));
        let mut groups = vec![group];

        apply_character_limits(&mut groups, Some(4));
        assert_eq!(groups[0].actions[0].display_name, "Rönt");
    }
}
