// SPDX-License-Identifier: MIT
//! Path-style addressing for groups in the HUD tree.
//!
//! Every group carries a *nest id*: its path from the tree root, with
//! segments joined by [`SEPARATOR`]. Nest ids locate a node in an owned
//! child-vector tree without parent pointers, so resolution is an O(depth)
//! walk rather than a graph traversal.
//!
//! [`resolve`], [`resolve_mut`], and [`parent_path`] are total: callers
//! routinely probe for optional nodes, so a miss is `None`, never a panic.
//! Only [`child_path`] can fail, and only on malformed input.
//!
//! # Example
//!
//! ```
//! use hud_core::nest;
//!
//! let nest_id = nest::child_path("melee", "weapons").unwrap();
//! assert_eq!(nest_id, "melee_weapons");
//! assert_eq!(nest::parent_path(&nest_id), Some("melee"));
//! ```

#![forbid(unsafe_code)]

use std::fmt;

use crate::node::Group;

/// Segment separator inside a nest id.
///
/// Node ids must not contain this character; [`child_path`] enforces that.
pub const SEPARATOR: char = '_';

/// A node id was empty or contained the segment separator.
///
/// This is the only error the addressing layer raises, and the only error
/// surfaced across the HUD core's public boundary for structural edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidId {
    /// The offending id.
    pub id: String,
}

impl InvalidId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl fmt::Display for InvalidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid node id {:?}: ids must be non-empty and must not contain {:?}",
            self.id, SEPARATOR
        )
    }
}

impl std::error::Error for InvalidId {}

/// Validate a single id segment.
pub fn validate_id(id: &str) -> Result<(), InvalidId> {
    if id.is_empty() || id.contains(SEPARATOR) {
        return Err(InvalidId::new(id));
    }
    Ok(())
}

/// Build the nest id of a child inserted under `parent_nest_id`.
///
/// Fails with [`InvalidId`] when `child_id` is empty or contains the
/// separator; the parent path is taken as already valid.
pub fn child_path(parent_nest_id: &str, child_id: &str) -> Result<String, InvalidId> {
    validate_id(child_id)?;
    Ok(format!("{parent_nest_id}{SEPARATOR}{child_id}"))
}

/// Drop the last segment of a nest id. `None` for root-level ids.
pub fn parent_path(nest_id: &str) -> Option<&str> {
    nest_id.rsplit_once(SEPARATOR).map(|(parent, _)| parent)
}

/// The last segment of a nest id (the node's own id).
pub fn leaf_id(nest_id: &str) -> &str {
    nest_id
        .rsplit_once(SEPARATOR)
        .map_or(nest_id, |(_, leaf)| leaf)
}

/// Iterate the segments of a nest id, root first.
pub fn segments(nest_id: &str) -> impl Iterator<Item = &str> {
    nest_id.split(SEPARATOR)
}

/// Walk a nest id down from a root set, matching each segment against child
/// `id`s (not `nest_id`s) at that level.
///
/// Returns `None` as soon as a segment has no matching child. Never panics.
pub fn resolve<'a>(roots: &'a [Group], nest_id: &str) -> Option<&'a Group> {
    let mut parts = segments(nest_id);
    let first = parts.next()?;
    let mut current = roots.iter().find(|g| g.id == first)?;
    for part in parts {
        current = current.groups.iter().find(|g| g.id == part)?;
    }
    Some(current)
}

/// Mutable counterpart of [`resolve`].
pub fn resolve_mut<'a>(roots: &'a mut [Group], nest_id: &str) -> Option<&'a mut Group> {
    let mut parts = segments(nest_id);
    let first = parts.next()?;
    let mut current = roots.iter_mut().find(|g| g.id == first)?;
    for part in parts {
        current = current.groups.iter_mut().find(|g| g.id == part)?;
    }
    Some(current)
}

/// Recompute `nest_id` for a subtree after a structural move or insert.
///
/// `parent_nest_id` is `None` when the group becomes a root category.
pub fn renumber(group: &mut Group, parent_nest_id: Option<&str>) {
    group.nest_id = match parent_nest_id {
        Some(parent) => format!("{parent}{SEPARATOR}{}", group.id),
        None => group.id.clone(),
    };
    let nest_id = group.nest_id.clone();
    for child in &mut group.groups {
        renumber(child, Some(&nest_id));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSource;

    fn group(id: &str) -> Group {
        Group::new(id, id, NodeSource::System)
    }

    #[test]
    fn child_path_joins_with_separator() {
        assert_eq!(child_path("melee", "weapons").unwrap(), "melee_weapons");
        assert_eq!(
            child_path("melee_weapons", "swords").unwrap(),
            "melee_weapons_swords"
        );
    }

    #[test]
    fn child_path_rejects_separator_in_id() {
        let err = child_path("melee", "long_swords").unwrap_err();
        assert_eq!(err.id, "long_swords");
    }

    #[test]
    fn child_path_rejects_empty_id() {
        assert!(child_path("melee", "").is_err());
    }

    #[test]
    fn parent_path_drops_last_segment() {
        assert_eq!(parent_path("melee_weapons_swords"), Some("melee_weapons"));
        assert_eq!(parent_path("melee_weapons"), Some("melee"));
        assert_eq!(parent_path("melee"), None);
    }

    #[test]
    fn leaf_id_is_last_segment() {
        assert_eq!(leaf_id("melee_weapons"), "weapons");
        assert_eq!(leaf_id("melee"), "melee");
    }

    #[test]
    fn resolve_walks_by_child_id() {
        let mut root = group("melee");
        root.push_group(group("weapons"));
        let roots = vec![root];

        let found = resolve(&roots, "melee_weapons").unwrap();
        assert_eq!(found.id, "weapons");
        assert_eq!(found.nest_id, "melee_weapons");
    }

    #[test]
    fn resolve_misses_are_none() {
        let mut root = group("melee");
        root.push_group(group("weapons"));
        let roots = vec![root];

        assert!(resolve(&roots, "ranged").is_none());
        assert!(resolve(&roots, "melee_armour").is_none());
        // Intermediate node with no children.
        assert!(resolve(&roots, "melee_weapons_swords").is_none());
        assert!(resolve(&roots, "").is_none());
    }

    #[test]
    fn resolve_matches_ids_not_nest_ids() {
        let mut root = group("melee");
        root.push_group(group("weapons"));
        let roots = vec![root];

        // A child's own nest id is not a valid segment.
        assert!(resolve(&roots, "melee_melee_weapons").is_none());
    }

    #[test]
    fn resolve_mut_reaches_the_same_node() {
        let mut root = group("melee");
        root.push_group(group("weapons"));
        let mut roots = vec![root];

        resolve_mut(&mut roots, "melee_weapons").unwrap().name = "Weapons!".to_owned();
        assert_eq!(resolve(&roots, "melee_weapons").unwrap().name, "Weapons!");
    }

    #[test]
    fn renumber_rewrites_whole_subtree() {
        let mut moved = group("weapons");
        moved.push_group(group("swords"));

        renumber(&mut moved, Some("ranged"));
        assert_eq!(moved.nest_id, "ranged_weapons");
        assert_eq!(moved.groups[0].nest_id, "ranged_weapons_swords");

        renumber(&mut moved, None);
        assert_eq!(moved.nest_id, "weapons");
        assert_eq!(moved.groups[0].nest_id, "weapons_swords");
    }

    #[test]
    fn round_trip_insert_then_resolve() {
        let mut root = group("melee");
        let parent_nest = root.nest_id.clone();
        root.push_group(group("weapons"));
        let roots = vec![root];

        let nest_id = child_path(&parent_nest, "weapons").unwrap();
        let found = resolve(&roots, &nest_id).unwrap();
        assert_eq!(found.id, "weapons");
    }
}
