// SPDX-License-Identifier: MIT
#![forbid(unsafe_code)]

//! Action HUD core model
//!
//! This crate holds the pure, I/O-light foundation of the action HUD: the
//! in-memory tree of groups and actions, path-style addressing over it,
//! stable encoded action keys, the two persisted snapshots (user layout and
//! actor selection), and the key-addressed blob store they live in.
//!
//! # Key components
//!
//! - [`node::Group`] / [`node::Action`] — the assembled tree handed to
//!   presentation.
//! - [`nest`] — pure addressing: `child_path`, `resolve`, `parent_path`.
//! - [`encoded::EncodedValue`] — action identity across rebuilds.
//! - [`snapshot::LayoutSnapshot`] / [`snapshot::SelectionSnapshot`] — the
//!   persisted shape and the persisted order/visibility.
//! - [`store::SnapshotStore`] — the abstract `(scope, id)` blob store, with
//!   memory and file backends.
//!
//! # Role in the workspace
//!
//! `hud-core` has no opinion on *when* trees are built or *what* actions a
//! game system exposes. `hud-assembly` merges generator output into these
//! types; `hud-runtime` schedules rebuilds and owns the session.

pub mod character;
pub mod encoded;
pub mod nest;
pub mod node;
pub mod snapshot;
pub mod store;

pub use character::Character;
pub use encoded::{DELIMITER, EncodedValue};
pub use nest::{InvalidId, SEPARATOR, child_path, parent_path, renumber, resolve, resolve_mut};
pub use node::{Action, AdvancedOptions, Group, NodeSource, apply_character_limits};
pub use snapshot::{
    GroupSelection, LayoutGroup, LayoutSnapshot, SelectionEntry, SelectionSnapshot, SnapshotError,
};
pub use store::{FileStore, MemoryStore, SnapshotStore, StoreError, StoreScope};
