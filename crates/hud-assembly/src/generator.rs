// SPDX-License-Identifier: MIT
//! The content-generator capability and its only mutation surface.
//!
//! Generators never touch the tree. They write into a [`GeneratorOutput`]:
//! flat action lists targeted at a `(group id, source)` slot, plus derived
//! subcategories to insert under a named parent. The assembler alone merges
//! those slots into the skeleton, so generators can run in any order (or
//! interleaved) without affecting the result — slots are keyed, not
//! positional.
//!
//! Two traits cover the two kinds of collaborator:
//!
//! - [`SystemActionProvider`] — the pluggable per-game-system source,
//!   injected at startup. Supplies the default layout and populates the
//!   `system`-typed subcategories present in the skeleton.
//! - [`ActionGenerator`] — fixed built-in sources (utility, compendium,
//!   macro) that are independent of the game system.
//!
//! A generator returning `Err` never aborts an assembly; the groups it
//! owns keep their previous snapshot contents and are flagged
//! `generator_failed`.

#![forbid(unsafe_code)]

use std::fmt;

use ahash::AHashMap;
use hud_core::character::Character;
use hud_core::encoded::EncodedValue;
use hud_core::node::NodeSource;
use hud_core::snapshot::LayoutSnapshot;

/// A content generator failed to produce actions.
///
/// Caught per generator: logged, the affected groups fall back to the
/// previous selection snapshot, and all other groups proceed normally.
#[derive(Debug)]
pub struct GeneratorError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GeneratorError {
    /// Create an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// The `(id, type)` slot an action list is aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupTarget {
    /// Target group id (not nest id; generators are position-agnostic).
    pub id: String,
    /// Required ownership class of the target group.
    pub source: NodeSource,
}

impl GroupTarget {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, source: NodeSource) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// A flat action record as produced by a generator, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    /// Short identifier, unique within the generator's output for a slot.
    pub id: String,
    /// Presentation label.
    pub name: String,
    /// Stable key identifying the underlying game capability.
    pub encoded_value: EncodedValue,
    /// Optional icon class or path.
    pub icon: Option<String>,
    /// Optional info badge text.
    pub info: Option<String>,
}

impl ActionRecord {
    /// Create a record without decorations.
    pub fn new(id: impl Into<String>, name: impl Into<String>, encoded_value: EncodedValue) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            encoded_value,
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
}

/// A derived subcategory a generator wants inserted this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// Group id, unique among the parent's children.
    pub id: String,
    /// Presentation label.
    pub name: String,
    /// Ownership class; runtime-created groups are usually
    /// [`NodeSource::SystemDerived`].
    pub source: NodeSource,
}

impl GroupSpec {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, name: impl Into<String>, source: NodeSource) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source,
        }
    }
}

/// Collector the assembler hands to each generator.
///
/// Slots are keyed by `(id, source)`; repeated `add_actions` calls against
/// the same slot append, so co-operating generators may share a target.
#[derive(Debug, Default)]
pub struct GeneratorOutput {
    slots: AHashMap<(String, NodeSource), Vec<ActionRecord>>,
    derived: Vec<(String, GroupSpec)>,
}

impl GeneratorOutput {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aim a flat list of actions at the `(id, source)` slot.
    pub fn add_actions(&mut self, target: GroupTarget, actions: Vec<ActionRecord>) {
        self.slots
            .entry((target.id, target.source))
            .or_default()
            .extend(actions);
    }

    /// Report a derived subcategory under the group with id `parent_id`.
    ///
    /// Reporting an already-known derived group keeps it alive for this
    /// cycle; unreported derived groups are pruned by the assembler.
    pub fn add_group(&mut self, parent_id: impl Into<String>, spec: GroupSpec) {
        self.derived.push((parent_id.into(), spec));
    }

    /// Remove and return the slot for `(id, source)`, if any generator
    /// filled it this cycle.
    pub(crate) fn take_slot(&mut self, id: &str, source: NodeSource) -> Option<Vec<ActionRecord>> {
        self.slots.remove(&(id.to_owned(), source))
    }

    /// Derived groups reported this cycle, in report order.
    pub(crate) fn derived(&self) -> &[(String, GroupSpec)] {
        &self.derived
    }

    /// Slots never claimed by the merge pass (no matching group in the
    /// skeleton); the assembler logs these.
    pub(crate) fn unclaimed(&self) -> impl Iterator<Item = &(String, NodeSource)> {
        self.slots.keys()
    }
}

/// The pluggable per-game-system content source.
pub trait SystemActionProvider: Send + Sync {
    /// The initial layout snapshot, copied into the store on first use and
    /// thereafter fully user-owned.
    fn default_layout(&self) -> LayoutSnapshot;

    /// Populate actions for the `system`-typed subcategory ids present in
    /// the current skeleton.
    fn populate(
        &self,
        character: &Character,
        group_ids: &[String],
        out: &mut GeneratorOutput,
    ) -> Result<(), GeneratorError>;
}

/// A fixed built-in content source (utility, compendium, macro).
pub trait ActionGenerator: Send + Sync {
    /// Name used in logs and in `AssembledTree::failed_generators`.
    fn name(&self) -> &str;

    /// The slots this generator owns for the given character. Used to scope
    /// the snapshot fallback when [`populate`](Self::populate) fails.
    fn targets(&self, character: &Character) -> Vec<GroupTarget>;

    /// Produce this cycle's actions into `out`.
    fn populate(
        &self,
        character: &Character,
        out: &mut GeneratorOutput,
    ) -> Result<(), GeneratorError>;
}

// =============================================================================
// Tests
// =============================================================================
