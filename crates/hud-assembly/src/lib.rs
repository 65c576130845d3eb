// SPDX-License-Identifier: MIT
#![forbid(unsafe_code)]

//! Action HUD assembly
//!
//! Turns live generator output plus persisted snapshots into a single
//! consistent HUD tree. The three pieces:
//!
//! - [`generator`] — the capability surface content sources implement:
//!   the per-game-system [`SystemActionProvider`], built-in
//!   [`ActionGenerator`]s, and the [`GeneratorOutput`] collector that is
//!   their only way to contribute to the tree.
//! - [`merge`] — the pure reconciliation rule: saved order and visibility
//!   first, stale entries skipped, new actions appended selected.
//! - [`assembler::TreeAssembler`] — orchestrates one rebuild end to end:
//!   skeleton, fan-out, merge, derived-group bookkeeping, display
//!   truncation, selection persist.
//!
//! # Role in the workspace
//!
//! This crate does one rebuild when told to. Deciding *when* — coalescing
//! trigger bursts, keeping rebuilds mutually exclusive — is `hud-runtime`'s
//! job.

pub mod assembler;
pub mod builtin;
pub mod generator;
pub mod merge;

pub use assembler::{AssembledTree, TreeAssembler};
pub use builtin::{
    CompendiumEntry, CompendiumGenerator, CompendiumPack, CompendiumSource, MacroGenerator,
    MacroRecord, MacroSource, UtilityGenerator,
};
pub use generator::{
    ActionGenerator, ActionRecord, GeneratorError, GeneratorOutput, GroupSpec, GroupTarget,
    SystemActionProvider,
};
pub use merge::reconcile;
