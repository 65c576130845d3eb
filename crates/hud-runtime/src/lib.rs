// SPDX-License-Identifier: MIT
#![forbid(unsafe_code)]

//! Action HUD runtime
//!
//! Decides *when* the HUD rebuilds and under which guards; the rebuild
//! itself lives in `hud-assembly`. Three layers:
//!
//! - [`gate`] — condvar-backed primitives: a generation-counted debounce
//!   window and a mutual-exclusion gate with a bounded wait.
//! - [`scheduler`] — the [`RebuildScheduler`]: coalesces trigger bursts
//!   into one build, keeps builds mutually exclusive, and proceeds without
//!   exclusivity once the wait ceiling elapses.
//! - [`session`] — the [`HudSession`] controller: enablement and settings
//!   guards, the current character, resets, and persisted-state edits.
//!
//! Timing is wall-clock; tests drive real threads with short intervals
//! rather than a mocked clock.

pub mod gate;
pub mod scheduler;
pub mod session;
pub mod trigger;

pub use gate::{Acquire, BuildGate, DebounceGate};
pub use scheduler::{Phase, RebuildOutcome, RebuildScheduler, SchedulerConfig, SkipReason};
pub use session::HudSession;
pub use trigger::{Trigger, TriggerKind};
