// SPDX-License-Identifier: MIT
//! The rebuild scheduler: debounce, mutual exclusion, bounded waits.
//!
//! Game events often fire several times in the same tick; rebuilding per
//! event would repeat an expensive generator fan-out for no visible
//! difference. The scheduler coalesces bursts and keeps rebuilds mutually
//! exclusive:
//!
//! - **Debounce**: every request waits out a short quiet interval. A newer
//!   request supersedes every older one still waiting, so a burst of N
//!   triggers collapses into one build.
//! - **Exclusion**: at most one build runs at a time. A request arriving
//!   mid-build blocks until the build finishes or a wait ceiling elapses.
//! - **Ceiling**: on expiry the caller proceeds *without* exclusivity
//!   (logged, and reported as `exclusive: false`). This favors liveness
//!   over strict serialization when a generator hangs; the resulting
//!   overlap is a known race window, not an invariant.
//!
//! The state machine is `Idle → Pending → Building → Idle`. A build in
//! flight is never cancelled; superseding triggers wait, they do not
//! abort.

#![forbid(unsafe_code)]

use std::sync::Mutex;

use tracing::{debug, warn};
use web_time::Duration;

use crate::gate::{Acquire, BuildGate, DebounceGate};
use crate::trigger::Trigger;

/// Timing knobs for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Quiet interval a request waits before building; near-simultaneous
    /// requests inside this window collapse into one build.
    pub quiet: Duration,
    /// Longest a request blocks on an in-flight build before proceeding
    /// without exclusivity.
    pub wait_ceiling: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(10),
            wait_ceiling: Duration::from_secs(5),
        }
    }
}

/// Why a request did not reach the scheduler's build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The HUD is administratively disabled.
    Disabled,
    /// No character is selected.
    NoCharacter,
    /// The settings dialog closed with nothing pending.
    SettingsNotPending,
    /// A setting changed; the rebuild is deferred until the dialog closes.
    SettingsDeferred,
}

/// Outcome of one rebuild request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome<T> {
    /// The request ran the build.
    Built {
        /// The build result.
        value: T,
        /// `false` when the wait ceiling elapsed and the build overlapped
        /// an in-flight one.
        exclusive: bool,
    },
    /// A newer request superseded this one before it could build.
    Coalesced,
    /// A controller guard stopped the request before scheduling.
    Skipped(SkipReason),
}

impl<T> RebuildOutcome<T> {
    /// The built value, if this request built.
    pub fn built(self) -> Option<T> {
        match self {
            Self::Built { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether this request was coalesced into a newer one.
    pub fn is_coalesced(&self) -> bool {
        matches!(self, Self::Coalesced)
    }
}

/// Scheduler phase, exposed for observability and tests.
///
/// Best-effort under concurrency: the phase is bookkeeping, the gates are
/// the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request in flight.
    Idle,
    /// A request is waiting out the quiet interval.
    Pending,
    /// A build is running.
    Building,
}

/// Coalesces rebuild requests and keeps builds mutually exclusive.
pub struct RebuildScheduler {
    debounce: DebounceGate,
    gate: BuildGate,
    config: SchedulerConfig,
    phase: Mutex<Phase>,
}

impl Default for RebuildScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl RebuildScheduler {
    /// Create a scheduler with the given timing knobs.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            debounce: DebounceGate::new(),
            gate: BuildGate::new(),
            config,
            phase: Mutex::new(Phase::Idle),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    /// Run `build` for this trigger, unless a newer request supersedes it.
    ///
    /// Blocks the calling thread through the quiet interval and, when a
    /// build is in flight, up to the wait ceiling.
    pub fn request<T>(&self, trigger: &Trigger, build: impl FnOnce() -> T) -> RebuildOutcome<T> {
        debug!(trigger = %trigger, "rebuild requested");
        let generation = self.debounce.arm();
        self.set_phase(Phase::Pending);

        if !self.debounce.wait_quiet(generation, self.config.quiet) {
            debug!(trigger = %trigger, "coalesced during quiet interval");
            return RebuildOutcome::Coalesced;
        }

        let acquired = self.gate.acquire(self.config.wait_ceiling);

        // A newer trigger may have arrived while this one blocked on the
        // gate; yield to it rather than building stale state twice.
        if self.debounce.superseded(generation) {
            if acquired == Acquire::Acquired {
                self.gate.release();
            }
            debug!(trigger = %trigger, "superseded while waiting for the in-flight build");
            return RebuildOutcome::Coalesced;
        }

        let exclusive = acquired == Acquire::Acquired;
        if !exclusive {
            warn!(
                trigger = %trigger,
                ceiling_ms = self.config.wait_ceiling.as_millis() as u64,
                "wait ceiling elapsed; proceeding without exclusivity"
            );
        }

        self.set_phase(Phase::Building);
        let value = build();
        if exclusive {
            self.gate.release();
        }
        self.set_phase(Phase::Idle);
        debug!(trigger = %trigger, exclusive, "rebuild finished");

        RebuildOutcome::Built { value, exclusive }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            quiet: Duration::from_millis(5),
            wait_ceiling: Duration::from_secs(1),
        }
    }

    #[test]
    fn single_request_builds() {
        let scheduler = RebuildScheduler::new(fast_config());
        let outcome = scheduler.request(&Trigger::controller("test"), || 42);
        assert_eq!(
            outcome,
            RebuildOutcome::Built {
                value: 42,
                exclusive: true
            }
        );
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn built_accessor_unwraps_value() {
        let scheduler = RebuildScheduler::new(fast_config());
        let outcome = scheduler.request(&Trigger::controller("test"), || "tree");
        assert_eq!(outcome.built(), Some("tree"));
        assert!(RebuildOutcome::<()>::Coalesced.built().is_none());
    }

    #[test]
    fn gate_is_released_after_build() {
        let scheduler = RebuildScheduler::new(fast_config());
        let _ = scheduler.request(&Trigger::controller("one"), || ());
        // A second request must not time out against a leaked gate.
        let outcome = scheduler.request(&Trigger::controller("two"), || ());
        assert_eq!(
            outcome,
            RebuildOutcome::Built {
                value: (),
                exclusive: true
            }
        );
    }
}
