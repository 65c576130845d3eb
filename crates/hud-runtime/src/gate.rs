// SPDX-License-Identifier: MIT
//! Condvar-backed primitives behind the rebuild scheduler.
//!
//! Two small pieces, kept separate from the scheduler so each can be
//! tested on its own:
//!
//! - [`DebounceGate`] — a generation-counted quiet-interval wait. Arming
//!   bumps the generation; a waiter sleeps out the quiet interval unless a
//!   newer arm supersedes it first, in which case it wakes immediately.
//!   This is the cancellable debounce timer: the newest request restarts
//!   the window and every older waiter yields.
//! - [`BuildGate`] — a mutual-exclusion flag with a bounded wait. A caller
//!   that cannot acquire within the ceiling proceeds anyway
//!   ([`Acquire::TimedOut`]): liveness is preferred over strict
//!   serialization once the ceiling elapses. That is a deliberate, known
//!   race window — the timed-out caller may overlap the still-running
//!   build, and the gate makes no attempt to hide it.
//!
//! No polling loops: waiters block on a condition variable and are woken
//! by arms and releases.

#![forbid(unsafe_code)]

use std::sync::{Condvar, Mutex};

use web_time::{Duration, Instant};

/// Generation-counted debounce window.
pub struct DebounceGate {
    generation: Mutex<u64>,
    cvar: Condvar,
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceGate {
    /// Create a gate at generation zero.
    pub fn new() -> Self {
        Self {
            generation: Mutex::new(0),
            cvar: Condvar::new(),
        }
    }

    /// Register a new request: bump the generation, wake older waiters,
    /// and return the new generation for the caller to wait on.
    pub fn arm(&self) -> u64 {
        let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *generation += 1;
        self.cvar.notify_all();
        *generation
    }

    /// Sleep out the quiet interval.
    ///
    /// Returns `true` if `generation` is still the newest once the
    /// interval has elapsed, `false` as soon as a newer arm supersedes it.
    pub fn wait_quiet(&self, generation: u64, quiet: Duration) -> bool {
        let mut current = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = Instant::now() + quiet;
        loop {
            if *current != generation {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (guard, _timeout) = self
                .cvar
                .wait_timeout(current, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            current = guard;
        }
    }

    /// Whether a newer arm has happened since `generation`.
    pub fn superseded(&self, generation: u64) -> bool {
        let current = self.generation.lock().unwrap_or_else(|e| e.into_inner());
        *current != generation
    }
}

/// Result of [`BuildGate::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// The caller owns the gate and must [`release`](BuildGate::release).
    Acquired,
    /// The ceiling elapsed first. The caller proceeds without ownership
    /// and must **not** release.
    TimedOut,
}

/// Mutual-exclusion flag with a bounded wait.
pub struct BuildGate {
    busy: Mutex<bool>,
    cvar: Condvar,
}

impl Default for BuildGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildGate {
    /// Create a free gate.
    pub fn new() -> Self {
        Self {
            busy: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    /// Wait until the gate is free or the ceiling elapses.
    pub fn acquire(&self, ceiling: Duration) -> Acquire {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = Instant::now() + ceiling;
        loop {
            if !*busy {
                *busy = true;
                return Acquire::Acquired;
            }
            let now = Instant::now();
            if now >= deadline {
                return Acquire::TimedOut;
            }
            let (guard, _timeout) = self
                .cvar
                .wait_timeout(busy, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            busy = guard;
        }
    }

    /// Free the gate and wake waiters. Only an [`Acquire::Acquired`]
    /// caller may release.
    pub fn release(&self) {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        *busy = false;
        self.cvar.notify_all();
    }

    /// Whether some caller currently owns the gate.
    pub fn is_busy(&self) -> bool {
        *self.busy.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// =============================================================================
// Tests
// =============================================================================
