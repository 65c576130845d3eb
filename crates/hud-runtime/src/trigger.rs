// SPDX-License-Identifier: MIT
//! Opaque trigger descriptors.
//!
//! The scheduler is agnostic to what fired it; triggers exist for logging
//! and for the session controller's one semantic guard (settings-closed
//! rebuilds only when a settings change is pending).

#![forbid(unsafe_code)]

use std::fmt;

/// Broad class of a trigger, used for guard decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// A game-state hook fired: token selection, item change, combat
    /// change, ...
    GameEvent,
    /// A single HUD setting changed while the settings dialog is open.
    SettingChange,
    /// The settings dialog closed.
    SettingsClosed,
    /// An explicit request from the controller (resets, edits, manual
    /// refresh).
    ControllerRequest,
}

impl TriggerKind {
    /// Stable textual form for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GameEvent => "game-event",
            Self::SettingChange => "setting-change",
            Self::SettingsClosed => "settings-closed",
            Self::ControllerRequest => "controller",
        }
    }
}

/// A rebuild trigger: a kind plus the hook or operation name that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Guard-relevant class.
    pub kind: TriggerKind,
    /// Hook or operation name, for logs only.
    pub name: String,
}

impl Trigger {
    /// A game-state hook trigger.
    pub fn game_event(name: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::GameEvent,
            name: name.into(),
        }
    }

    /// A single-setting change.
    pub fn setting_change(name: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::SettingChange,
            name: name.into(),
        }
    }

    /// The settings dialog closed.
    pub fn settings_closed() -> Self {
        Self {
            kind: TriggerKind::SettingsClosed,
            name: "settings-closed".to_owned(),
        }
    }

    /// An explicit controller request.
    pub fn controller(name: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::ControllerRequest,
            name: name.into(),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_combines_kind_and_name() {
        let trigger = Trigger::game_event("updateItem");
        assert_eq!(trigger.to_string(), "game-event:updateItem");
    }
}
