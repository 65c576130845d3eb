// SPDX-License-Identifier: MIT
//! Generic utility actions: combat and visibility toggles, end turn.
//!
//! These are system-independent. The encoded variant switches between
//! per-token and multi-token forms based on how many tokens back the
//! character, so execution dispatch downstream knows whether to act on one
//! token or the whole selection.

#![forbid(unsafe_code)]

use hud_core::character::Character;
use hud_core::encoded::EncodedValue;
use hud_core::node::NodeSource;

use crate::generator::{
    ActionGenerator, ActionRecord, GeneratorError, GeneratorOutput, GroupTarget,
};

/// Default id of the system subcategory utility actions land in.
pub const UTILITY_GROUP_ID: &str = "utility";

/// Built-in generator for combat/visibility toggles.
pub struct UtilityGenerator {
    group_id: String,
}

impl Default for UtilityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UtilityGenerator {
    /// Target the default [`UTILITY_GROUP_ID`] subcategory.
    pub fn new() -> Self {
        Self {
            group_id: UTILITY_GROUP_ID.to_owned(),
        }
    }

    /// Target a differently named subcategory.
    pub fn with_group_id(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
        }
    }

    fn variant(character: &Character) -> &'static str {
        if character.token_count() > 1 { "multi" } else { "token" }
    }
}

impl ActionGenerator for UtilityGenerator {
    fn name(&self) -> &str {
        "utility"
    }

    fn targets(&self, _character: &Character) -> Vec<GroupTarget> {
        vec![GroupTarget::new(&self.group_id, NodeSource::System)]
    }

    fn populate(
        &self,
        character: &Character,
        out: &mut GeneratorOutput,
    ) -> Result<(), GeneratorError> {
        if character.token_count() == 0 {
            // Nothing on the canvas to toggle; the slot stays empty and the
            // merge pass fully replaces the group with no actions.
            return Ok(());
        }

        let variant = Self::variant(character);
        let encode = |verb: &str| {
            EncodedValue::new("utility", &[variant, verb])
                .map_err(|e| GeneratorError::new("bad utility encoding").with_source(e))
        };

        let mut records = vec![
            ActionRecord::new("toggle-combat", "Toggle Combat", encode("toggleCombat")?),
            ActionRecord::new(
                "toggle-visibility",
                "Toggle Visibility",
                encode("toggleVisibility")?,
            ),
        ];
        if character.token_count() == 1 {
            records.push(ActionRecord::new("end-turn", "End Turn", encode("endTurn")?));
        }

        out.add_actions(GroupTarget::new(&self.group_id, NodeSource::System), records);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
