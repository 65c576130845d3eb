// SPDX-License-Identifier: MIT
//! Compendium-backed actions: one sub-generator pass per permitted pack.
//!
//! The pack catalogue is a capability injected by the host. Each permitted
//! pack becomes a `(pack id, Compendium)` slot; only packs whose id matches
//! a `compendium`-typed subcategory in the skeleton actually surface —
//! unmatched slots are dropped by the merge pass.

#![forbid(unsafe_code)]

use std::sync::Arc;

use hud_core::character::Character;
use hud_core::encoded::EncodedValue;
use hud_core::node::NodeSource;
use tracing::debug;

use crate::generator::{
    ActionGenerator, ActionRecord, GeneratorError, GeneratorOutput, GroupTarget,
};

/// A compendium pack the current user is permitted to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompendiumPack {
    /// Pack id; matches the id of a `compendium`-typed subcategory.
    pub id: String,
    /// Presentation label.
    pub name: String,
}

/// A single openable entry inside a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompendiumEntry {
    /// Entry id within the pack.
    pub id: String,
    /// Presentation label.
    pub name: String,
    /// Optional image path used as the action icon.
    pub img: Option<String>,
}

/// Read-only view of the host's compendium catalogue.
pub trait CompendiumSource: Send + Sync {
    /// Packs the current user may open.
    fn packs(&self) -> Vec<CompendiumPack>;

    /// Entries of one pack.
    fn entries(&self, pack_id: &str) -> Result<Vec<CompendiumEntry>, GeneratorError>;
}

/// Built-in generator over a [`CompendiumSource`].
pub struct CompendiumGenerator {
    source: Arc<dyn CompendiumSource>,
}

impl CompendiumGenerator {
    /// Wrap a host catalogue.
    pub fn new(source: Arc<dyn CompendiumSource>) -> Self {
        Self { source }
    }
}

impl ActionGenerator for CompendiumGenerator {
    fn name(&self) -> &str {
        "compendium"
    }

    fn targets(&self, _character: &Character) -> Vec<GroupTarget> {
        self.source
            .packs()
            .into_iter()
            .map(|pack| GroupTarget::new(pack.id, NodeSource::Compendium))
            .collect()
    }

    fn populate(
        &self,
        _character: &Character,
        out: &mut GeneratorOutput,
    ) -> Result<(), GeneratorError> {
        for pack in self.source.packs() {
            let entries = self.source.entries(&pack.id)?;
            debug!(pack = %pack.id, entries = entries.len(), "compendium pack populated");

            let mut records = Vec::with_capacity(entries.len());
            for entry in entries {
                let encoded = EncodedValue::new("compendium", &[&pack.id, &entry.id])
                    .map_err(|e| GeneratorError::new("bad compendium encoding").with_source(e))?;
                let mut record = ActionRecord::new(&entry.id, &entry.name, encoded);
                record.icon = entry.img;
                records.push(record);
            }
            out.add_actions(GroupTarget::new(&pack.id, NodeSource::Compendium), records);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
