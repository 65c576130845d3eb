// SPDX-License-Identifier: MIT
//! Macro actions, cached across rebuilds.
//!
//! Macros are user-global and change rarely compared to how often the HUD
//! rebuilds, so the host catalogue is consulted once and the result is
//! reused until the host's macro-change signal calls
//! [`MacroGenerator::invalidate`]. Hold the generator in an `Arc` so both
//! the assembler and the change-signal hookup can reach it.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::Mutex;

use hud_core::character::Character;
use hud_core::encoded::EncodedValue;
use hud_core::node::NodeSource;
use tracing::debug;

use crate::generator::{
    ActionGenerator, ActionRecord, GeneratorError, GeneratorOutput, GroupTarget,
};

/// Default id of the system subcategory macro actions land in.
pub const MACRO_GROUP_ID: &str = "macros";

/// A host macro visible to the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRecord {
    /// Macro id.
    pub id: String,
    /// Presentation label.
    pub name: String,
    /// Optional image path used as the action icon.
    pub img: Option<String>,
}

/// Read-only view of the host's macro catalogue.
pub trait MacroSource: Send + Sync {
    /// Macros the current user may execute.
    fn macros(&self) -> Result<Vec<MacroRecord>, GeneratorError>;
}

/// Built-in generator over a [`MacroSource`], with a cross-rebuild cache.
pub struct MacroGenerator {
    source: Arc<dyn MacroSource>,
    group_id: String,
    cache: Mutex<Option<Vec<ActionRecord>>>,
}

impl MacroGenerator {
    /// Wrap a host catalogue, targeting the default [`MACRO_GROUP_ID`].
    pub fn new(source: Arc<dyn MacroSource>) -> Self {
        Self {
            source,
            group_id: MACRO_GROUP_ID.to_owned(),
            cache: Mutex::new(None),
        }
    }

    /// Drop the cache; the next rebuild consults the catalogue again.
    ///
    /// Wire this to the host's macro-change signal.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = None;
        debug!("macro cache invalidated");
    }

    fn records(&self) -> Result<Vec<ActionRecord>, GeneratorError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(records) = cache.as_ref() {
            return Ok(records.clone());
        }

        let macros = self.source.macros()?;
        let mut records = Vec::with_capacity(macros.len());
        for entry in macros {
            let encoded = EncodedValue::new("macro", &[&entry.id])
                .map_err(|e| GeneratorError::new("bad macro encoding").with_source(e))?;
            let mut record = ActionRecord::new(&entry.id, &entry.name, encoded);
            record.icon = entry.img;
            records.push(record);
        }
        *cache = Some(records.clone());
        debug!(count = records.len(), "macro cache refilled");
        Ok(records)
    }
}

impl ActionGenerator for MacroGenerator {
    fn name(&self) -> &str {
        "macros"
    }

    fn targets(&self, _character: &Character) -> Vec<GroupTarget> {
        vec![GroupTarget::new(&self.group_id, NodeSource::System)]
    }

    fn populate(
        &self,
        _character: &Character,
        out: &mut GeneratorOutput,
    ) -> Result<(), GeneratorError> {
        let records = self.records()?;
        out.add_actions(GroupTarget::new(&self.group_id, NodeSource::System), records);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        macros: Mutex<Vec<MacroRecord>>,
    }

    impl CountingSource {
        fn new(macros: Vec<MacroRecord>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                macros: Mutex::new(macros),
            }
        }
    }

    impl MacroSource for CountingSource {
        fn macros(&self) -> Result<Vec<MacroRecord>, GeneratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.macros.lock().unwrap().clone())
        }
    }

    fn macro_record(id: &str) -> MacroRecord {
        MacroRecord {
            id: id.to_owned(),
            name: id.to_owned(),
            img: None,
        }
    }

    fn slot(generator: &MacroGenerator) -> Vec<ActionRecord> {
        let character = Character::new("actor", "Vex");
        let mut out = GeneratorOutput::new();
        generator.populate(&character, &mut out).unwrap();
        out.take_slot(MACRO_GROUP_ID, NodeSource::System)
            .unwrap_or_default()
    }

    #[test]
    fn catalogue_is_consulted_once_until_invalidated() {
        let source = Arc::new(CountingSource::new(vec![macro_record("heal")]));
        let generator = MacroGenerator::new(source.clone());

        assert_eq!(slot(&generator).len(), 1);
        assert_eq!(slot(&generator).len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        *source.macros.lock().unwrap() = vec![macro_record("heal"), macro_record("smite")];
        // Still cached.
        assert_eq!(slot(&generator).len(), 1);

        generator.invalidate();
        assert_eq!(slot(&generator).len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn macro_records_use_the_macro_tag() {
        let generator = MacroGenerator::new(Arc::new(CountingSource::new(vec![macro_record(
            "heal",
        )])));
        let records = slot(&generator);
        assert_eq!(records[0].encoded_value.as_str(), "macro|heal");
    }

    struct FailingSource;

    impl MacroSource for FailingSource {
        fn macros(&self) -> Result<Vec<MacroRecord>, GeneratorError> {
            Err(GeneratorError::new("macro directory unreadable"))
        }
    }

    #[test]
    fn failure_is_not_cached() {
        let generator = MacroGenerator::new(Arc::new(FailingSource));
        let character = Character::new("actor", "Vex");
        let mut out = GeneratorOutput::new();
        assert!(generator.populate(&character, &mut out).is_err());
        // A later populate still consults the source rather than serving a
        // cached error.
        assert!(generator.populate(&character, &mut out).is_err());
    }
}
