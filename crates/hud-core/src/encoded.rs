// SPDX-License-Identifier: MIT
//! Stable compound keys identifying an action's underlying game capability.
//!
//! Generated actions are recreated with fresh memory identity on every
//! rebuild; the encoded value is the key that survives. Two actions with
//! equal encoded values are the same action for merge purposes, which is why
//! selection snapshots are keyed by encoded value and never by transient id.
//!
//! The format is segments joined by [`DELIMITER`]; the first segment is the
//! action-type tag, the rest are type-specific arguments that execution
//! dispatch (out of scope here) splits back out.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::nest::InvalidId;

/// Segment delimiter inside an encoded value. Must not appear inside ids.
pub const DELIMITER: char = '|';

/// A validated encoded action key.
///
/// Equality and hashing define action identity across rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedValue(String);

impl EncodedValue {
    /// Build an encoded value from an action-type tag and its arguments.
    ///
    /// Fails with [`InvalidId`] when any segment is empty or contains the
    /// delimiter.
    pub fn new(action_type: &str, parts: &[&str]) -> Result<Self, InvalidId> {
        validate_segment(action_type)?;
        let mut value = String::from(action_type);
        for part in parts {
            validate_segment(part)?;
            value.push(DELIMITER);
            value.push_str(part);
        }
        Ok(Self(value))
    }

    /// The action-type tag (first segment).
    pub fn action_type(&self) -> &str {
        self.0.split(DELIMITER).next().unwrap_or("")
    }

    /// The type-specific arguments (everything after the tag).
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.split(DELIMITER).skip(1)
    }

    /// The raw joined form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_segment(segment: &str) -> Result<(), InvalidId> {
    if segment.is_empty() || segment.contains(DELIMITER) {
        return Err(InvalidId { id: segment.to_owned() });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
