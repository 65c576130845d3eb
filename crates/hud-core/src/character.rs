// SPDX-License-Identifier: MIT
//! The actor + token context a rebuild is performed for.

#![forbid(unsafe_code)]

/// The currently controlled character: an actor plus the tokens selected
/// for it on the canvas.
///
/// Generators read this to decide what to emit; the utility generator in
/// particular switches between single- and multi-token action variants
/// based on [`token_count`](Self::token_count).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    /// Actor id; keys the selection snapshot in the store.
    pub actor_id: String,
    /// Display name, used in logs only.
    pub name: String,
    /// Ids of the selected tokens backing this character.
    pub token_ids: Vec<String>,
}

impl Character {
    /// Create a character with no tokens selected.
    pub fn new(actor_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            name: name.into(),
            token_ids: Vec::new(),
        }
    }

    /// Set the selected tokens.
    #[must_use]
    pub fn with_tokens<I, S>(mut self, token_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.token_ids = token_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Number of selected tokens.
    pub fn token_count(&self) -> usize {
        self.token_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_tokens_collects_ids() {
        let character = Character::new("actor-1", "Vex").with_tokens(["t1", "t2"]);
        assert_eq!(character.token_count(), 2);
        assert_eq!(character.token_ids, vec!["t1", "t2"]);
    }
}
