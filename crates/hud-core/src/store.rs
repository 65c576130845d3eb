// SPDX-License-Identifier: MIT
//! Key-addressed blob store for persisted snapshots.
//!
//! The core never persists data itself; it calls a [`SnapshotStore`] keyed
//! by `(scope, id)`, where scope separates the user's layout from each
//! actor's selection. Blobs are opaque to the store.
//!
//! The store is **not** assumed concurrency-safe on its own: the rebuild
//! scheduler guarantees that only the currently building phase writes, so
//! backends here only need interior mutability, not cross-assembly
//! coordination.
//!
//! Two backends ship with the crate: [`MemoryStore`] for tests and
//! ephemeral sessions, and [`FileStore`] writing one JSON blob file per key
//! with atomic temp-file-then-rename writes.

#![forbid(unsafe_code)]

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use ahash::AHashMap;
use tracing::debug;

/// Which snapshot family a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScope {
    /// The user's layout snapshot; id is the user id.
    UserLayout,
    /// An actor's selection snapshot; id is the actor id.
    ActorSelection,
}

impl StoreScope {
    /// Stable textual form, used in file names and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserLayout => "user-layout",
            Self::ActorSelection => "actor-selection",
        }
    }
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persistence layer could not read or write.
///
/// Rebuilds degrade on this error (proceed with defaults, skip the write)
/// rather than surfacing it to the user.
#[derive(Debug)]
pub enum StoreError {
    /// I/O failure in a file-backed store.
    Io(io::Error),
    /// Transport failure in an external backend (socket relay, ...).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "store I/O error: {e}"),
            Self::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Backend(_) => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Abstract key-addressed blob store.
pub trait SnapshotStore: Send + Sync {
    /// Read the blob for `(scope, id)`. Missing keys are `Ok(None)`.
    fn get(&self, scope: StoreScope, id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write the blob for `(scope, id)`, replacing any previous value.
    fn set(&self, scope: StoreScope, id: &str, blob: Vec<u8>) -> Result<(), StoreError>;

    /// Remove the blob for `(scope, id)`. Removing a missing key is `Ok`.
    fn clear(&self, scope: StoreScope, id: &str) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<AHashMap<(StoreScope, String), Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, scope: StoreScope, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&(scope, id.to_owned())).cloned())
    }

    fn set(&self, scope: StoreScope, id: &str, blob: Vec<u8>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert((scope, id.to_owned()), blob);
        Ok(())
    }

    fn clear(&self, scope: StoreScope, id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&(scope, id.to_owned()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// File-backed store: one blob file per key under a root directory.
///
/// Writes are atomic (temp file then rename) so a crash mid-write never
/// leaves a truncated snapshot behind.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first
    /// write, not here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, scope: StoreScope, id: &str) -> PathBuf {
        // Ids come from the game side and may contain characters unfit for
        // file names; map anything non-portable to '-'.
        let safe: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect();
        self.root.join(format!("{}__{safe}.json", scope.as_str()))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, scope: StoreScope, id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(scope, id);
        match std::fs::read(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, scope: StoreScope, id: &str, blob: Vec<u8>) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.path_for(scope, id);
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, blob)?;
        std::fs::rename(&temp, &path)?;
        debug!(scope = %scope, id = %id, path = %path.display(), "snapshot written");
        Ok(())
    }

    fn clear(&self, scope: StoreScope, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(scope, id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(scope = %scope, id = %id, "snapshot cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        store
            .set(StoreScope::UserLayout, "user-1", b"layout".to_vec())
            .unwrap();
        assert_eq!(
            store.get(StoreScope::UserLayout, "user-1").unwrap(),
            Some(b"layout".to_vec())
        );
    }

    #[test]
    fn memory_store_scopes_are_disjoint() {
        let store = MemoryStore::new();
        store
            .set(StoreScope::UserLayout, "same-id", b"layout".to_vec())
            .unwrap();
        store
            .set(StoreScope::ActorSelection, "same-id", b"selection".to_vec())
            .unwrap();

        assert_eq!(
            store.get(StoreScope::UserLayout, "same-id").unwrap(),
            Some(b"layout".to_vec())
        );
        assert_eq!(
            store.get(StoreScope::ActorSelection, "same-id").unwrap(),
            Some(b"selection".to_vec())
        );
    }

    #[test]
    fn memory_store_clear_removes_entry() {
        let store = MemoryStore::new();
        store
            .set(StoreScope::ActorSelection, "actor", b"x".to_vec())
            .unwrap();
        store.clear(StoreScope::ActorSelection, "actor").unwrap();
        assert_eq!(store.get(StoreScope::ActorSelection, "actor").unwrap(), None);
        // Clearing a missing key is fine.
        store.clear(StoreScope::ActorSelection, "actor").unwrap();
    }

    #[test]
    fn missing_key_is_none_not_error() {
        let store = MemoryStore::new();
        assert_eq!(store.get(StoreScope::UserLayout, "nobody").unwrap(), None);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .set(StoreScope::UserLayout, "user-1", b"{\"v\":1}".to_vec())
            .unwrap();
        assert_eq!(
            store.get(StoreScope::UserLayout, "user-1").unwrap(),
            Some(b"{\"v\":1}".to_vec())
        );
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert_eq!(store.get(StoreScope::UserLayout, "nobody").unwrap(), None);
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .set(StoreScope::ActorSelection, "actor", b"x".to_vec())
            .unwrap();
        store.clear(StoreScope::ActorSelection, "actor").unwrap();
        store.clear(StoreScope::ActorSelection, "actor").unwrap();
        assert_eq!(store.get(StoreScope::ActorSelection, "actor").unwrap(), None);
    }

    #[test]
    fn file_store_sanitizes_hostile_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .set(StoreScope::ActorSelection, "../../etc/passwd", b"x".to_vec())
            .unwrap();
        assert_eq!(
            store
                .get(StoreScope::ActorSelection, "../../etc/passwd")
                .unwrap(),
            Some(b"x".to_vec())
        );
        // Nothing escaped the root directory.
        assert!(dir.path().join("..").join("..").exists());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_store_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .set(StoreScope::UserLayout, "user", b"x".to_vec())
            .unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
