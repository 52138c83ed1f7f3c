//! # Memtable Module
//!
//! The mutable, in-memory layer of the storage engine.
//!
//! A [`Memtable`] owns one [`SkipList`] behind an `RwLock`. It accepts
//! writes until the live entry count reaches the configured flush
//! threshold; the engine then drains it with [`Memtable::entries`], writes
//! the pairs to a new sorted table and calls [`Memtable::reset`].
//!
//! ## Concurrency
//!
//! - `insert`, `delete` and `reset` take the **write lock**, so structural
//!   splicing is always serialized.
//! - `search`, `entries` and [`Memtable::snapshot_index`] take the **read
//!   lock**. A clone therefore never observes a half-linked node: it waits
//!   for any in-flight writer and blocks new ones until the copy is done.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{error, info, trace};

use crate::skiplist::SkipList;
use crate::{Config, ConfigError};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Represents possible errors returned by [`Memtable`] operations.
#[derive(Debug, Error)]
pub enum MemtableError {
    /// The configuration passed to [`Memtable::with_config`] was rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Internal invariant violation or poisoned lock.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Memtable Core
// ------------------------------------------------------------------------------------------------

/// The string-keyed skip list used as the memtable index.
pub type MemtableIndex = SkipList<String, String>;

/// A thread-safe, in-memory key-value buffer.
///
/// Keys and values are strings. A key holds exactly one value: writing it
/// again replaces the value, deleting it removes the entry outright.
pub struct Memtable {
    inner: RwLock<MemtableIndex>,
}

impl Memtable {
    /// Creates an empty memtable with default limits.
    pub fn new() -> Self {
        Self::with_index(SkipList::new())
    }

    /// Creates an empty memtable after validating `config`.
    pub fn with_config(config: &Config) -> Result<Self, MemtableError> {
        config.validate()?;
        info!(
            max_level = config.max_level,
            flush_threshold = config.flush_threshold,
            seeded = config.seed.is_some(),
            "Initializing memtable"
        );
        Ok(Self::with_index(SkipList::from_config(config)))
    }

    /// Wraps an existing index. Its contents become the memtable contents.
    pub fn with_index(index: MemtableIndex) -> Self {
        Self {
            inner: RwLock::new(index),
        }
    }

    /// Inserts or replaces a key-value pair.
    pub fn insert(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), MemtableError> {
        let key = key.into();
        let value = value.into();
        trace!(key_len = key.len(), value_len = value.len(), "insert() started");

        let mut guard = self.write_lock("insert")?;
        let replaced = guard.insert(key, value).is_some();

        trace!(replaced, len = guard.len(), "insert() completed");
        Ok(())
    }

    /// Retrieves the value stored for `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` if the key is present.
    /// - `Ok(None)` if the key was never written or has been deleted.
    pub fn search(&self, key: &str) -> Result<Option<String>, MemtableError> {
        trace!(key_len = key.len(), "search() started");

        let guard = self.read_lock("search")?;
        Ok(guard.search(key).cloned())
    }

    /// Removes `key`. Returns `Ok(false)` if it was not present.
    pub fn delete(&self, key: &str) -> Result<bool, MemtableError> {
        trace!(key_len = key.len(), "delete() started");

        let mut guard = self.write_lock("delete")?;
        let found = guard.delete(key);

        trace!(found, len = guard.len(), "delete() completed");
        Ok(found)
    }

    /// All live pairs in ascending key order, ready to be written to a
    /// sorted table.
    pub fn entries(&self) -> Result<Vec<(String, String)>, MemtableError> {
        Ok(self.read_lock("entries")?.entries())
    }

    /// Number of live entries.
    pub fn len(&self) -> Result<usize, MemtableError> {
        Ok(self.read_lock("len")?.len())
    }

    pub fn is_empty(&self) -> Result<bool, MemtableError> {
        Ok(self.read_lock("is_empty")?.is_empty())
    }

    /// Returns `true` once the memtable should be flushed.
    pub fn is_full(&self) -> Result<bool, MemtableError> {
        Ok(self.read_lock("is_full")?.is_full())
    }

    /// Discards all contents.
    ///
    /// Only call this once the current contents have been durably written
    /// elsewhere; nothing is kept.
    pub fn reset(&self) -> Result<(), MemtableError> {
        let mut guard = self.write_lock("reset")?;
        let dropped = guard.len();
        guard.reset();

        info!(dropped, "Memtable reset");
        Ok(())
    }

    /// Returns an independent deep copy of the index.
    ///
    /// Taken under the read lock, so the copy reflects a state between two
    /// complete writes. Later writes to this memtable never show up in the
    /// copy, and vice versa.
    pub fn snapshot_index(&self) -> Result<MemtableIndex, MemtableError> {
        let guard = self.read_lock("snapshot_index")?;
        let copy = guard.clone();

        trace!(len = copy.len(), "snapshot_index() completed");
        Ok(copy)
    }

    // --------------------------------------------------------------------------------------------
    // Lock helpers
    // --------------------------------------------------------------------------------------------

    fn read_lock(&self, op: &str) -> Result<RwLockReadGuard<'_, MemtableIndex>, MemtableError> {
        self.inner.read().map_err(|_| {
            error!("Read-write lock poisoned during {}", op);
            MemtableError::Internal("RwLock poisoned".into())
        })
    }

    fn write_lock(&self, op: &str) -> Result<RwLockWriteGuard<'_, MemtableIndex>, MemtableError> {
        self.inner.write().map_err(|_| {
            error!("Read-write lock poisoned during {}", op);
            MemtableError::Internal("Read-write lock poisoned".into())
        })
    }
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memtable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self.inner.read().map(|guard| guard.len()).ok();
        f.debug_struct("Memtable")
            .field("len", &len)
            .finish_non_exhaustive()
    }
}
