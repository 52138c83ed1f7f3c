//! # Engine
//!
//! Coordinates the memtable, the sorted runs flushed from it, and the
//! sequence numbers that decide what a snapshot may see.
//!
//! ## Design Overview
//!
//! Data lives in two layers, queried newest-first:
//!
//! 1. **Memtable**: the mutable skip list receiving every write.
//! 2. **Sorted runs**: immutable entry collections, one per flush, each
//!    entry tagged with the sequence number current at flush time.
//!
//! Every `put` and `delete` is assigned the next sequence number. When the
//! memtable reaches its flush threshold it is drained in key order, handed
//! to the [`TableSink`] for durable storage, registered as the newest run,
//! and only then reset.
//!
//! ## Concurrency Model
//!
//! All engine state sits behind a single `Arc<RwLock<EngineInner>>`.
//! Writes and flushes take the **write lock**; `get` and `snapshot` take a
//! **read lock**. Consequences:
//!
//! - a reset never overlaps a snapshot copy of the same memtable;
//! - a snapshot sees either the pre-flush memtable or the new run, never a
//!   state where the flushed pairs are in neither.
//!
//! ## Failure handling
//!
//! A failed sink write leaves the memtable untouched and registers nothing;
//! the next write (or an explicit [`Engine::flush`]) tries again.

#[cfg(test)]
mod tests;

use std::io;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;
use tracing::{error, info};

use crate::memtable::{Memtable, MemtableError};
use crate::snapshot::{SnapshotError, SnapshotView};
use crate::table::{self, SortedRun};
use crate::{Config, ConfigError};

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration passed to [`Engine::open`] was rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Error originating from the memtable.
    #[error("Memtable error: {0}")]
    Memtable(#[from] MemtableError),

    /// Error originating from snapshot capture.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The table sink failed to persist a flushed run.
    #[error("Flush failed: {0}")]
    Flush(#[source] io::Error),

    /// Internal invariant violation (poisoned lock, unexpected state, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

// ------------------------------------------------------------------------------------------------
// Table sink
// ------------------------------------------------------------------------------------------------

/// Durable destination for flushed memtables.
///
/// The engine calls [`write_table`](TableSink::write_table) once per flush
/// and resets the memtable only after it returns `Ok`.
pub trait TableSink: Send + Sync {
    fn write_table(&self, run: &Arc<SortedRun>) -> io::Result<()>;
}

/// A [`TableSink`] that keeps every written run in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<Vec<Arc<SortedRun>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs written so far, oldest first.
    pub fn tables(&self) -> Vec<Arc<SortedRun>> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TableSink for MemorySink {
    fn write_table(&self, run: &Arc<SortedRun>) -> io::Result<()> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(run));
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Engine
// ------------------------------------------------------------------------------------------------

struct EngineInner {
    /// Memtable that accepts writes.
    memtable: Memtable,

    /// Flushed runs, newest first (strictly decreasing `max_seq`).
    runs: Vec<Arc<SortedRun>>,

    /// Sequence number of the most recent write.
    last_seq: u64,

    /// Id for the next flushed run.
    next_run_id: u64,
}

/// The memtable-plus-runs engine handle.
///
/// Cheap to clone; clones share state through the
/// internal `Arc<RwLock<_>>`.
pub struct Engine {
    inner: Arc<RwLock<EngineInner>>,
    sink: Arc<dyn TableSink>,
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Engine");
        if let Ok(inner) = self.inner.read() {
            s.field("last_seq", &inner.last_seq)
                .field("runs", &inner.runs.len());
        }
        s.finish_non_exhaustive()
    }
}

impl Engine {
    // --------------------------------------------------------------------------------------------
    // Lock helpers
    // --------------------------------------------------------------------------------------------

    /// Acquires a read lock on the engine state.
    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, EngineInner>, EngineError> {
        self.inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))
    }

    /// Acquires a write lock on the engine state.
    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, EngineInner>, EngineError> {
        self.inner
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))
    }

    // --------------------------------------------------------------------------------------------
    // Lifecycle
    // --------------------------------------------------------------------------------------------

    /// Creates an engine with an empty memtable and no runs.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if any configuration parameter is
    /// out of range.
    pub fn open(config: Config, sink: Arc<dyn TableSink>) -> Result<Self, EngineError> {
        config.validate()?;
        let memtable = Memtable::with_config(&config)?;

        info!(
            flush_threshold = config.flush_threshold,
            max_level = config.max_level,
            "engine opened"
        );

        let inner = EngineInner {
            memtable,
            runs: Vec::new(),
            last_seq: 0,
            next_run_id: 1,
        };

        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
            sink,
        })
    }

    // --------------------------------------------------------------------------------------------
    // Writes
    // --------------------------------------------------------------------------------------------

    /// Inserts or replaces a key-value pair.
    ///
    /// Returns `Ok(true)` if the write filled the memtable and it was
    /// flushed, `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// [`EngineError::Flush`] means the write itself was applied but the
    /// follow-up flush failed; the memtable keeps its contents.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<bool, EngineError> {
        let key = key.into();
        let value = value.into();
        let mut inner = self.write_lock()?;

        inner.last_seq += 1;
        tracing::trace!(
            key_len = key.len(),
            value_len = value.len(),
            seq = inner.last_seq,
            "engine put"
        );
        inner.memtable.insert(key, value)?;

        if inner.memtable.is_full()? {
            return self.flush_inner(&mut inner);
        }
        Ok(false)
    }

    /// Removes a key from the memtable.
    ///
    /// Returns `Ok(true)` if the memtable held the key. Versions already
    /// flushed to sorted runs are not affected.
    pub fn delete(&self, key: &str) -> Result<bool, EngineError> {
        let mut inner = self.write_lock()?;

        inner.last_seq += 1;
        tracing::trace!(key_len = key.len(), seq = inner.last_seq, "engine delete");
        Ok(inner.memtable.delete(key)?)
    }

    /// Flushes the memtable if it holds anything.
    ///
    /// Returns `Ok(true)` if a run was written.
    pub fn flush(&self) -> Result<bool, EngineError> {
        let mut inner = self.write_lock()?;
        self.flush_inner(&mut inner)
    }

    /// Drains the memtable into a new run, persists it through the sink,
    /// registers it, then resets the memtable, in that order.
    fn flush_inner(&self, inner: &mut EngineInner) -> Result<bool, EngineError> {
        let pairs = inner.memtable.entries()?;
        if pairs.is_empty() {
            return Ok(false);
        }

        let id = inner.next_run_id;
        let seq = inner.last_seq;
        let run = Arc::new(SortedRun::from_sorted_pairs(id, seq, pairs));

        if let Err(e) = self.sink.write_table(&run) {
            error!(run_id = id, "table sink write failed: {e}");
            return Err(EngineError::Flush(e));
        }

        inner.next_run_id += 1;
        inner.runs.insert(0, Arc::clone(&run));
        inner.memtable.reset()?;

        info!(run_id = id, seq, entries = run.len(), "memtable flushed");
        Ok(true)
    }

    // --------------------------------------------------------------------------------------------
    // Reads
    // --------------------------------------------------------------------------------------------

    /// Looks up the latest value of `key`.
    ///
    /// The lookup order is: memtable → sorted runs at the current sequence
    /// number, where the highest eligible sequence wins.
    pub fn get(&self, key: &str) -> Result<Option<String>, EngineError> {
        tracing::trace!(key_len = key.len(), "engine get");
        let inner = self.read_lock()?;

        if let Some(value) = inner.memtable.search(key)? {
            return Ok(Some(value));
        }

        Ok(table::find_visible(&inner.runs, key, inner.last_seq).map(|e| e.value.clone()))
    }

    /// Captures a point-in-time view at the current sequence number.
    ///
    /// The caller owns the view and should [`release`](SnapshotView::release)
    /// it once the read transaction ends.
    pub fn snapshot(&self) -> Result<SnapshotView, EngineError> {
        let inner = self.read_lock()?;
        Ok(SnapshotView::capture(
            &inner.memtable,
            inner.runs.clone(),
            inner.last_seq,
        )?)
    }

    // --------------------------------------------------------------------------------------------
    // Introspection
    // --------------------------------------------------------------------------------------------

    /// Sequence number of the most recent write (0 before any write).
    pub fn last_sequence(&self) -> Result<u64, EngineError> {
        Ok(self.read_lock()?.last_seq)
    }

    /// Number of sorted runs flushed so far.
    pub fn run_count(&self) -> Result<usize, EngineError> {
        Ok(self.read_lock()?.runs.len())
    }

    /// Sorted runs, newest first.
    pub fn runs(&self) -> Result<Vec<Arc<SortedRun>>, EngineError> {
        Ok(self.read_lock()?.runs.clone())
    }

    /// Number of live entries in the memtable.
    pub fn memtable_len(&self) -> Result<usize, EngineError> {
        Ok(self.read_lock()?.memtable.len()?)
    }
}
