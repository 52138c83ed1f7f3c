//! # Snapshot Views
//!
//! A [`SnapshotView`] is a point-in-time read view made of:
//!
//! 1. a **private deep copy** of the memtable index taken at capture time;
//! 2. shared handles to the **sorted runs** that were live at capture time;
//! 3. the **sequence ceiling** in force at capture time.
//!
//! Lookups consult the memtable copy first; it holds the most recent writes
//! and shadows the runs for the same key regardless of sequence number.
//! Otherwise the runs are searched and, among all versions at or below the
//! ceiling, the one with the highest sequence number is returned.
//!
//! ## Lifecycle
//!
//! ```text
//!   capture()            release()
//!  ──────────► Active ──────────────► Released
//!              │  ▲                      │
//!              └──┘ get()                └── get() → Err(Released)
//! ```
//!
//! `release` is one-way and idempotent. It drops the private index and the
//! run handles immediately; querying afterwards is a caller bug and is
//! reported as [`SnapshotError::Released`] rather than answered from stale
//! state.
//!
//! ## Concurrency
//!
//! `get` takes `&self` and touches only data private to the view or
//! immutable by contract, so one view can be shared between reader threads
//! without any locking.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::memtable::{Memtable, MemtableError, MemtableIndex};
use crate::table::{self, SortedRun};

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by [`SnapshotView`] operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The view was queried after [`SnapshotView::release`].
    #[error("snapshot at sequence {0} has been released")]
    Released(u64),

    /// Copying the memtable failed.
    #[error("Memtable error: {0}")]
    Memtable(#[from] MemtableError),
}

// ------------------------------------------------------------------------------------------------
// SnapshotView
// ------------------------------------------------------------------------------------------------

/// An immutable, point-in-time read view over a memtable and sorted runs.
pub struct SnapshotView {
    /// Private copy of the memtable. `None` once released.
    index: Option<MemtableIndex>,

    /// Sorted runs visible to this view, newest first.
    runs: Vec<Arc<SortedRun>>,

    /// Highest sequence number visible through the runs.
    sequence: u64,
}

impl SnapshotView {
    /// Captures a view of `memtable` and `runs` at `sequence`.
    ///
    /// The memtable is copied under its read lock, so the copy never sees a
    /// half-applied write. Writes made after this call returns are not
    /// visible through the view.
    pub fn capture(
        memtable: &Memtable,
        runs: Vec<Arc<SortedRun>>,
        sequence: u64,
    ) -> Result<Self, SnapshotError> {
        let index = memtable.snapshot_index()?;
        let view = Self::from_parts(index, runs, sequence);

        info!(
            sequence,
            memtable_len = view.index.as_ref().map_or(0, |i| i.len()),
            runs = view.runs.len(),
            "Snapshot captured"
        );
        Ok(view)
    }

    /// Assembles a view from an index the caller already owns.
    ///
    /// `runs` may be supplied in any order.
    pub fn from_parts(index: MemtableIndex, mut runs: Vec<Arc<SortedRun>>, sequence: u64) -> Self {
        table::sort_newest_first(&mut runs);
        Self {
            index: Some(index),
            runs,
            sequence,
        }
    }

    /// Looks up `key` as of this view.
    ///
    /// # Returns
    /// - `Ok(Some(value))` from the memtable copy, or else from the newest
    ///   eligible version in the sorted runs.
    /// - `Ok(None)` if no source holds a visible version.
    /// - `Err(SnapshotError::Released)` if the view has been released.
    pub fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        trace!(key_len = key.len(), sequence = self.sequence, "snapshot get");

        let index = self
            .index
            .as_ref()
            .ok_or(SnapshotError::Released(self.sequence))?;

        if let Some(value) = index.search(key) {
            return Ok(Some(value.clone()));
        }

        Ok(table::find_visible(&self.runs, key, self.sequence).map(|e| e.value.clone()))
    }

    /// Releases the view. Later calls to [`get`](Self::get) fail.
    ///
    /// Calling this more than once is harmless.
    pub fn release(&mut self) {
        if self.index.take().is_some() {
            self.runs.clear();
            debug!(sequence = self.sequence, "Snapshot released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.index.is_none()
    }

    /// The sequence ceiling fixed at capture time.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of sorted runs held by the view (0 once released).
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

impl std::fmt::Debug for SnapshotView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotView")
            .field("sequence", &self.sequence)
            .field("released", &self.is_released())
            .field("runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl Drop for SnapshotView {
    fn drop(&mut self) {
        if !self.is_released() {
            debug!(sequence = self.sequence, "Snapshot dropped without release");
        }
    }
}
