//! # Sorted Runs
//!
//! The read-only, in-memory form of a flushed table: a key-sorted
//! collection of `(key, value, seq)` entries.
//!
//! A [`SortedRun`] is shared as `Arc<SortedRun>` between the engine and any
//! number of snapshots. Once built it is never mutated, so readers need no
//! locking.
//!
//! ## Ordering
//!
//! Entries are kept sorted by `(key ASC, seq DESC)`. A lookup binary-searches
//! the first entry for a key and walks forward through its versions; the
//! first version at or below the ceiling is the newest one the reader may
//! see.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------


// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::cmp::Reverse;
use std::sync::Arc;

// ------------------------------------------------------------------------------------------------
// Entry
// ------------------------------------------------------------------------------------------------

/// One version of a key inside a sorted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The user key.
    pub key: String,

    /// The value written at `seq`.
    pub value: String,

    /// Sequence number assigned by the engine when the version was written.
    pub seq: u64,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, seq: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            seq,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// SortedRun
// ------------------------------------------------------------------------------------------------

/// An immutable, key-sorted entry collection belonging to one table.
#[derive(Debug)]
pub struct SortedRun {
    id: u64,
    entries: Vec<Entry>,
    max_seq: u64,
}

impl SortedRun {
    /// Builds a run from entries in any order.
    ///
    /// Entries are sorted by `(key ASC, seq DESC)`. Several versions of the
    /// same key may coexist.
    pub fn new(id: u64, mut entries: Vec<Entry>) -> Self {
        entries.sort_by(|a, b| a.key.cmp(&b.key).then(b.seq.cmp(&a.seq)));
        let max_seq = entries.iter().map(|e| e.seq).max().unwrap_or(0);
        Self {
            id,
            entries,
            max_seq,
        }
    }

    /// Builds a run from memtable output, tagging every pair with `seq`.
    ///
    /// `pairs` must already be in strictly ascending key order, which is
    /// what [`Memtable::entries`](crate::Memtable::entries) returns.
    pub fn from_sorted_pairs(id: u64, seq: u64, pairs: Vec<(String, String)>) -> Self {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        let entries = pairs
            .into_iter()
            .map(|(key, value)| Entry { key, value, seq })
            .collect::<Vec<_>>();
        let max_seq = if entries.is_empty() { 0 } else { seq };
        Self {
            id,
            entries,
            max_seq,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Highest sequence number of any entry, `0` when empty.
    pub fn max_seq(&self) -> u64 {
        self.max_seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in `(key ASC, seq DESC)` order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Returns the newest version of `key` whose sequence number is at most
    /// `ceiling`.
    pub fn get(&self, key: &str, ceiling: u64) -> Option<&Entry> {
        let start = self.entries.partition_point(|e| e.key.as_str() < key);
        self.entries[start..]
            .iter()
            .take_while(|e| e.key == key)
            .find(|e| e.seq <= ceiling)
    }
}

// ------------------------------------------------------------------------------------------------
// Multi-run lookup
// ------------------------------------------------------------------------------------------------

/// Orders runs newest first (`max_seq` descending), the order
/// [`find_visible`] expects.
pub fn sort_newest_first(runs: &mut [Arc<SortedRun>]) {
    runs.sort_by_key(|run| Reverse(run.max_seq()));
}

/// Resolves `key` across several runs.
///
/// Among all versions with `seq <= ceiling`, the one with the **highest**
/// sequence number wins, whichever run holds it. On equal sequence numbers
/// the run listed first wins.
///
/// `runs` must be ordered by `max_seq` descending (see
/// [`sort_newest_first`]). Once a run's `max_seq` is no greater than the
/// best sequence number found so far, neither it nor any later run can hold
/// a newer version, so the scan stops there.
pub fn find_visible<'a>(runs: &'a [Arc<SortedRun>], key: &str, ceiling: u64) -> Option<&'a Entry> {
    let mut best: Option<&'a Entry> = None;

    for run in runs {
        if best.is_some_and(|found| run.max_seq() <= found.seq) {
            break;
        }

        let Some(candidate) = run.get(key, ceiling) else {
            continue;
        };
        if best.is_none_or(|found| candidate.seq > found.seq) {
            best = Some(candidate);
        }
    }

    best
}
