//! # Skip List
//!
//! A probabilistically balanced ordered map used as the memtable index.
//!
//! Nodes live in an arena (`Vec`) and forward links are arena indices, so
//! unlinking a node can never leave a dangling pointer behind: a freed slot
//! is simply parked on a free list and reused by the next insert.
//!
//! ```text
//!  head[3] ─────────────────────────────► d ─────────────► ∅
//!  head[2] ──────────► b ───────────────► d ─────────────► ∅
//!  head[1] ──────────► b ──────► c ─────► d ──────► e ───► ∅
//!  head[0] ──► a ────► b ──────► c ─────► d ──────► e ───► ∅
//! ```
//!
//! The header is not a node: it is a plain array of `max_level + 1` links
//! owned by the list, so it has no key and cannot collide with caller keys.
//!
//! Node heights are drawn from a geometric distribution (p = 0.5) using an
//! injected random source. Seeding that source makes the whole layout
//! reproducible, which the structural tests rely on.

// ------------------------------------------------------------------------------------------------
// Unit tests
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests;

// ------------------------------------------------------------------------------------------------
// Includes
// ------------------------------------------------------------------------------------------------

use std::borrow::Borrow;
use std::fmt;
use std::iter::FusedIterator;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::Config;

// ------------------------------------------------------------------------------------------------
// Constants
// ------------------------------------------------------------------------------------------------

/// Default highest level index a node may be promoted to.
pub const DEFAULT_MAX_LEVEL: usize = 6;

/// Default number of live entries at which [`SkipList::is_full`] reports true.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 50;

/// Probability that a node is promoted one more level.
pub const PROMOTION_PROBABILITY: f64 = 0.5;

/// Upper bound accepted for a configured maximum level.
pub const MAX_LEVEL_LIMIT: usize = 32;

// ------------------------------------------------------------------------------------------------
// Node storage
// ------------------------------------------------------------------------------------------------

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    /// One link per level, `forward.len() == level + 1`.
    forward: Vec<Option<NodeId>>,
}

/// Position during a descent: either the header or a real node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Head,
    Node(NodeId),
}

// ------------------------------------------------------------------------------------------------
// SkipList
// ------------------------------------------------------------------------------------------------

/// An ordered map with expected `O(log n)` insert, search and delete.
///
/// `R` is the random source used to draw node levels. Production code uses
/// the default [`StdRng`]; tests inject a seeded generator.
pub struct SkipList<K, V, R = StdRng> {
    /// Node arena. `None` marks a slot freed by `delete`.
    nodes: Vec<Option<Node<K, V>>>,

    /// Vacant arena slots, reused before the arena grows.
    free: Vec<NodeId>,

    /// Header links, one per possible level.
    head: Vec<Option<NodeId>>,

    /// Highest level currently in use (0-indexed).
    level: usize,

    /// Number of live entries.
    len: usize,

    /// Highest level a node may be promoted to.
    max_level: usize,

    /// Live entry count at which the list reports itself full.
    flush_threshold: usize,

    rng: R,
}

impl<K, V> SkipList<K, V, StdRng> {
    /// Creates an empty list with default limits and an OS-seeded generator.
    pub fn new() -> Self {
        Self::with_rng(
            DEFAULT_MAX_LEVEL,
            DEFAULT_FLUSH_THRESHOLD,
            StdRng::from_os_rng(),
        )
    }

    /// Creates an empty list from a validated [`Config`].
    ///
    /// A configured seed makes level selection deterministic.
    pub fn from_config(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config.max_level, config.flush_threshold, rng)
    }
}

impl<K, V> Default for SkipList<K, V, StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, R> SkipList<K, V, R> {
    /// Creates an empty list drawing levels from `rng`.
    ///
    /// # Panics
    ///
    /// Panics if `max_level` exceeds [`MAX_LEVEL_LIMIT`].
    pub fn with_rng(max_level: usize, flush_threshold: usize, rng: R) -> Self {
        assert!(
            max_level <= MAX_LEVEL_LIMIT,
            "max_level {max_level} exceeds limit {MAX_LEVEL_LIMIT}"
        );
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: vec![None; max_level + 1],
            level: 0,
            len: 0,
            max_level,
            flush_threshold,
            rng,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Highest level currently linked from the header.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Returns `true` once the live entry count reaches the flush threshold.
    pub fn is_full(&self) -> bool {
        self.len >= self.flush_threshold
    }

    /// Discards every node and returns to the empty state.
    ///
    /// The random source is kept, so a seeded list stays reproducible
    /// across resets.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head.fill(None);
        self.level = 0;
        self.len = 0;
    }

    /// Borrowing iterator over live pairs in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            next: self.head[0],
            remaining: self.len,
        }
    }

    // --------------------------------------------------------------------------------------------
    // Link helpers
    // --------------------------------------------------------------------------------------------

    fn node(&self, id: NodeId) -> &Node<K, V> {
        match self.nodes[id].as_ref() {
            Some(node) => node,
            None => unreachable!("skiplist link points at vacant slot {id}"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match self.nodes[id].as_mut() {
            Some(node) => node,
            None => unreachable!("skiplist link points at vacant slot {id}"),
        }
    }

    fn forward(&self, from: Link, level: usize) -> Option<NodeId> {
        match from {
            Link::Head => self.head[level],
            Link::Node(id) => self.node(id).forward[level],
        }
    }

    fn set_forward(&mut self, from: Link, level: usize, to: Option<NodeId>) {
        match from {
            Link::Head => self.head[level] = to,
            Link::Node(id) => self.node_mut(id).forward[level] = to,
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }
}

impl<K: Ord, V, R> SkipList<K, V, R> {
    /// Walks right on `level` from `from` while the next key is strictly
    /// less than `key`, returning the last position visited.
    fn advance<Q>(&self, mut from: Link, level: usize, key: &Q) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        while let Some(next) = self.forward(from, level) {
            if self.node(next).key.borrow() < key {
                from = Link::Node(next);
            } else {
                break;
            }
        }
        from
    }

    /// Descends from the top level, recording the rightmost position
    /// before `key` on every level in `update`.
    fn find_predecessors<Q>(&self, key: &Q, update: &mut [Link]) -> Link
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut x = Link::Head;
        for level in (0..=self.level).rev() {
            x = self.advance(x, level, key);
            update[level] = x;
        }
        x
    }

    /// Looks up `key`.
    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut x = Link::Head;
        for level in (0..=self.level).rev() {
            x = self.advance(x, level, key);
        }

        let candidate = self.node(self.forward(x, 0)?);
        if candidate.key.borrow() == key {
            Some(&candidate.value)
        } else {
            None
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(key).is_some()
    }

    /// Removes `key`. Returns `false` if it was not present.
    pub fn delete<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut update = vec![Link::Head; self.max_level + 1];
        let x = self.find_predecessors(key, &mut update);

        let target = match self.forward(x, 0) {
            Some(id) if self.node(id).key.borrow() == key => id,
            _ => return false,
        };

        for level in 0..=self.level {
            // Levels above the node's height were never linked through it.
            if self.forward(update[level], level) != Some(target) {
                break;
            }
            let next = self.node(target).forward[level];
            self.set_forward(update[level], level, next);
        }

        while self.level > 0 && self.head[self.level].is_none() {
            self.level -= 1;
            debug!(level = self.level, "skiplist level lowered");
        }

        self.nodes[target] = None;
        self.free.push(target);
        self.len -= 1;

        true
    }
}

impl<K: Ord, V, R: Rng> SkipList<K, V, R> {
    /// Draws a node level: each promotion succeeds with probability 0.5,
    /// capped at `max_level`.
    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < self.max_level && self.rng.random_bool(PROMOTION_PROBABILITY) {
            level += 1;
        }
        level
    }

    /// Inserts or replaces a pair.
    ///
    /// An existing key keeps its node and its level; only the value is
    /// swapped and the previous one is returned. A new key gets a freshly
    /// drawn level and is spliced into every level up to it.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut update = vec![Link::Head; self.max_level + 1];
        let x = self.find_predecessors(&key, &mut update);

        if let Some(id) = self.forward(x, 0) {
            let node = self.node_mut(id);
            if node.key == key {
                return Some(std::mem::replace(&mut node.value, value));
            }
        }

        let level = self.random_level();
        if level > self.level {
            // `update` above the old top level already points at the header.
            debug!(from = self.level, to = level, "skiplist level raised");
            self.level = level;
        }

        let forward = (0..=level).map(|l| self.forward(update[l], l)).collect();
        let id = self.alloc(Node {
            key,
            value,
            forward,
        });
        for (l, &prev) in update.iter().enumerate().take(level + 1) {
            self.set_forward(prev, l, Some(id));
        }

        self.len += 1;
        trace!(level, len = self.len, "skiplist insert");

        None
    }
}

impl<K: Clone, V: Clone, R> SkipList<K, V, R> {
    /// All live pairs in ascending key order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Builds an independent copy by re-inserting every pair in key order.
///
/// The copy starts from a clone of the random source, so its node levels
/// are redrawn rather than copied; only the contents are guaranteed equal.
impl<K: Ord + Clone, V: Clone, R: Rng + Clone> Clone for SkipList<K, V, R> {
    fn clone(&self) -> Self {
        let mut copy = Self::with_rng(self.max_level, self.flush_threshold, self.rng.clone());
        for (key, value) in self.iter() {
            copy.insert(key.clone(), value.clone());
        }
        copy
    }
}

impl<K: fmt::Debug, V: fmt::Debug, R> fmt::Debug for SkipList<K, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, R> IntoIterator for &'a SkipList<K, V, R> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ------------------------------------------------------------------------------------------------
// Iterator
// ------------------------------------------------------------------------------------------------

/// Level-0 walk over a [`SkipList`], in ascending key order.
pub struct Iter<'a, K, V> {
    nodes: &'a [Option<Node<K, V>>],
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes[self.next?].as_ref()?;
        self.next = node.forward[0];
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

// ------------------------------------------------------------------------------------------------
// Structural checks (tests only)
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
impl<K: Ord + fmt::Debug, V, R> SkipList<K, V, R> {
    /// Verifies every structural invariant, returning a description of the
    /// first violation found.
    pub(crate) fn check_invariants(&self) -> Result<(), String> {
        use std::collections::HashSet;

        let mut below: Option<HashSet<NodeId>> = None;
        for level in 0..=self.max_level {
            let mut seen = HashSet::new();
            let mut prev: Option<&K> = None;
            let mut cursor = self.head[level];

            while let Some(id) = cursor {
                let node = self.nodes[id]
                    .as_ref()
                    .ok_or_else(|| format!("level {level}: link to vacant slot {id}"))?;
                if node.forward.len() <= level {
                    return Err(format!("level {level}: node {:?} is too short", node.key));
                }
                if prev.is_some_and(|p| p >= &node.key) {
                    return Err(format!("level {level}: {:?} not after {:?}", node.key, prev));
                }
                if below.as_ref().is_some_and(|lower| !lower.contains(&id)) {
                    return Err(format!("level {level}: {:?} missing below", node.key));
                }
                seen.insert(id);
                prev = Some(&node.key);
                cursor = node.forward[level];
            }

            if level == 0 && seen.len() != self.len {
                return Err(format!("len {} but {} nodes on level 0", self.len, seen.len()));
            }
            if level > self.level && !seen.is_empty() {
                return Err(format!("level {level} is populated above level {}", self.level));
            }
            below = Some(seen);
        }
        Ok(())
    }

    /// Number of live nodes whose height reaches each level.
    pub(crate) fn level_histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; self.max_level + 1];
        for node in self.nodes.iter().flatten() {
            for slot in histogram.iter_mut().take(node.forward.len()) {
                *slot += 1;
            }
        }
        histogram
    }
}
