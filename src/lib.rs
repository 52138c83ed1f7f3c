//! # MangoDB memtable
//!
//! The in-memory write buffer of a **Log-Structured Merge Tree (LSM-tree)**
//! storage engine, together with the snapshot reads that give a reader a
//! consistent view across the buffer and the immutable sorted tables
//! already flushed from it.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use mangodb::{Config, Engine, MemorySink};
//!
//! let engine = Engine::open(Config::default(), Arc::new(MemorySink::new())).unwrap();
//!
//! engine.put("hello", "world").unwrap();
//!
//! // Take a point-in-time view, then keep writing.
//! let mut snapshot = engine.snapshot().unwrap();
//! engine.put("hello", "there").unwrap();
//!
//! assert_eq!(snapshot.get("hello").unwrap(), Some("world".to_string()));
//! assert_eq!(engine.get("hello").unwrap(), Some("there".to_string()));
//!
//! snapshot.release();
//! ```
//!
//! ## Layers
//!
//! - [`skiplist`]: the ordered index: an arena-backed skip list with an
//!   injectable random source.
//! - [`memtable`]: the skip list behind a read-write lock, with a
//!   fullness threshold and a reset hook for the flush lifecycle.
//! - [`table`]: the read-only entry collections of flushed tables.
//! - [`snapshot`]: point-in-time views: a private memtable clone plus
//!   sorted runs filtered by a sequence ceiling.
//! - [`engine`]: ties the layers together: sequence numbers, flushing
//!   through a [`TableSink`], and snapshot capture.

pub mod engine;
pub mod memtable;
pub mod skiplist;
pub mod snapshot;
pub mod table;

pub use engine::{Engine, EngineError, MemorySink, TableSink};
pub use memtable::{Memtable, MemtableError};
pub use skiplist::SkipList;
pub use snapshot::{SnapshotError, SnapshotView};
pub use table::{Entry, SortedRun};

use thiserror::Error;

use skiplist::{DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_LEVEL, MAX_LEVEL_LIMIT};

// ------------------------------------------------------------------------------------------------
// Configuration
// ------------------------------------------------------------------------------------------------

/// Configuration shared by the memtable and the engine.
///
/// All fields have sensible defaults via [`Config::default()`].
///
/// # Example
///
/// ```rust
/// use mangodb::Config;
///
/// // Reproducible layout, flush every 1000 entries.
/// let config = Config {
///     flush_threshold: 1000,
///     seed: Some(42),
///     ..Config::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Highest level index a skip list node may be promoted to.
    ///
    /// Default: 6. Must be in `1..=32`.
    pub max_level: usize,

    /// Number of live entries at which the memtable reports itself full
    /// and should be flushed.
    ///
    /// Default: 50. Must be ≥ 1.
    pub flush_threshold: usize,

    /// Seed for level selection. `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            seed: None,
        }
    }
}

impl Config {
    /// Validates all configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_level < 1 || self.max_level > MAX_LEVEL_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_level must be in 1..={MAX_LEVEL_LIMIT}"
            )));
        }
        if self.flush_threshold < 1 {
            return Err(ConfigError::Invalid(
                "flush_threshold must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// Error type
// ------------------------------------------------------------------------------------------------

/// Returned by [`Config::validate`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration parameter is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
