
use crate::skiplist::{DEFAULT_FLUSH_THRESHOLD, DEFAULT_MAX_LEVEL, SkipList};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// String list with default limits and a fixed seed.
pub(crate) fn seeded(seed: u64) -> SkipList<String, String> {
    SkipList::with_rng(
        DEFAULT_MAX_LEVEL,
        DEFAULT_FLUSH_THRESHOLD,
        StdRng::seed_from_u64(seed),
    )
}

pub(crate) fn key(i: usize) -> String {
    format!("key_{i:05}")
}
