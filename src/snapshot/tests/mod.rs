mod tests_visibility;

use crate::Config;
use crate::memtable::Memtable;
use crate::table::{Entry, SortedRun};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn memtable() -> Memtable {
    init_tracing();
    Memtable::with_config(&Config {
        flush_threshold: 10_000,
        seed: Some(11),
        ..Config::default()
    })
    .unwrap()
}

pub(crate) fn run(id: u64, entries: &[(&str, &str, u64)]) -> Arc<SortedRun> {
    Arc::new(SortedRun::new(
        id,
        entries
            .iter()
            .map(|(k, v, seq)| Entry::new(*k, *v, *seq))
            .collect(),
    ))
}
