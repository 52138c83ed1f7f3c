mod tests_snapshot_index;

use crate::Config;
use crate::memtable::Memtable;
use tracing::Level;
use tracing_subscriber::fmt::Subscriber;

pub(crate) fn init_tracing() {
    let _ = Subscriber::builder()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Seeded memtable with the given flush threshold.
pub(crate) fn memtable_with_threshold(flush_threshold: usize) -> Memtable {
    init_tracing();
    Memtable::with_config(&Config {
        flush_threshold,
        seed: Some(7),
        ..Config::default()
    })
    .unwrap()
}
