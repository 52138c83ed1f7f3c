use crate::Config;
use crate::engine::{Engine, TableSink};
use crate::table::SortedRun;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber controlled by `RUST_LOG` env var.
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Threshold large enough that tests never trigger a flush.
pub fn memtable_only_config() -> Config {
    init_tracing();
    Config {
        flush_threshold: 100_000,
        seed: Some(42),
        ..Config::default()
    }
}

/// Flushes after every four distinct keys.
pub fn small_threshold_config() -> Config {
    init_tracing();
    Config {
        flush_threshold: 4,
        seed: Some(42),
        ..Config::default()
    }
}

/// Sink that records every run and can be switched into a failing mode.
#[derive(Default)]
pub struct RecordingSink {
    pub written: Mutex<Vec<Arc<SortedRun>>>,
    pub attempts: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn written_ids(&self) -> Vec<u64> {
        self.written.lock().unwrap().iter().map(|r| r.id()).collect()
    }
}

impl TableSink for RecordingSink {
    fn write_table(&self, run: &Arc<SortedRun>) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::other("disk full"));
        }
        self.written.lock().unwrap().push(Arc::clone(run));
        Ok(())
    }
}

/// Opens an engine over a fresh [`RecordingSink`], returning both.
pub fn open_recording(config: Config) -> (Engine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let engine = Engine::open(config, Arc::clone(&sink) as Arc<dyn TableSink>).unwrap();
    (engine, sink)
}

pub fn key(i: usize) -> String {
    format!("key_{i:04}")
}

pub fn value(i: usize) -> String {
    format!("val_{i:04}")
}
