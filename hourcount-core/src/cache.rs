//! Per-source hours cache.
//!
//! Maps a source URL to the hours last computed for it. Entries live in
//! process memory only and are overwritten, never expired. Runs commit their
//! results through a generation check so that a slow run that was superseded
//! by a newer one cannot overwrite fresher values.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// Identifier of one aggregation run. Later runs have larger generations.
pub type Generation = u64;

#[derive(Debug, Default)]
pub struct HoursCache {
    entries: Mutex<HashMap<String, f64>>,
    latest_generation: AtomicU64,
}

impl HoursCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<f64> {
        self.entries.lock().get(url).copied()
    }

    pub fn put(&self, url: &str, hours: f64) {
        self.entries.lock().insert(url.to_string(), hours);
    }

    /// Overwrite-union: keys in `partial` replace existing entries, other
    /// entries are left untouched.
    pub fn merge_all(&self, partial: &HashMap<String, f64>) {
        let mut entries = self.entries.lock();
        merge_into(&mut entries, partial);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new run. Any run started earlier becomes superseded.
    pub fn begin_run(&self) -> Generation {
        self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_generation(&self) -> Generation {
        self.latest_generation.load(Ordering::SeqCst)
    }

    /// Merge `partial` only if `generation` is still the latest run.
    /// Returns whether the results were kept.
    pub fn commit(&self, generation: Generation, partial: &HashMap<String, f64>) -> bool {
        let mut entries = self.entries.lock();

        let latest = self.latest_generation();
        if generation != latest {
            debug!(generation, latest, "discarding results of superseded run");
            return false;
        }

        merge_into(&mut entries, partial);
        debug!(generation, count = partial.len(), "committed run results");
        true
    }
}

fn merge_into(entries: &mut HashMap<String, f64>, partial: &HashMap<String, f64>) {
    for (url, hours) in partial {
        entries.insert(url.clone(), *hours);
    }
}
