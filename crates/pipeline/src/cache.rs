//! The routine cache: bounded, least-recently-used, and at-most-one
//! compilation per fingerprint even under concurrent lookups. Workers for
//! different fingerprints never wait on each other; only the map itself is
//! briefly locked.

use crate::state::Fingerprint;
use lanewise_core::{Error, FastHashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

type Cell<T> = Arc<OnceLock<Result<Arc<T>, Error>>>;

struct Entry<T> {
    key: Fingerprint,
    cell: Cell<T>,
    last_use: u64,
}

pub struct RoutineCache<T> {
    capacity: usize,
    clock: AtomicU64,
    entries: Mutex<FastHashMap<u64, Entry<T>>>,
}

impl<T> RoutineCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            entries: Mutex::new(FastHashMap::default()),
        }
    }

    /// Fetch the routine for `key`, compiling it with `compile` if this is
    /// the first time the fingerprint is seen (or it was evicted). When
    /// several threads race on the same fingerprint, exactly one runs
    /// `compile`; the rest block on its cell and share the result. Failed
    /// compiles are memoized too: a broken shader is broken every time.
    pub fn get_or_compile(
        &self,
        key: &Fingerprint,
        compile: impl FnOnce() -> Result<T, Error>,
    ) -> Result<Arc<T>, Error> {
        let cell = {
            let mut entries = self.entries.lock().expect("routine cache poisoned");
            let now = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(entry) = entries.get_mut(&key.hash64()) {
                // a matching hash with a different key would hand a draw
                // the wrong routine; that is an internal-consistency
                // failure, not a recoverable condition
                assert!(
                    entry.key == *key,
                    "fingerprint hash collision: {:?} vs {:?}",
                    entry.key,
                    key
                );
                entry.last_use = now;
                entry.cell.clone()
            } else {
                if entries.len() >= self.capacity {
                    Self::evict(&mut entries);
                }
                let cell: Cell<T> = Arc::new(OnceLock::new());
                entries.insert(
                    key.hash64(),
                    Entry {
                        key: *key,
                        cell: cell.clone(),
                        last_use: now,
                    },
                );
                cell
            }
            // the map unlocks here, before any compilation runs
        };

        cell.get_or_init(|| compile().map(Arc::new)).clone()
    }

    /// Drop the entry with the oldest use stamp.
    fn evict(entries: &mut FastHashMap<u64, Entry<T>>) {
        if let Some(oldest) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_use)
            .map(|(hash, _)| *hash)
        {
            entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("routine cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
