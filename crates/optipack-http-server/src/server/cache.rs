use optipack::Allocation;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Bounded cache of allocations, keyed by item count and scoped to a single
/// catalog version.
///
/// Entries computed against an older catalog are useless after a replace,
/// so the whole map is dropped the first time a newer version is seen.
/// Within a version the map is capped at `capacity`; past that, an
/// arbitrary entry is evicted per insert.
#[derive(Debug)]
pub struct ResultsCache {
    capacity: usize,
    shard: Mutex<Shard>,
}

#[derive(Debug, Default)]
struct Shard {
    version: u64,
    entries: HashMap<u64, Arc<Allocation>>,
}

impl ResultsCache {
    /// `capacity` must be at least 1; enforced at config validation.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shard: Mutex::new(Shard::default()),
        }
    }

    pub fn get(&self, version: u64, items: u64) -> Option<Arc<Allocation>> {
        let shard = self.shard.lock();
        if shard.version != version {
            return None;
        }
        shard.entries.get(&items).map(Arc::clone)
    }

    pub fn insert(&self, version: u64, items: u64, allocation: Arc<Allocation>) {
        let mut shard = self.shard.lock();
        if shard.version != version {
            shard.version = version;
            shard.entries.clear();
        }
        if shard.entries.len() >= self.capacity && !shard.entries.contains_key(&items) {
            if let Some(&evict) = shard.entries.keys().next() {
                shard.entries.remove(&evict);
            }
        }
        shard.entries.insert(items, allocation);
    }

    pub fn len(&self) -> usize {
        self.shard.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
