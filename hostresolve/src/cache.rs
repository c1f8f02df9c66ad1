//! Process-wide positive cache (spec section 4.4 `CacheEntry`, section 3).
//!
//! Grounded on `ytflow::plugin::host_resolver::HostResolver`'s
//! `parking_lot::Mutex<LruCache<..>>` pair, generalized to carry a
//! timestamp and a single address list rather than one IP-to-name entry.
//! Cache size and eviction bookkeeping constants are grounded on
//! `original_source`'s `CFHost.c`: `_kCFHostCacheMaxEntries` /
//! `_kCFHostCacheTimeout`, and `_ExpireCacheEntries`'s "evict at most one
//! oldest entry" behavior (see DESIGN.md Open Questions).

use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::address::Address;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub addresses: Vec<Address>,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

pub struct Cache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl Cache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = std::num::NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up `name`, evicting it first if it has aged past `ttl`
    /// (spec section 8: "an entry older than CacheTtl is never returned
    /// by the cache path; it is evicted on the next cache-consulting
    /// operation").
    pub fn get(&self, name: &str) -> Option<Vec<Address>> {
        let mut guard = self.entries.lock();
        if let Some(entry) = guard.peek(name) {
            if entry.is_expired(self.ttl) {
                guard.pop(name);
                return None;
            }
        } else {
            return None;
        }
        guard.get(name).map(|entry| entry.addresses.clone())
    }

    /// Insert or refresh `name`'s entry. If the cache is at capacity, the
    /// insertion may push out the single oldest entry (`LruCache::put`
    /// already evicts at most one entry per call — the same "evict one,
    /// not to a watermark" policy `_ExpireCacheEntries` implements).
    pub fn insert(&self, name: String, addresses: Vec<Address>) {
        self.entries.lock().put(
            name,
            CacheEntry {
                addresses,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, name: &str) {
        self.entries.lock().pop(name);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Family;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::thread::sleep;

    fn addr() -> Address {
        Address {
            family: Family::Ipv4,
            addr: SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0),
            canonical_name: None,
        }
    }

    #[test]
    fn hit_then_expiry() {
        let cache = Cache::new(8, Duration::from_millis(20));
        cache.insert("a.test".into(), vec![addr()]);
        assert!(cache.get("a.test").is_some());
        sleep(Duration::from_millis(30));
        assert!(cache.get("a.test").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn bounded_capacity_evicts_lru() {
        let cache = Cache::new(2, Duration::from_secs(60));
        cache.insert("a.test".into(), vec![addr()]);
        cache.insert("b.test".into(), vec![addr()]);
        cache.insert("c.test".into(), vec![addr()]);
        assert!(cache.len() <= 2);
        assert!(cache.get("a.test").is_none());
        assert!(cache.get("c.test").is_some());
    }
}
