//! In-memory issue detail cache.
//!
//! Memoizes issue detail documents by locator so that reading several fields
//! of one issue costs a single request. Features include:
//! - Bounded capacity with LRU eviction (recency bumped on insert and lookup)
//! - Single-flight fetches: concurrent lookups of one locator share one request
//! - No negative caching: a failed fetch stores nothing and frees its slot
//! - Slots with a fetch in flight are never evicted

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, trace};

use crate::api::error::{ApiError, Result};
use crate::api::{DetailDocument, Method, Params, Transport};

/// Default number of detail documents kept.
pub const DEFAULT_CACHE_CAPACITY: usize = 6;

type Slot = Arc<OnceCell<Arc<DetailDocument>>>;

/// LRU memoization of detail fetches, shared by all resolver workers.
pub struct DetailCache {
    transport: Arc<dyn Transport>,
    capacity: usize,
    /// Least recently used first.
    slots: Mutex<IndexMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DetailCache {
    /// Create a cache holding at most `capacity` documents (minimum one).
    pub fn new(transport: Arc<dyn Transport>, capacity: usize) -> Self {
        Self {
            transport,
            capacity: capacity.max(1),
            slots: Mutex::new(IndexMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get the detail document at `locator`, fetching it on a miss.
    ///
    /// Concurrent callers for the same locator wait on a single fetch; callers
    /// for different locators never block each other beyond the brief map lock.
    ///
    /// # Errors
    ///
    /// Propagates the transport error of a failed fetch. Nothing is stored and
    /// the slot is released, so the next call for the same locator fetches again.
    #[instrument(skip(self))]
    pub async fn get(&self, locator: &str) -> Result<Arc<DetailDocument>> {
        let slot = self.slot(locator);

        if let Some(doc) = slot.get() {
            trace!("Cache hit");
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(doc));
        }

        let result = slot
            .get_or_try_init(|| async {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.fetch(locator).await.map(Arc::new)
            })
            .await
            .map(Arc::clone);

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if result.is_err() {
            self.discard_failed(&mut slots, locator, &slot);
        }
        self.evict_over_capacity(&mut slots);

        result
    }

    /// Find or create the slot for `locator` and mark it most recently used.
    fn slot(&self, locator: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(slot) = slots.shift_remove(locator) {
            slots.insert(locator.to_string(), Arc::clone(&slot));
            return slot;
        }

        let slot: Slot = Arc::new(OnceCell::new());
        slots.insert(locator.to_string(), Arc::clone(&slot));
        self.evict_over_capacity(&mut slots);

        slot
    }

    /// Drop least recently used documents until within capacity.
    ///
    /// Slots with a fetch in flight are never evicted, so the map may stay
    /// over capacity until those fetches settle.
    fn evict_over_capacity(&self, slots: &mut IndexMap<String, Slot>) {
        while slots.len() > self.capacity {
            let Some(index) = slots.values().position(|slot| slot.initialized()) else {
                trace!("All {} slots in flight, deferring eviction", slots.len());
                break;
            };
            if let Some((evicted, _)) = slots.shift_remove_index(index) {
                debug!("Evicted {} from detail cache", evicted);
            }
        }
    }

    /// Remove the empty slot left by a failed fetch.
    ///
    /// A slot still shared with a waiting caller stays; that caller retries
    /// the fetch in it.
    fn discard_failed(&self, slots: &mut IndexMap<String, Slot>, locator: &str, slot: &Slot) {
        let Some(held) = slots.get(locator) else {
            return;
        };
        // One reference in the map, one here.
        if Arc::ptr_eq(held, slot) && !held.initialized() && Arc::strong_count(slot) <= 2 {
            slots.shift_remove(locator);
            trace!("Dropped failed slot for {}", locator);
        }
    }

    async fn fetch(&self, locator: &str) -> Result<DetailDocument> {
        debug!("Cache miss, fetching {}", locator);

        let value = self
            .transport
            .send(Method::Get, locator, &Params::new())
            .await?;

        serde_json::from_value(value).map_err(|e| {
            ApiError::InvalidResponse(format!("Malformed issue document at {}: {}", locator, e))
        })
    }

    /// Whether a fetched document for `locator` is currently held.
    pub fn contains(&self, locator: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(locator)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Number of slots currently held.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Slots currently held.
    pub entries: usize,
    /// Maximum slots.
    pub capacity: usize,
    /// Lookups answered without a fetch.
    pub hits: u64,
    /// Lookups that started a fetch.
    pub misses: u64,
}

impl CacheStats {
    /// Get the hit rate as a percentage.
    pub fn hit_percent(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
