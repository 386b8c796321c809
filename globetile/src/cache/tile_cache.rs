//! Generational tile cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::expiring::ExpiringStore;
use super::object::CachedTile;
use super::reclaim::Reclaimer;
use super::{CacheConfig, CacheStats};
use crate::coord::TileAddress;

struct Buckets {
    /// Used or saved during the current pass
    active: HashMap<TileAddress, CachedTile>,
    /// Used during the previous pass
    backup: HashMap<TileAddress, CachedTile>,
    /// Never demoted
    endless: HashMap<TileAddress, CachedTile>,
    expiring: ExpiringStore,
}

/// Bounded, multi-generation store of decoded tiles.
///
/// Safe to share between the render thread and loader workers.
pub struct TileCache {
    buckets: Mutex<Buckets>,
    config: CacheConfig,
    reclaimer: Arc<Reclaimer>,
    last_active_count: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    rejected: AtomicU64,
}

impl TileCache {
    /// Creates a cache with its own reclaim thread.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_reclaimer(config, Arc::new(Reclaimer::new()))
    }

    /// Creates a cache that releases evicted generations through `reclaimer`.
    pub fn with_reclaimer(config: CacheConfig, reclaimer: Arc<Reclaimer>) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                active: HashMap::new(),
                backup: HashMap::new(),
                endless: HashMap::new(),
                expiring: ExpiringStore::new(config.expiry, config.max_count),
            }),
            config,
            reclaimer,
            last_active_count: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Looks up a tile.
    ///
    /// Hits in the backup or expiring generations are moved into the active
    /// generation while it has room.
    pub fn get(&self, address: &TileAddress) -> Option<CachedTile> {
        let max = self.config.max_count;
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        buckets.expiring.expire(Instant::now(), &self.reclaimer);

        let found = if let Some(tile) = buckets.active.get(address) {
            Some(tile.clone())
        } else if let Some(tile) = buckets.endless.get(address) {
            Some(tile.clone())
        } else if buckets.active.len() >= max {
            // No room to promote; serve the hit from where it is.
            buckets
                .backup
                .get(address)
                .cloned()
                .or_else(|| buckets.expiring.peek(address))
        } else if let Some(tile) = buckets.backup.remove(address) {
            buckets.active.insert(address.clone(), tile.clone());
            Some(tile)
        } else if let Some(tile) = buckets.expiring.take(address) {
            buckets.active.insert(address.clone(), tile.clone());
            Some(tile)
        } else {
            None
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Stores a tile.
    ///
    /// New entries go to the active generation, so they are still in backup
    /// after the next `end_step`. With `endless` set they go to the endless
    /// bucket instead. An address already held in the endless bucket is
    /// replaced there whatever `endless` says.
    ///
    /// # Returns
    ///
    /// `false` if the target bucket is full; the cache is then unchanged.
    pub fn save(&self, address: &TileAddress, tile: CachedTile, endless: bool) -> bool {
        let max = self.config.max_count;
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        buckets.expiring.expire(Instant::now(), &self.reclaimer);

        let to_endless = endless || buckets.endless.contains_key(address);
        let target = if to_endless {
            &mut buckets.endless
        } else {
            &mut buckets.active
        };

        if !target.contains_key(address) && target.len() >= max {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                address = %address,
                endless = to_endless,
                max,
                "Cache bucket full, save rejected"
            );
            return false;
        }
        target.insert(address.clone(), tile);
        if to_endless {
            buckets.active.remove(address);
        }
        buckets.backup.remove(address);
        buckets.expiring.remove(address);
        true
    }

    /// Advances the cache by one render pass.
    ///
    /// The previous backup generation is demoted to the expiring store and the
    /// active generation becomes the new backup.
    pub fn end_step(&self) {
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        let active_count = buckets.active.len();
        self.last_active_count.store(active_count, Ordering::Relaxed);

        let demoted = std::mem::replace(
            &mut buckets.backup,
            std::mem::take(&mut buckets.active),
        );
        buckets.expiring.absorb(demoted, &self.reclaimer);
        buckets.expiring.expire(Instant::now(), &self.reclaimer);

        tracing::trace!(
            active = active_count,
            backup = buckets.backup.len(),
            expiring = buckets.expiring.len(),
            "Cache step"
        );
    }

    /// Empties every bucket. Memory is released on the reclaim thread.
    pub fn clear(&self) {
        let mut guard = self.buckets.lock();
        let buckets = &mut *guard;
        self.reclaimer.dispose(std::mem::take(&mut buckets.active));
        self.reclaimer.dispose(std::mem::take(&mut buckets.backup));
        self.reclaimer.dispose(std::mem::take(&mut buckets.endless));
        buckets.expiring.clear(&self.reclaimer);
        self.last_active_count.store(0, Ordering::Relaxed);
    }

    /// Size of the active generation at the last `end_step`.
    pub fn last_active_count(&self) -> usize {
        self.last_active_count.load(Ordering::Relaxed)
    }

    /// Configured per-bucket capacity.
    pub fn max_active_count(&self) -> usize {
        self.config.max_count
    }

    /// True when the last pass used as many tiles as the cache can hold.
    pub fn is_saturated(&self) -> bool {
        self.last_active_count() >= self.max_active_count()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns a snapshot of counters and bucket sizes.
    pub fn stats(&self) -> CacheStats {
        let buckets = self.buckets.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            rejected_saves: self.rejected.load(Ordering::Relaxed),
            active: buckets.active.len(),
            backup: buckets.backup.len(),
            endless: buckets.endless.len(),
            expiring: buckets.expiring.len(),
        }
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("config", &self.config)
            .field("last_active_count", &self.last_active_count())
            .finish()
    }
}
