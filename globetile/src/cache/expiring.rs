//! Time-bounded overflow store.
//!
//! Entries live in two generations. Every `expiry` interval the older
//! generation is released and the current one becomes the older one, so an
//! entry that is not promoted survives between one and two intervals.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::object::CachedTile;
use super::reclaim::Reclaimer;
use crate::coord::TileAddress;

pub(crate) struct ExpiringStore {
    current: HashMap<TileAddress, CachedTile>,
    old: HashMap<TileAddress, CachedTile>,
    expiry: Duration,
    max_count: usize,
    rotated_at: Instant,
}

impl ExpiringStore {
    pub(crate) fn new(expiry: Duration, max_count: usize) -> Self {
        Self {
            current: HashMap::new(),
            old: HashMap::new(),
            expiry,
            max_count,
            rotated_at: Instant::now(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.current.len() + self.old.len()
    }

    /// Releases generations whose time is up.
    pub(crate) fn expire(&mut self, now: Instant, reclaimer: &Reclaimer) {
        let elapsed = now.saturating_duration_since(self.rotated_at);
        if elapsed < self.expiry {
            return;
        }
        if elapsed >= self.expiry * 2 {
            reclaimer.dispose(std::mem::take(&mut self.old));
            reclaimer.dispose(std::mem::take(&mut self.current));
        } else {
            self.rotate(reclaimer);
        }
        self.rotated_at = now;
    }

    fn rotate(&mut self, reclaimer: &Reclaimer) {
        let old = std::mem::replace(&mut self.old, std::mem::take(&mut self.current));
        if !old.is_empty() {
            reclaimer.dispose(old);
        }
    }

    /// Removes and returns an entry.
    pub(crate) fn take(&mut self, address: &TileAddress) -> Option<CachedTile> {
        self.current
            .remove(address)
            .or_else(|| self.old.remove(address))
    }

    pub(crate) fn peek(&self, address: &TileAddress) -> Option<CachedTile> {
        self.current
            .get(address)
            .or_else(|| self.old.get(address))
            .cloned()
    }

    pub(crate) fn remove(&mut self, address: &TileAddress) {
        self.current.remove(address);
        self.old.remove(address);
    }

    /// Absorbs a demoted generation.
    ///
    /// Older generations are dropped until the new one fits. Entries beyond
    /// the capacity are released.
    pub(crate) fn absorb(
        &mut self,
        mut generation: HashMap<TileAddress, CachedTile>,
        reclaimer: &Reclaimer,
    ) {
        if generation.is_empty() {
            return;
        }
        while self.len() > 0 && self.len() + generation.len() > self.max_count {
            self.rotate(reclaimer);
        }
        for (address, tile) in generation.drain() {
            if self.current.len() + self.old.len() >= self.max_count {
                break;
            }
            self.old.remove(&address);
            self.current.insert(address, tile);
        }
        if !generation.is_empty() {
            reclaimer.dispose(generation);
        }
    }

    pub(crate) fn clear(&mut self, reclaimer: &Reclaimer) {
        reclaimer.dispose(std::mem::take(&mut self.current));
        reclaimer.dispose(std::mem::take(&mut self.old));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileLocation;

    fn addr(c: u32) -> TileAddress {
        TileAddress::new(TileLocation::new(5, c, 0))
    }

    fn generation(range: std::ops::Range<u32>) -> HashMap<TileAddress, CachedTile> {
        range.map(|c| (addr(c), CachedTile::Absent)).collect()
    }

    #[test]
    fn test_absorb_and_take() {
        let reclaimer = Reclaimer::new();
        let mut store = ExpiringStore::new(Duration::from_secs(60), 10);
        store.absorb(generation(0..3), &reclaimer);
        assert_eq!(store.len(), 3);
        assert!(store.take(&addr(1)).is_some());
        assert!(store.take(&addr(1)).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_full_store_drops_oldest_generation() {
        let reclaimer = Reclaimer::new();
        let mut store = ExpiringStore::new(Duration::from_secs(60), 4);
        store.absorb(generation(0..3), &reclaimer);
        store.absorb(generation(10..13), &reclaimer);
        store.absorb(generation(20..22), &reclaimer);
        assert!(store.len() <= 4);
        assert!(store.take(&addr(0)).is_none());
        assert!(store.take(&addr(20)).is_some());
    }

    #[test]
    fn test_expire_rotates_generations() {
        let reclaimer = Reclaimer::new();
        let expiry = Duration::from_secs(10);
        let mut store = ExpiringStore::new(expiry, 10);
        let start = store.rotated_at;
        store.absorb(generation(0..2), &reclaimer);

        store.expire(start + Duration::from_secs(5), &reclaimer);
        assert_eq!(store.len(), 2);

        store.expire(start + Duration::from_secs(11), &reclaimer);
        assert_eq!(store.len(), 2, "one interval moves entries to the old generation");

        store.expire(start + Duration::from_secs(22), &reclaimer);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_long_idle_clears_everything() {
        let reclaimer = Reclaimer::new();
        let mut store = ExpiringStore::new(Duration::from_secs(1), 10);
        let start = store.rotated_at;
        store.absorb(generation(0..5), &reclaimer);
        store.expire(start + Duration::from_secs(5), &reclaimer);
        assert_eq!(store.len(), 0);
    }
}
