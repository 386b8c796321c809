//! Generational tile cache.
//!
//! Entries move through four buckets:
//!
//! ```text
//!   save ──► active ◄──get── backup, expiring     endless (base tiles, never demoted)
//!
//!   end_step:  active ──► backup ──► expiring
//!                                       │
//!                                       └── released after the expiry interval
//! ```
//!
//! Hits in backup or expiring are promoted to active while it has room.
//! Saves into a full bucket are rejected rather than evicting synchronously.
//!
//! # Example
//!
//! ```ignore
//! use globetile::cache::{CacheConfig, CachedTile, TileCache, TileObject};
//!
//! let cache = TileCache::new(CacheConfig::default());
//! cache.save(&address, CachedTile::Present(TileObject::Data(bytes)), false);
//! let hit = cache.get(&address);
//! cache.end_step();
//! ```

mod expiring;
mod object;
mod reclaim;
mod tile_cache;

pub use object::{CachedTile, TileKind, TileObject};
pub use reclaim::Reclaimer;
pub use tile_cache::TileCache;

use std::fmt;
use std::time::Duration;

/// Default per-bucket capacity.
pub const DEFAULT_MAX_COUNT: usize = 100;

/// Default lifetime of the expiring store's generations.
pub const DEFAULT_EXPIRY: Duration = Duration::from_millis(10_000);

/// Cache sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum entries in each bucket
    pub max_count: usize,
    /// Rotation interval of the expiring store
    pub expiry: Duration,
}

impl CacheConfig {
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_count: DEFAULT_MAX_COUNT,
            expiry: DEFAULT_EXPIRY,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub rejected_saves: u64,
    pub active: usize,
    pub backup: usize,
    pub endless: usize,
    pub expiring: usize,
}

impl CacheStats {
    /// Hit rate in `[0, 1]`; zero when there were no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hits, {} misses ({:.1}%), {} rejected; active {} backup {} endless {} expiring {}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.rejected_saves,
            self.active,
            self.backup,
            self.endless,
            self.expiring
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_count, 100);
        assert_eq!(config.expiry, Duration::from_secs(10));
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < 1e-12);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
