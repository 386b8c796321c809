//! Asynchronous tile loading.
//!
//! The [`TileLoader`] sits between the surface and the tile readers:
//!
//! ```text
//! load(kind, request)
//!    │
//!    ├─► cache hit ───────────────► LoadResult::Loaded
//!    ├─► load_now / no cache ─────► fetch on caller ──► LoadResult::Loaded | Failed
//!    └─► RequestQueue (LIFO, bounded, coalescing) ──► LoadResult::Pending
//!              │
//!              ▼
//!        worker threads ──► reader ──► cache.save ──► completion channel
//!                                                          │
//!                               dispatch_completions() ◄───┘ (render thread)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use globetile::loader::{LoadKind, LoadRequest, LoaderConfig, TileLoader};
//!
//! let loader = TileLoader::new(LoaderConfig::default());
//! let request = LoadRequest::new(address, reader).with_cache(cache);
//! match loader.load(LoadKind::Image, request) {
//!     LoadResult::Loaded(tile) => draw(tile),
//!     LoadResult::Pending => {}
//!     LoadResult::Failed => {}
//! }
//! // Each frame:
//! loader.dispatch_completions();
//! ```

mod queue;
mod request;
mod tile_loader;

pub use queue::{PushOutcome, QueuedLoad, RequestQueue};
pub use request::{Completion, LoadKind, LoadRequest, LoadResult, DEFAULT_TIMEOUT};
pub use tile_loader::{Notifier, TileLoader};

use std::fmt;

/// Default bound of the pending request queue.
pub const DEFAULT_MAX_QUEUE: usize = 100;

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Worker threads; 0 uses the number of available cores
    pub threads: usize,
    /// Maximum pending requests
    pub max_queue: usize,
}

impl LoaderConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_max_queue(mut self, max_queue: usize) -> Self {
        self.max_queue = max_queue;
        self
    }

    /// Resolves `threads`, substituting the core count for 0.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_queue: DEFAULT_MAX_QUEUE,
        }
    }
}

/// Point-in-time loader counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderStats {
    pub requested: u64,
    pub cache_hits: u64,
    /// Physical reads, successful or confirmed-absent
    pub fetched: u64,
    pub coalesced: u64,
    pub dropped: u64,
    pub failed: u64,
    /// Completion callbacks run
    pub completed: u64,
    pub pending: usize,
    pub in_flight: usize,
}

impl fmt::Display for LoaderStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requested, {} cache hits, {} fetched, {} coalesced, {} dropped, {} failed, {} pending",
            self.requested,
            self.cache_hits,
            self.fetched,
            self.coalesced,
            self.dropped,
            self.failed,
            self.pending
        )
    }
}
