//! Load requests and their outcomes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CachedTile, TileCache, TileKind};
use crate::coord::TileAddress;
use crate::provider::{ObjectDecoder, TileReader};

/// Default time a reader may spend on one tile.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Callback run on the render thread once an asynchronous fetch completes.
pub type Completion = Box<dyn FnOnce(&CachedTile) + Send>;

/// What a request should produce.
#[derive(Clone)]
pub enum LoadKind {
    /// Raw bytes
    Data,
    /// Decoded RGBA image
    Image,
    /// Caller-decoded object
    Object(Arc<ObjectDecoder>),
}

impl LoadKind {
    pub fn tile_kind(&self) -> TileKind {
        match self {
            LoadKind::Data => TileKind::Data,
            LoadKind::Image => TileKind::Image,
            LoadKind::Object(_) => TileKind::Object,
        }
    }
}

impl fmt::Debug for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.tile_kind(), f)
    }
}

/// A request to fetch one tile through a reader.
pub struct LoadRequest {
    pub address: TileAddress,
    pub reader: Arc<dyn TileReader>,
    /// Where the result is stored; without a cache the fetch is synchronous
    pub cache: Option<Arc<TileCache>>,
    pub timeout: Duration,
    /// Fetch on the calling thread instead of queueing
    pub load_now: bool,
    /// Store in the cache's endless bucket
    pub endless: bool,
    pub on_complete: Option<Completion>,
}

impl LoadRequest {
    /// Creates an asynchronous request with the default timeout.
    pub fn new(address: TileAddress, reader: Arc<dyn TileReader>) -> Self {
        Self {
            address,
            reader,
            cache: None,
            timeout: DEFAULT_TIMEOUT,
            load_now: false,
            endless: false,
            on_complete: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<TileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_load_now(mut self, load_now: bool) -> Self {
        self.load_now = load_now;
        self
    }

    pub fn with_endless(mut self, endless: bool) -> Self {
        self.endless = endless;
        self
    }

    pub fn on_complete(mut self, callback: impl FnOnce(&CachedTile) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// True if both requests target the same tile of the same reader.
    pub fn same_target(&self, other: &LoadRequest) -> bool {
        // Compare data pointers only; vtable pointers are not unique
        Arc::as_ptr(&self.reader) as *const () == Arc::as_ptr(&other.reader) as *const ()
            && self.address == other.address
    }
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("address", &self.address)
            .field("reader", &self.reader.name())
            .field("timeout", &self.timeout)
            .field("load_now", &self.load_now)
            .field("endless", &self.endless)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

/// Outcome of [`TileLoader::load`](super::TileLoader::load).
#[derive(Debug, Clone)]
pub enum LoadResult {
    /// Available now, from the cache or a synchronous fetch
    Loaded(CachedTile),
    /// Queued; the completion callback runs once it is fetched
    Pending,
    /// A synchronous fetch failed
    Failed,
}

impl LoadResult {
    pub fn tile(&self) -> Option<&CachedTile> {
        match self {
            LoadResult::Loaded(tile) => Some(tile),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LoadResult::Pending)
    }
}
