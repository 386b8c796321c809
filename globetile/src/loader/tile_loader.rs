//! Worker-pool tile loader.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use super::queue::{PushOutcome, QueuedLoad, RequestQueue};
use super::request::{Completion, LoadKind, LoadRequest, LoadResult};
use super::{LoaderConfig, LoaderStats};
use crate::cache::{CachedTile, TileObject};
use crate::provider::ProviderError;

/// Called after every successful asynchronous fetch, typically to schedule a redraw.
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

struct Completed {
    callback: Completion,
    tile: CachedTile,
}

struct State {
    queue: RequestQueue,
    in_flight: usize,
    shutdown: bool,
}

#[derive(Default)]
struct Counters {
    requested: AtomicU64,
    cache_hits: AtomicU64,
    fetched: AtomicU64,
    coalesced: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
    completed: AtomicU64,
}

struct Shared {
    state: Mutex<State>,
    work_ready: Condvar,
    idle: Condvar,
    completions: Sender<Completed>,
    notifier: Mutex<Option<Notifier>>,
    counters: Counters,
}

/// Asynchronous façade over tile readers and caches.
///
/// Requests are served by a fixed pool of worker threads, most recent first.
/// Completion callbacks are not run on the workers; they are queued and run
/// by [`dispatch_completions`](TileLoader::dispatch_completions) on the
/// thread that owns the view.
pub struct TileLoader {
    shared: Arc<Shared>,
    completions: Receiver<Completed>,
    workers: Vec<JoinHandle<()>>,
}

impl TileLoader {
    /// Starts the worker pool.
    pub fn new(config: LoaderConfig) -> Self {
        let threads = config.effective_threads();
        Self::start(config, threads)
    }

    /// Creates a loader without workers: every request is fetched on the calling thread.
    pub fn synchronous() -> Self {
        Self::start(LoaderConfig::default(), 0)
    }

    fn start(config: LoaderConfig, threads: usize) -> Self {
        let (sender, receiver) = unbounded();
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: RequestQueue::new(config.max_queue),
                in_flight: 0,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
            completions: sender,
            notifier: Mutex::new(None),
            counters: Counters::default(),
        });

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let worker_shared = Arc::clone(&shared);
            let spawned = std::thread::Builder::new()
                .name(format!("globetile-loader-{}", index))
                .spawn(move || worker_loop(worker_shared));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Failed to spawn loader worker");
                    break;
                }
            }
        }

        tracing::info!(
            threads = workers.len(),
            max_queue = config.max_queue,
            "Tile loader started"
        );

        Self {
            shared,
            completions: receiver,
            workers,
        }
    }

    /// Sets the callback run after each successful asynchronous fetch.
    pub fn set_notifier(&self, notifier: impl Fn() + Send + Sync + 'static) {
        *self.shared.notifier.lock() = Some(Arc::new(notifier));
    }

    /// Requests a tile.
    ///
    /// A cached entry of the requested kind is returned immediately. Requests
    /// with `load_now` set, or without a cache, are fetched on the calling
    /// thread. Everything else is queued and reported as pending; its
    /// completion callback runs from [`dispatch_completions`](Self::dispatch_completions).
    pub fn load(&self, kind: LoadKind, request: LoadRequest) -> LoadResult {
        let counters = &self.shared.counters;
        counters.requested.fetch_add(1, Ordering::Relaxed);

        if let Some(cache) = &request.cache {
            if let Some(tile) = cache.get(&request.address) {
                if tile.matches(kind.tile_kind()) {
                    counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return LoadResult::Loaded(tile);
                }
            }
        }

        if request.load_now || request.cache.is_none() || self.workers.is_empty() {
            return self.load_sync(&kind, request);
        }

        let address = request.address.clone();
        let outcome = {
            let mut state = self.shared.state.lock();
            state.queue.push(kind, request)
        };
        match outcome {
            PushOutcome::Coalesced => {
                counters.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(address = %address, "Coalesced duplicate load request");
            }
            PushOutcome::Queued { dropped } => {
                counters.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
            }
        }
        self.shared.work_ready.notify_one();
        LoadResult::Pending
    }

    fn load_sync(&self, kind: &LoadKind, mut request: LoadRequest) -> LoadResult {
        let counters = &self.shared.counters;
        match fetch(kind, &request) {
            Ok(tile) => {
                counters.fetched.fetch_add(1, Ordering::Relaxed);
                if let Some(cache) = &request.cache {
                    cache.save(&request.address, tile.clone(), request.endless);
                }
                if let Some(callback) = request.on_complete.take() {
                    callback(&tile);
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                LoadResult::Loaded(tile)
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(address = %request.address, error = %e, "Synchronous load failed");
                LoadResult::Failed
            }
        }
    }

    /// Runs queued completion callbacks on the calling thread.
    ///
    /// # Returns
    ///
    /// The number of callbacks run.
    pub fn dispatch_completions(&self) -> usize {
        let mut count = 0;
        for completed in self.completions.try_iter() {
            (completed.callback)(&completed.tile);
            count += 1;
        }
        if count > 0 {
            self.shared
                .counters
                .completed
                .fetch_add(count as u64, Ordering::Relaxed);
        }
        count
    }

    /// Blocks until no request is queued or in flight.
    ///
    /// # Returns
    ///
    /// `false` if `timeout` elapsed first.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !(state.queue.is_empty() && state.in_flight == 0) {
            if self.workers.is_empty() {
                return false;
            }
            if self.shared.idle.wait_until(&mut state, deadline).timed_out() {
                return state.queue.is_empty() && state.in_flight == 0;
            }
        }
        true
    }

    /// Discards every queued request. Fetches already in flight still complete.
    pub fn cancel_pending(&self) -> usize {
        let mut state = self.shared.state.lock();
        let count = state.queue.len();
        state.queue.clear();
        if state.in_flight == 0 {
            self.shared.idle.notify_all();
        }
        count
    }

    /// Number of requests waiting for a worker.
    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Returns a snapshot of loader counters.
    pub fn stats(&self) -> LoaderStats {
        let c = &self.shared.counters;
        let (pending, in_flight) = {
            let state = self.shared.state.lock();
            (state.queue.len(), state.in_flight)
        };
        LoaderStats {
            requested: c.requested.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            fetched: c.fetched.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            pending,
            in_flight,
        }
    }
}

impl Default for TileLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl Drop for TileLoader {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.queue.clear();
        }
        self.shared.work_ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        tracing::debug!("Tile loader stopped");
    }
}

/// Reads one tile through the request's reader.
fn fetch(kind: &LoadKind, request: &LoadRequest) -> Result<CachedTile, ProviderError> {
    let address = &request.address;
    let reader = &request.reader;
    let object = match kind {
        LoadKind::Data => reader
            .read_data(address, request.timeout)?
            .map(TileObject::Data),
        LoadKind::Image => reader
            .read_image(address, request.timeout)?
            .map(TileObject::Image),
        LoadKind::Object(decoder) => reader
            .read_object(address, request.timeout, &**decoder)?
            .map(TileObject::Object),
    };
    Ok(object.map_or(CachedTile::Absent, CachedTile::Present))
}

fn next_job(shared: &Shared) -> Option<QueuedLoad> {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return None;
        }
        if let Some(job) = state.queue.pop() {
            state.in_flight += 1;
            return Some(job);
        }
        shared.work_ready.wait(&mut state);
    }
}

fn worker_loop(shared: Arc<Shared>) {
    while let Some(job) = next_job(&shared) {
        let QueuedLoad { kind, mut request, .. } = job;
        let started = Instant::now();

        match fetch(&kind, &request) {
            Ok(tile) => {
                shared.counters.fetched.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(
                    address = %request.address,
                    absent = tile.is_absent(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tile fetched"
                );
                if let Some(cache) = &request.cache {
                    cache.save(&request.address, tile.clone(), request.endless);
                }
                if let Some(callback) = request.on_complete.take() {
                    // The receiver lives as long as the loader, which joins us on drop
                    let _ = shared.completions.send(Completed { callback, tile });
                }
                let notifier = shared.notifier.lock().clone();
                if let Some(notify) = notifier {
                    notify();
                }
            }
            Err(e) => {
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                match e {
                    ProviderError::Decode { .. } => {
                        tracing::warn!(address = %request.address, error = %e, "Tile payload rejected")
                    }
                    _ => tracing::debug!(address = %request.address, error = %e, "Tile fetch failed"),
                }
            }
        }

        let mut state = shared.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 && state.queue.is_empty() {
            shared.idle.notify_all();
        }
    }
}
