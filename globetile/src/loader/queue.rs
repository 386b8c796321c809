//! Bounded LIFO queue of pending load requests.
//!
//! New requests are pushed to the front and workers pop from the front, so
//! the most recently requested tile is served first. When the queue grows
//! past its bound the oldest request is dropped from the back without its
//! callback ever running.
//!
//! A request for a tile that is already queued (same reader, address and
//! result kind) is coalesced: the queued request moves to the front and takes
//! the newer request's timeout, cache and endless flag. The first registered
//! callback is kept; a later one is used only if the queued request had none.

use std::collections::VecDeque;
use std::time::Instant;

use super::request::{LoadKind, LoadRequest};

/// A request waiting for a worker.
#[derive(Debug)]
pub struct QueuedLoad {
    pub kind: LoadKind,
    pub request: LoadRequest,
    /// When the request was first enqueued
    pub enqueued_at: Instant,
}

impl QueuedLoad {
    /// Returns how long this request has been waiting.
    pub fn wait_time(&self) -> std::time::Duration {
        self.enqueued_at.elapsed()
    }
}

/// Result of [`RequestQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Added as a new request; `dropped` older requests fell off the back
    Queued { dropped: usize },
    /// Merged into an already queued request
    Coalesced,
}

/// Bounded request queue.
#[derive(Debug)]
pub struct RequestQueue {
    items: VecDeque<QueuedLoad>,
    max_len: usize,
}

impl RequestQueue {
    /// Creates a queue holding at most `max_len` requests (at least one).
    pub fn new(max_len: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_len: max_len.max(1),
        }
    }

    /// Adds a request at the front, coalescing with a queued duplicate.
    pub fn push(&mut self, kind: LoadKind, mut request: LoadRequest) -> PushOutcome {
        let duplicate = self.items.iter().position(|queued| {
            queued.kind.tile_kind() == kind.tile_kind() && queued.request.same_target(&request)
        });

        if let Some(index) = duplicate {
            if let Some(mut queued) = self.items.remove(index) {
                let existing = &mut queued.request;
                existing.timeout = request.timeout;
                existing.endless = request.endless;
                if request.cache.is_some() {
                    existing.cache = request.cache.take();
                }
                if existing.on_complete.is_none() {
                    existing.on_complete = request.on_complete.take();
                }
                self.items.push_front(queued);
                return PushOutcome::Coalesced;
            }
        }

        self.items.push_front(QueuedLoad {
            kind,
            request,
            enqueued_at: Instant::now(),
        });

        let mut dropped = 0;
        while self.items.len() > self.max_len {
            if let Some(stale) = self.items.pop_back() {
                tracing::debug!(
                    address = %stale.request.address,
                    waited_ms = stale.wait_time().as_millis() as u64,
                    "Load queue full, dropping oldest request"
                );
                dropped += 1;
            }
        }
        PushOutcome::Queued { dropped }
    }

    /// Takes the most recently pushed request.
    pub fn pop(&mut self) -> Option<QueuedLoad> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Discards every queued request.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedTile;
    use crate::coord::{TileAddress, TileLocation};
    use crate::provider::{ProviderError, TileReader};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct NullReader;

    impl TileReader for NullReader {
        fn read_data(
            &self,
            _address: &TileAddress,
            _timeout: Duration,
        ) -> Result<Option<Bytes>, ProviderError> {
            Ok(None)
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    fn request(reader: &Arc<dyn TileReader>, column: u32) -> LoadRequest {
        LoadRequest::new(
            TileAddress::new(TileLocation::new(3, column, 0)),
            Arc::clone(reader),
        )
    }

    fn column_of(load: &QueuedLoad) -> u32 {
        load.request.address.location.column
    }

    #[test]
    fn test_pop_is_lifo() {
        let reader: Arc<dyn TileReader> = Arc::new(NullReader);
        let mut queue = RequestQueue::new(10);
        for c in 0..3 {
            queue.push(LoadKind::Image, request(&reader, c));
        }
        assert_eq!(column_of(&queue.pop().unwrap()), 2);
        assert_eq!(column_of(&queue.pop().unwrap()), 1);
        assert_eq!(column_of(&queue.pop().unwrap()), 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_bound_drops_oldest() {
        let reader: Arc<dyn TileReader> = Arc::new(NullReader);
        let mut queue = RequestQueue::new(3);
        for c in 0..3 {
            assert_eq!(
                queue.push(LoadKind::Data, request(&reader, c)),
                PushOutcome::Queued { dropped: 0 }
            );
        }
        assert_eq!(
            queue.push(LoadKind::Data, request(&reader, 3)),
            PushOutcome::Queued { dropped: 1 }
        );
        assert_eq!(queue.len(), 3);
        let remaining: Vec<u32> = std::iter::from_fn(|| queue.pop())
            .map(|l| column_of(&l))
            .collect();
        assert_eq!(remaining, vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicate_moves_to_front() {
        let reader: Arc<dyn TileReader> = Arc::new(NullReader);
        let mut queue = RequestQueue::new(10);
        queue.push(LoadKind::Image, request(&reader, 0));
        queue.push(LoadKind::Image, request(&reader, 1));
        let outcome = queue.push(
            LoadKind::Image,
            request(&reader, 0).with_timeout(Duration::from_millis(5)).with_endless(true),
        );
        assert_eq!(outcome, PushOutcome::Coalesced);
        assert_eq!(queue.len(), 2);

        let front = queue.pop().unwrap();
        assert_eq!(column_of(&front), 0);
        assert_eq!(front.request.timeout, Duration::from_millis(5));
        assert!(front.request.endless);
    }

    #[test]
    fn test_coalescing_keeps_first_callback() {
        let reader: Arc<dyn TileReader> = Arc::new(NullReader);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut queue = RequestQueue::new(10);

        let f = Arc::clone(&first);
        queue.push(
            LoadKind::Data,
            request(&reader, 0).on_complete(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let s = Arc::clone(&second);
        queue.push(
            LoadKind::Data,
            request(&reader, 0).on_complete(move |_| {
                s.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let load = queue.pop().unwrap();
        assert!(queue.is_empty());
        (load.request.on_complete.unwrap())(&CachedTile::Absent);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_different_readers_are_not_coalesced() {
        let a: Arc<dyn TileReader> = Arc::new(NullReader);
        let b: Arc<dyn TileReader> = Arc::new(NullReader);
        let mut queue = RequestQueue::new(10);
        queue.push(LoadKind::Data, request(&a, 0));
        queue.push(LoadKind::Data, request(&b, 0));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_different_kinds_are_not_coalesced() {
        let reader: Arc<dyn TileReader> = Arc::new(NullReader);
        let mut queue = RequestQueue::new(10);
        queue.push(LoadKind::Data, request(&reader, 0));
        queue.push(LoadKind::Image, request(&reader, 0));
        assert_eq!(queue.len(), 2);
    }
}
