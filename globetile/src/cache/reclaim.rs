//! Off-thread release of evicted cache generations.

use std::any::Any;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Sender};

type Garbage = Box<dyn Any + Send>;

/// Drops values on a background thread.
///
/// Dropping a large generation of decoded images can take noticeable time;
/// caches hand such generations to the reclaimer so `end_step` and `clear`
/// return promptly.
pub struct Reclaimer {
    sender: Option<Sender<Garbage>>,
    worker: Option<JoinHandle<()>>,
}

impl Reclaimer {
    /// Starts the reclaim thread.
    ///
    /// If the thread cannot be spawned, values are dropped inline instead.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded::<Garbage>();
        let spawned = std::thread::Builder::new()
            .name("globetile-reclaim".to_string())
            .spawn(move || {
                let mut released: u64 = 0;
                for garbage in receiver.iter() {
                    drop(garbage);
                    released += 1;
                }
                tracing::trace!(released, "Reclaim thread exiting");
            });

        match spawned {
            Ok(worker) => Self {
                sender: Some(sender),
                worker: Some(worker),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to spawn reclaim thread, releasing inline");
                Self {
                    sender: None,
                    worker: None,
                }
            }
        }
    }

    /// Hands `value` to the background thread to be dropped.
    pub fn dispose<T: Send + 'static>(&self, value: T) {
        if let Some(sender) = &self.sender {
            // Send only fails once the worker is gone; the value is then dropped here
            let _ = sender.send(Box::new(value));
        }
    }
}

impl Default for Reclaimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_disposed_values_are_dropped_by_shutdown() {
        let drops = Arc::new(AtomicUsize::new(0));
        let reclaimer = Reclaimer::new();
        for _ in 0..10 {
            reclaimer.dispose(DropCounter(Arc::clone(&drops)));
        }
        drop(reclaimer);
        assert_eq!(drops.load(Ordering::SeqCst), 10);
    }
}
