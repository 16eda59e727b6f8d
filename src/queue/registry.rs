//! In-flight operation registry for cooperative cancellation
//!
//! Every admitted operation is registered under a generated id for as long as
//! it runs. An entry holds the trigger that interrupts the operation and the
//! signal that fires once the operation's future has been dropped, so that
//! `cancel_all` can wait for the unwind to finish.
//!
//! Callers take a [`Ticket`] before they queue for admission. `cancel_all`
//! advances the registry's epoch, and an operation presenting a ticket from an
//! earlier epoch is refused at registration without being polled. A caller
//! that was already handed a slot or resource when `cancel_all` ran therefore
//! cannot start its body afterwards.

use crate::core::sync::lock_or_recover;
use crate::queue::error::{QueueError, QueueResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Handle kept by the registry for one running operation
#[derive(Debug)]
struct InFlight {
    cancel: oneshot::Sender<()>,
    finished: oneshot::Receiver<()>,
}

#[derive(Debug, Default)]
struct Entries {
    epoch: u64,
    running: HashMap<u64, InFlight>,
}

/// Cancellation epoch observed by a caller before it queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Id-keyed map of running operations
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    next_id: AtomicU64,
    entries: Mutex<Entries>,
}

/// Removes the entry when the operation is done; dropping `_finished`
/// afterwards releases any `cancel_all` waiting on it.
struct Registration<'r> {
    registry: &'r CancellationRegistry,
    id: u64,
    _finished: oneshot::Sender<()>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.lock().running.remove(&self.id);
    }
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        lock_or_recover(&self.entries, "cancellation registry")
    }

    /// Number of operations currently registered
    pub fn in_flight(&self) -> usize {
        self.lock().running.len()
    }

    /// Ticket for a caller about to queue; stale once `cancel_all` runs
    pub fn ticket(&self) -> Ticket {
        Ticket(self.lock().epoch)
    }

    /// Drive `operation` to completion unless the registry cancels it first
    ///
    /// A `ticket` issued before the latest `cancel_all` is refused with
    /// [`QueueError::Cancelled`] and `operation` is dropped unpolled. On
    /// cancellation the operation's future is dropped at its current
    /// suspension point and [`QueueError::Cancelled`] is returned.
    pub async fn run<F: Future>(&self, ticket: Ticket, operation: F) -> QueueResult<F::Output> {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut entries = self.lock();
            if entries.epoch != ticket.0 {
                log::trace!("Operation {} refused: queue cancelled while it waited", id);
                return Err(QueueError::Cancelled);
            }
            entries.running.insert(
                id,
                InFlight {
                    cancel: cancel_tx,
                    finished: finished_rx,
                },
            );
        }
        let registration = Registration {
            registry: self,
            id,
            _finished: finished_tx,
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel_rx => {
                log::trace!("Operation {} interrupted by cancellation", id);
                Err(QueueError::Cancelled)
            }
            output = operation => Ok(output),
        };

        // The operation future is gone by now; only then signal completion
        drop(registration);
        outcome
    }

    /// Cancel every registered operation and wait until each has unwound
    ///
    /// Outstanding tickets become stale. Returns the number of operations
    /// that were interrupted.
    pub async fn cancel_all(&self) -> usize {
        let drained: Vec<InFlight> = {
            let mut entries = self.lock();
            entries.epoch = entries.epoch.wrapping_add(1);
            entries.running.drain().map(|(_, in_flight)| in_flight).collect()
        };
        let count = drained.len();

        let mut pending = Vec::with_capacity(count);
        for in_flight in drained {
            let _ = in_flight.cancel.send(());
            pending.push(in_flight.finished);
        }

        // Err(RecvError) is the expected outcome: the sender is dropped, never used
        futures::future::join_all(pending).await;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_output_and_unregisters() {
        let registry = CancellationRegistry::new();

        let output = registry.run(registry.ticket(), async { 21 * 2 }).await;

        assert_eq!(output, Ok(42));
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_with_nothing_registered() {
        let registry = CancellationRegistry::new();

        assert_eq!(registry.cancel_all().await, 0);
    }

    #[tokio::test]
    async fn test_stale_ticket_is_refused_unpolled() {
        let registry = CancellationRegistry::new();
        let stale = registry.ticket();
        registry.cancel_all().await;
        let polled = AtomicBool::new(false);

        let result = registry
            .run(stale, async {
                polled.store(true, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result, Err(QueueError::Cancelled));
        assert!(!polled.load(Ordering::SeqCst));
        assert_eq!(registry.in_flight(), 0);

        let fresh = registry.ticket();
        assert_ne!(fresh, stale);
        assert_eq!(registry.run(fresh, async { "ok" }).await, Ok("ok"));
    }

    #[tokio::test]
    async fn test_cancel_all_interrupts_and_waits_for_unwind() {
        struct SetOnDrop(Arc<AtomicBool>);
        impl Drop for SetOnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let registry = Arc::new(CancellationRegistry::new());
        let unwound = Arc::new(AtomicBool::new(false));

        let runner = {
            let registry = Arc::clone(&registry);
            let unwound = Arc::clone(&unwound);
            tokio::spawn(async move {
                let ticket = registry.ticket();
                registry
                    .run(ticket, async move {
                        let _guard = SetOnDrop(unwound);
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    })
                    .await
            })
        };

        while registry.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(registry.cancel_all().await, 1);
        assert!(
            unwound.load(Ordering::SeqCst),
            "cancel_all must not return before the operation is dropped"
        );

        let result = runner.await.unwrap();
        assert_eq!(result, Err(QueueError::Cancelled));
        assert_eq!(registry.in_flight(), 0);
    }
}
