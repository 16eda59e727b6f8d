//! Signal-driven shutdown coordination
//!
//! The first interrupt flags the shutdown and notifies every subscriber so the
//! running scenario can cancel its queues and unwind. A second interrupt exits
//! immediately with status 130.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used after an interrupt
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let coordinator = Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        };
        (coordinator, shutdown_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Run `future_fn` with signal handlers installed for its duration
    pub async fn guard_with_coordinator<F, Fut, R, E>(future_fn: F) -> Result<R, E>
    where
        F: FnOnce(Self, broadcast::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
    {
        let (coordinator, shutdown_rx) = Self::new();
        let handlers = install_signal_handlers(&coordinator);

        let result = future_fn(coordinator, shutdown_rx).await;

        for handler in handlers {
            handler.abort();
        }
        result
    }
}

fn install_signal_handlers(coordinator: &ShutdownCoordinator) -> Vec<tokio::task::JoinHandle<()>> {
    let signal_count = Arc::new(AtomicUsize::new(0));
    let mut handlers = Vec::new();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        // Restore default SIGPIPE so `taskgate ... | head` terminates quietly
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        for kind in [SignalKind::terminate(), SignalKind::hangup()] {
            let coordinator = coordinator.clone();
            let counter = Arc::clone(&signal_count);
            handlers.push(tokio::spawn(async move {
                if let Ok(mut sig) = signal(kind) {
                    while sig.recv().await.is_some() {
                        on_signal(&coordinator, &counter);
                    }
                }
            }));
        }
    }

    let coordinator = coordinator.clone();
    handlers.push(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_signal(&coordinator, &signal_count);
        }
    }));

    handlers
}

fn on_signal(coordinator: &ShutdownCoordinator, counter: &AtomicUsize) {
    let previous = counter.fetch_add(1, Ordering::AcqRel);
    if previous >= 1 {
        log::warn!("Second interrupt received; exiting");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
    log::info!("Interrupt received; cancelling queued work");
    coordinator.trigger_shutdown();
}
