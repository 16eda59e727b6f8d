//! Stress scenarios driven by the `taskgate` binary
//!
//! Every scenario submits its operations from spawned tasks, tallies the
//! outcomes and measures how many operations ran at once. A shutdown request
//! cancels the scenario's queue; operations that never started are reported
//! as cancelled.

use crate::app::cli::args::Scenario;
use crate::app::error::AppError;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::sync::lock_or_recover;
use crate::queue::api::{
    with_priority, with_timeout, AsyncQueue, Priority, QueueChain, QueueConfig, QueueError,
};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;

/// Outcome of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    /// RFC 3339 start time
    pub started_at: String,
    pub operations: usize,
    pub successes: usize,
    pub failures: usize,
    pub cancelled: usize,
    pub peak_concurrency: usize,
    /// Concurrency the queue configuration allows
    pub limit: usize,
    pub elapsed_ms: u64,
    /// Shortest completion-to-dispatch gap (interval scenario)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_spacing_ms: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lanes: Vec<LaneReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneReport {
    pub priority: Priority,
    pub capacity: usize,
    pub peak_concurrency: usize,
}

/// Error returned by scenario operations
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("operation {0} failed on purpose")]
    Rejected(usize),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Per-scenario counters
#[derive(Debug, Default)]
struct Tally {
    running: AtomicUsize,
    peak: AtomicUsize,
    successes: AtomicUsize,
    failures: AtomicUsize,
}

struct Occupancy<'a> {
    running: &'a AtomicUsize,
}

impl Drop for Occupancy<'_> {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Tally {
    fn enter(&self) -> Occupancy<'_> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Occupancy {
            running: &self.running,
        }
    }

    fn record<T>(&self, outcome: &Result<T, OperationError>) {
        match outcome {
            Ok(_) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
            }
            Err(OperationError::Queue(QueueError::Cancelled)) => {}
            Err(err) => {
                log::trace!("{}", err);
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn report(&self, scenario: &Scenario, limit: usize, elapsed: Duration) -> ScenarioReport {
        let operations = scenario.operations();
        let successes = self.successes.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        ScenarioReport {
            scenario: scenario.name().to_string(),
            started_at: String::new(),
            operations,
            successes,
            failures,
            cancelled: operations.saturating_sub(successes + failures),
            peak_concurrency: self.peak(),
            limit,
            elapsed_ms: elapsed.as_millis() as u64,
            min_spacing_ms: None,
            lanes: Vec::new(),
        }
    }
}

/// Stand-in for an expensive, exclusively used resource
#[derive(Debug)]
struct Worker {
    id: usize,
    jobs: usize,
}

/// Run `scenario` against queues built from `config`
pub async fn run_scenario(
    scenario: &Scenario,
    config: &QueueConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<ScenarioReport, AppError> {
    log::info!(
        "Running {} scenario with {} operations",
        scenario.name(),
        scenario.operations()
    );
    let started_at = chrono::Utc::now();
    let mut report = match *scenario {
        Scenario::Capacity { operations, .. } => {
            run_capacity(scenario, operations, config, shutdown).await
        }
        Scenario::Pool {
            operations,
            launchers,
            hold_ms,
            budget_secs,
            ..
        } => {
            let budget = Duration::from_secs(budget_secs as u64);
            let hold = Duration::from_millis(hold_ms);
            run_pool(scenario, operations, launchers, hold, budget, config, shutdown).await
        }
        Scenario::Priority {
            operations,
            hold_ms,
        } => {
            let hold = Duration::from_millis(hold_ms);
            run_priority(scenario, operations, hold, config, shutdown).await
        }
        Scenario::Interval {
            operations,
            hold_ms,
            ..
        } => {
            let hold = Duration::from_millis(hold_ms);
            run_interval(scenario, operations, hold, config, shutdown).await
        }
        Scenario::Chain {
            operations,
            hold_ms,
            ..
        } => {
            let hold = Duration::from_millis(hold_ms);
            run_chain(scenario, operations, hold, config, shutdown).await
        }
    }?;
    report.started_at = started_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    Ok(report)
}

/// Cancel `queue` once shutdown is signalled
fn cancel_on_shutdown(
    queue: Arc<dyn AsyncQueue>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if shutdown.recv().await.is_ok() {
            log::warn!("Cancelling queued and running operations");
            queue.cancel().await;
        }
    })
}

async fn drain(tasks: &mut JoinSet<()>) -> Result<(), AppError> {
    while let Some(joined) = tasks.join_next().await {
        joined?;
    }
    Ok(())
}

async fn pause(hold: Duration) {
    if hold.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(hold).await;
    }
}

async fn run_capacity(
    scenario: &Scenario,
    operations: usize,
    config: &QueueConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<ScenarioReport, AppError> {
    let queue = Arc::new(config.capacity_queue()?);
    let watcher = cancel_on_shutdown(queue.clone(), shutdown.subscribe());
    let tally = Arc::new(Tally::default());
    let increments = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();
    let mut tasks = JoinSet::new();

    for index in 0..operations {
        if shutdown.is_shutdown_requested() {
            break;
        }
        let queue = Arc::clone(&queue);
        let tally = Arc::clone(&tally);
        let increments = Arc::clone(&increments);
        tasks.spawn(async move {
            let (counts, incremented) = (&*tally, &*increments);
            let outcome = queue
                .exec(move || async move {
                    let _inside = counts.enter();
                    if index % 2 == 1 {
                        return Err(OperationError::Rejected(index));
                    }
                    // Read then write across a yield point
                    let seen = incremented.load(Ordering::Relaxed);
                    tokio::task::yield_now().await;
                    incremented.store(seen + 1, Ordering::Relaxed);
                    Ok(())
                })
                .await;
            tally.record(&outcome);
        });
    }
    drain(&mut tasks).await?;
    watcher.abort();

    log::info!(
        "Counter reached {} with capacity {}",
        increments.load(Ordering::Relaxed),
        queue.capacity()
    );
    Ok(tally.report(scenario, queue.capacity(), started.elapsed()))
}

async fn run_pool(
    scenario: &Scenario,
    operations: usize,
    launchers: usize,
    hold: Duration,
    budget: Duration,
    config: &QueueConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<ScenarioReport, AppError> {
    let pool = Arc::new(config.resource_pool(|id| Worker { id, jobs: 0 })?);
    let watcher = cancel_on_shutdown(pool.clone(), shutdown.subscribe());
    let tally = Arc::new(Tally::default());
    let started = Instant::now();

    let launched = with_timeout(budget, async {
        let mut launcher_tasks = JoinSet::new();
        for launcher in 0..launchers {
            // Spread the remainder over the first launchers
            let share = operations / launchers + usize::from(launcher < operations % launchers);
            let pool = Arc::clone(&pool);
            let tally = Arc::clone(&tally);
            let shutdown = shutdown.clone();
            launcher_tasks.spawn(async move {
                let mut tasks = JoinSet::new();
                for _ in 0..share {
                    if shutdown.is_shutdown_requested() {
                        break;
                    }
                    let pool = Arc::clone(&pool);
                    let tally = Arc::clone(&tally);
                    tasks.spawn(async move {
                        let counts = Arc::clone(&tally);
                        let outcome = pool
                            .exec(move |worker| {
                                Box::pin(async move {
                                    let _inside = counts.enter();
                                    worker.jobs += 1;
                                    log::trace!("Worker {} on job {}", worker.id, worker.jobs);
                                    pause(hold).await;
                                    Ok::<_, OperationError>(())
                                })
                            })
                            .await;
                        tally.record(&outcome);
                    });
                }
                drain(&mut tasks).await
            });
        }
        while let Some(joined) = launcher_tasks.join_next().await {
            joined??;
        }
        Ok::<_, AppError>(())
    })
    .await;
    watcher.abort();

    if let Err(err) = launched {
        pool.cancel().await;
        return Err(err);
    }
    Ok(tally.report(scenario, pool.len(), started.elapsed()))
}

async fn run_priority(
    scenario: &Scenario,
    operations: usize,
    hold: Duration,
    config: &QueueConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<ScenarioReport, AppError> {
    let router = Arc::new(config.priority_router()?);
    let watcher = cancel_on_shutdown(router.clone(), shutdown.subscribe());
    let tally = Arc::new(Tally::default());
    let lanes: Vec<(Priority, Arc<Tally>)> = Priority::iter()
        .map(|priority| (priority, Arc::new(Tally::default())))
        .collect();
    let started = Instant::now();
    let mut tasks = JoinSet::new();

    // Interleave priorities so every lane is busy at the same time
    for _ in 0..operations {
        for (priority, lane_tally) in &lanes {
            if shutdown.is_shutdown_requested() {
                break;
            }
            let router = Arc::clone(&router);
            let tally = Arc::clone(&tally);
            let lane_tally = Arc::clone(lane_tally);
            tasks.spawn(with_priority(*priority, async move {
                let (counts, lane_counts) = (&*tally, &*lane_tally);
                let outcome = router
                    .exec(move || async move {
                        let _inside = counts.enter();
                        let _in_lane = lane_counts.enter();
                        pause(hold).await;
                        Ok::<_, OperationError>(())
                    })
                    .await;
                tally.record(&outcome);
            }));
        }
    }
    drain(&mut tasks).await?;
    watcher.abort();

    let lane_reports: Vec<LaneReport> = lanes
        .iter()
        .map(|(priority, lane_tally)| LaneReport {
            priority: *priority,
            capacity: router.lane(*priority).capacity(),
            peak_concurrency: lane_tally.peak(),
        })
        .collect();
    let limit = router
        .priorities()
        .iter()
        .map(|priority| router.lane(*priority).capacity())
        .sum();

    let mut report = tally.report(scenario, limit, started.elapsed());
    report.operations = operations * lanes.len();
    report.cancelled = report
        .operations
        .saturating_sub(report.successes + report.failures);
    report.lanes = lane_reports;
    Ok(report)
}

async fn run_interval(
    scenario: &Scenario,
    operations: usize,
    hold: Duration,
    config: &QueueConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<ScenarioReport, AppError> {
    let gate = Arc::new(config.interval_gate()?);
    let watcher = cancel_on_shutdown(gate.clone(), shutdown.subscribe());
    let tally = Arc::new(Tally::default());
    let spans: Arc<Mutex<Vec<(Instant, Instant)>>> = Arc::new(Mutex::new(Vec::new()));
    let started = Instant::now();
    let mut tasks = JoinSet::new();

    for _ in 0..operations {
        if shutdown.is_shutdown_requested() {
            break;
        }
        let gate = Arc::clone(&gate);
        let tally = Arc::clone(&tally);
        let spans = Arc::clone(&spans);
        tasks.spawn(async move {
            let (counts, spans) = (&*tally, &*spans);
            let outcome = gate
                .exec(move || async move {
                    let _inside = counts.enter();
                    let dispatched = Instant::now();
                    pause(hold).await;
                    lock_or_recover(spans, "interval spans").push((dispatched, Instant::now()));
                    Ok::<_, OperationError>(())
                })
                .await;
            tally.record(&outcome);
        });
    }
    drain(&mut tasks).await?;
    watcher.abort();

    let mut report = tally.report(scenario, 1, started.elapsed());
    let spans = lock_or_recover(spans.as_ref(), "interval spans");
    report.min_spacing_ms = min_spacing(&spans).map(|gap| gap.as_millis() as u64);
    Ok(report)
}

/// Shortest gap between one completion and the next dispatch
fn min_spacing(spans: &[(Instant, Instant)]) -> Option<Duration> {
    let mut ordered = spans.to_vec();
    ordered.sort_by_key(|(dispatched, _)| *dispatched);
    ordered
        .windows(2)
        .map(|pair| pair[1].0.saturating_duration_since(pair[0].1))
        .min()
}

async fn run_chain(
    scenario: &Scenario,
    operations: usize,
    hold: Duration,
    config: &QueueConfig,
    shutdown: &ShutdownCoordinator,
) -> Result<ScenarioReport, AppError> {
    let pool = Arc::new(config.resource_pool(|id| Worker { id, jobs: 0 })?);
    let limiter = Arc::new(config.capacity_queue()?);
    let router = Arc::new(config.priority_router()?);
    let limit = pool.len().min(limiter.capacity());
    let chain = Arc::new(
        QueueChain::default()
            .then(pool)
            .then(limiter)
            .then(router),
    );
    let watcher = cancel_on_shutdown(chain.clone(), shutdown.subscribe());
    let tally = Arc::new(Tally::default());
    let priorities: Vec<Priority> = Priority::iter().collect();
    let started = Instant::now();
    let mut tasks = JoinSet::new();

    for index in 0..operations {
        if shutdown.is_shutdown_requested() {
            break;
        }
        let chain = Arc::clone(&chain);
        let tally = Arc::clone(&tally);
        let priority = priorities[index % priorities.len()];
        tasks.spawn(with_priority(priority, async move {
            let counts = &*tally;
            let outcome = chain
                .exec(move || async move {
                    let _inside = counts.enter();
                    pause(hold).await;
                    Ok::<_, OperationError>(())
                })
                .await;
            tally.record(&outcome);
        }));
    }
    drain(&mut tasks).await?;
    watcher.abort();

    Ok(tally.report(scenario, limit, started.elapsed()))
}
