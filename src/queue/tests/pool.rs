//! Tests for the resource pool

use super::{wait_until, ConcurrencyProbe, TestError};
use crate::queue::api::{with_timeout, AsyncQueue, QueueError, ResourcePool};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

/// Resource that detects concurrent use
#[derive(Debug)]
struct Connection {
    id: usize,
    in_use: AtomicBool,
}

impl Connection {
    fn new(id: usize) -> Self {
        Self {
            id,
            in_use: AtomicBool::new(false),
        }
    }

    async fn query(&self) -> Result<usize, TestError> {
        let was_in_use = self.in_use.swap(true, Ordering::SeqCst);
        assert!(!was_in_use, "connection {} used concurrently", self.id);
        tokio::task::yield_now().await;
        self.in_use.store(false, Ordering::SeqCst);
        Ok(self.id)
    }
}

fn connections(count: usize) -> Vec<Connection> {
    (0..count).map(Connection::new).collect()
}

#[test]
fn test_empty_pool_rejected() {
    let err = ResourcePool::<Connection>::new(Vec::new()).unwrap_err();

    assert!(matches!(err, QueueError::InvalidConfig { .. }));
}

#[tokio::test]
async fn test_exec_lends_a_resource() {
    let pool = ResourcePool::new(connections(2)).unwrap();

    let id = pool
        .exec(|conn| Box::pin(async move { conn.query().await }))
        .await
        .unwrap();

    assert!(id < 2);
    assert_eq!(pool.available(), 2);
}

#[tokio::test]
async fn test_resource_returned_after_error() {
    let pool = ResourcePool::new(connections(1)).unwrap();

    let result: Result<(), TestError> = pool
        .exec(|conn| Box::pin(async move { Err(TestError::Failed(conn.id)) }))
        .await;

    assert_eq!(result, Err(TestError::Failed(0)));
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_lease_allows_mutation() {
    let pool = ResourcePool::new(vec![Vec::<u32>::new()]).unwrap();

    pool.exec(|buffer| {
        Box::pin(async move {
            buffer.push(1);
            Ok::<_, QueueError>(())
        })
    })
    .await
    .unwrap();

    let contents = pool
        .exec(|buffer| Box::pin(async move { Ok::<_, QueueError>(buffer.clone()) }))
        .await
        .unwrap();
    assert_eq!(contents, vec![1]);
}

#[tokio::test]
async fn test_fast_path_rotates_resources() {
    let pool = ResourcePool::new(connections(3)).unwrap();
    let mut seen = Vec::new();

    for _ in 0..6 {
        let id = pool
            .exec(|conn| Box::pin(async move { conn.query().await }))
            .await
            .unwrap();
        seen.push(id);
    }

    assert_eq!(seen, vec![0, 1, 2, 0, 1, 2]);
}

#[tokio::test]
async fn test_waiters_served_in_arrival_order() {
    let pool = Arc::new(ResourcePool::new(connections(1)).unwrap());
    let order = Arc::new(Mutex::new(Vec::new()));
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let holder = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            pool.exec(move |_conn| {
                Box::pin(async move {
                    let _ = release_rx.await;
                    Ok::<_, QueueError>(())
                })
            })
            .await
        })
    };
    wait_until(|| pool.available() == 0).await;

    let mut waiters = Vec::new();
    for index in 0..5 {
        let pool_ref = Arc::clone(&pool);
        let order = Arc::clone(&order);
        waiters.push(tokio::spawn(async move {
            pool_ref
                .exec(move |_conn| {
                    Box::pin(async move {
                        order.lock().unwrap().push(index);
                        Ok::<_, QueueError>(())
                    })
                })
                .await
        }));
        wait_until(|| pool.waiting() == index + 1).await;
    }

    release_tx.send(()).unwrap();
    holder.await.unwrap().unwrap();
    for waiter in waiters {
        waiter.await.unwrap().unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_resource_held_while_operation_ignores_it() {
    let pool = Arc::new(ResourcePool::new(connections(1)).unwrap());
    let (release_tx, release_rx) = oneshot::channel::<()>();

    let holder = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            pool.exec(move |_conn| {
                Box::pin(async move {
                    let _ = release_rx.await;
                    Ok::<_, QueueError>(())
                })
            })
            .await
        })
    };
    wait_until(|| pool.available() == 0).await;

    let second = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            pool.exec(|conn| Box::pin(async move { conn.query().await }))
                .await
        })
    };
    wait_until(|| pool.waiting() == 1).await;
    assert_eq!(pool.available(), 0);

    release_tx.send(()).unwrap();
    holder.await.unwrap().unwrap();
    assert_eq!(second.await.unwrap(), Ok(0));
    assert_eq!(pool.available(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_resource_excludes_operations_that_ignore_it() {
    let pool = Arc::new(ResourcePool::new(vec![()]).unwrap());
    let probe = ConcurrencyProbe::default();
    let mut tasks = JoinSet::new();

    for _ in 0..8 {
        let pool = Arc::clone(&pool);
        let probe = probe.clone();
        tasks.spawn(async move {
            pool.exec(move |_unused| {
                Box::pin(async move {
                    let _inside = probe.enter();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, QueueError>(())
                })
            })
            .await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    assert_eq!(probe.peak(), 1, "one resource admits one operation at a time");
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn test_value_derived_from_resource_leaves_resource_in_pool() {
    let pool = ResourcePool::new(vec![String::from("conn-a")]).unwrap();

    let name = pool
        .exec(|conn| Box::pin(async move { Ok::<_, QueueError>(conn.clone()) }))
        .await
        .unwrap();

    assert_eq!(name, "conn-a");
    assert_eq!(pool.available(), 1);
    let again = pool
        .exec(|conn| Box::pin(async move { Ok::<_, QueueError>(conn.len()) }))
        .await
        .unwrap();
    assert_eq!(again, 6);
}

#[tokio::test]
async fn test_pool_as_chain_member_holds_resource() {
    let pool = Arc::new(ResourcePool::new(connections(1)).unwrap());
    let queue: Arc<dyn AsyncQueue> = pool.clone();
    let available_inside = {
        let pool = Arc::clone(&pool);
        queue
            .exec(move || async move { Ok::<_, QueueError>(pool.available()) })
            .await
            .unwrap()
    };

    assert_eq!(available_inside, 0);
    assert_eq!(pool.available(), 1);
}

/// 5 resources, 200 operations from two concurrent launchers
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_launchers_share_five_resources() {
    let pool = Arc::new(ResourcePool::new(connections(5)).unwrap());
    let probe = ConcurrencyProbe::default();
    let used = Arc::new(Mutex::new(HashSet::new()));

    let run = async {
        let mut launchers = JoinSet::new();

        // Launcher one: 100 operations in parallel
        {
            let pool = Arc::clone(&pool);
            let probe = probe.clone();
            let used = Arc::clone(&used);
            launchers.spawn(async move {
                let mut tasks = JoinSet::new();
                for _ in 0..100 {
                    let pool = Arc::clone(&pool);
                    let probe = probe.clone();
                    let used = Arc::clone(&used);
                    tasks.spawn(async move {
                        pool.exec(move |conn| {
                            Box::pin(async move {
                                let _inside = probe.enter();
                                used.lock().unwrap().insert(conn.id);
                                tokio::time::sleep(Duration::from_millis(1)).await;
                                conn.query().await
                            })
                        })
                        .await
                    });
                }
                let mut completed = 0;
                while let Some(joined) = tasks.join_next().await {
                    joined.unwrap().unwrap();
                    completed += 1;
                }
                completed
            });
        }

        // Launcher two: 100 operations one after another
        {
            let pool = Arc::clone(&pool);
            let probe = probe.clone();
            launchers.spawn(async move {
                let mut completed = 0;
                for _ in 0..100 {
                    let probe = probe.clone();
                    pool.exec(move |conn| {
                        Box::pin(async move {
                            let _inside = probe.enter();
                            conn.query().await
                        })
                    })
                    .await
                    .unwrap();
                    completed += 1;
                }
                completed
            });
        }

        let mut total = 0;
        while let Some(joined) = launchers.join_next().await {
            total += joined.unwrap();
        }
        Ok::<_, QueueError>(total)
    };

    let total = with_timeout(Duration::from_secs(10), run).await.unwrap();

    assert_eq!(total, 200);
    assert!(probe.peak() <= 5, "peak in-flight was {}", probe.peak());
    assert_eq!(probe.running(), 0);
    assert_eq!(pool.available(), 5, "resource count must be conserved");
    assert!(used.lock().unwrap().iter().all(|id| *id < 5));
}
