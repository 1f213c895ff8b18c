//! Bounded-concurrency admission for logical calls.
//!
//! The queue caps how many logical calls run at once. A slot covers the
//! entire call, retries and backoff sleeps included, and is released when
//! the call finishes regardless of outcome. Waiting calls are admitted in
//! FIFO order.

use crate::error::{ApiError, ApiResult};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of concurrently executing logical calls.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyPolicy {
    /// Maximum concurrent calls; `0` means unbounded.
    pub max_concurrent: usize,
}

impl ConcurrencyPolicy {
    /// A policy that admits at most `max_concurrent` calls at once.
    pub fn bounded(max_concurrent: usize) -> Self {
        Self { max_concurrent }
    }

    /// A policy that admits every call immediately.
    pub fn unbounded() -> Self {
        Self { max_concurrent: 0 }
    }
}

impl Default for ConcurrencyPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Admits logical calls up to the configured bound.
#[derive(Clone)]
pub(crate) struct RequestQueue {
    permits: Option<Arc<Semaphore>>,
}

/// A held concurrency slot. Dropping it frees the slot and admits the
/// longest-waiting call.
pub(crate) struct QueuePermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl RequestQueue {
    pub(crate) fn new(policy: ConcurrencyPolicy) -> Self {
        let permits =
            (policy.max_concurrent > 0).then(|| Arc::new(Semaphore::new(policy.max_concurrent)));
        Self { permits }
    }

    /// Waits for a free slot. Unbounded queues admit immediately with no
    /// bookkeeping.
    pub(crate) async fn admit(&self) -> ApiResult<QueuePermit> {
        let permit = match &self.permits {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| ApiError::Unknown {
                        message: "request queue closed".to_string(),
                        source: None,
                    })?,
            ),
            None => None,
        };
        Ok(QueuePermit { _permit: permit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn unbounded_admits_immediately() {
        let queue = RequestQueue::new(ConcurrencyPolicy::unbounded());
        let mut held = Vec::new();
        for _ in 0..100 {
            held.push(queue.admit().await.unwrap());
        }
    }

    #[tokio::test]
    async fn bounded_blocks_at_capacity_and_drains_on_release() {
        let queue = RequestQueue::new(ConcurrencyPolicy::bounded(2));
        let first = queue.admit().await.unwrap();
        let _second = queue.admit().await.unwrap();

        // Third call must wait while both slots are held.
        let blocked = tokio::time::timeout(Duration::from_millis(20), queue.admit()).await;
        assert!(blocked.is_err(), "third admit should block at capacity 2");

        drop(first);
        let admitted = tokio::time::timeout(Duration::from_millis(100), queue.admit()).await;
        assert!(admitted.is_ok(), "freed slot should admit a waiting call");
    }

    #[tokio::test]
    async fn waiters_are_admitted_in_arrival_order() {
        let queue = RequestQueue::new(ConcurrencyPolicy::bounded(1));
        let held = queue.admit().await.unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..4 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let permit = queue.admit().await.unwrap();
                order.lock().unwrap().push(i);
                drop(permit);
            }));
            // Let each waiter register with the semaphore before the next
            // arrives, so arrival order is known.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        drop(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
