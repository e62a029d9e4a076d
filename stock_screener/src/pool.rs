//! Bounded fan-out/fan-in execution across a symbol universe.
//!
//! A job reports its outcome as `Some(result)` or opts out with `None`;
//! a panic is caught at the task boundary and logged, so one bad symbol
//! never takes down the batch. Results arrive in completion order and
//! callers that need a stable order sort afterwards.

use std::num::NonZeroU32;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Bounded-concurrency executor with an optional shared rate limit.
///
/// [`run`](WorkPool::run) dispatches I/O-bound async jobs onto the
/// runtime; [`run_blocking`](WorkPool::run_blocking) sends CPU-bound
/// closures to the blocking thread pool. Both keep at most
/// `concurrency` jobs in flight.
#[derive(Clone)]
pub struct WorkPool {
    concurrency: usize,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl WorkPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            limiter: None,
        }
    }

    /// Caps how many jobs may start per second, shared across workers.
    pub fn with_rate_limit(mut self, per_second: NonZeroU32) -> Self {
        self.limiter = Some(Arc::new(RateLimiter::direct(Quota::per_second(per_second))));
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Fans `inputs` out to async jobs and collects the `Some` results.
    pub async fn run<J, T, F, Fut>(&self, inputs: Vec<J>, job: F) -> Vec<T>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let limiter = self.limiter.clone();
        let results: Vec<Option<T>> = stream::iter(inputs)
            .map(|input| {
                let job = job.clone();
                let limiter = limiter.clone();
                async move {
                    if let Some(limiter) = limiter.as_deref() {
                        limiter.until_ready().await;
                    }
                    match tokio::spawn(job(input)).await {
                        Ok(outcome) => outcome,
                        Err(join_error) => {
                            tracing::warn!(error = %join_error, "worker task aborted");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.into_iter().flatten().collect()
    }

    /// Fans `inputs` out to CPU-bound closures on the blocking pool.
    pub async fn run_blocking<J, T, F>(&self, inputs: Vec<J>, job: F) -> Vec<T>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(J) -> Option<T> + Send + Sync + Clone + 'static,
    {
        let results: Vec<Option<T>> = stream::iter(inputs)
            .map(|input| {
                let job = job.clone();
                async move {
                    match tokio::task::spawn_blocking(move || job(input)).await {
                        Ok(outcome) => outcome,
                        Err(join_error) => {
                            tracing::warn!(error = %join_error, "worker task aborted");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.into_iter().flatten().collect()
    }
}

impl Default for WorkPool {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use nonzero_ext::nonzero;

    #[tokio::test]
    async fn failed_jobs_are_dropped_from_the_batch() {
        let pool = WorkPool::new(5);
        let inputs: Vec<usize> = (0..100).collect();
        let results = pool
            .run(inputs, |n| async move {
                if n % 10 == 3 { None } else { Some(n) }
            })
            .await;
        assert_eq!(results.len(), 90);
    }

    #[tokio::test]
    async fn a_panicking_job_does_not_take_down_the_batch() {
        let pool = WorkPool::new(4);
        let inputs: Vec<usize> = (0..10).collect();
        let results = pool
            .run(inputs, |n| async move {
                if n == 7 {
                    panic!("boom");
                }
                Some(n)
            })
            .await;
        assert_eq!(results.len(), 9);
        assert!(!results.contains(&7));
    }

    #[tokio::test]
    async fn concurrency_stays_within_the_bound() {
        let pool = WorkPool::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let inputs: Vec<usize> = (0..20).collect();

        let active_ref = Arc::clone(&active);
        let peak_ref = Arc::clone(&peak);
        let results = pool
            .run(inputs, move |n| {
                let active = Arc::clone(&active_ref);
                let peak = Arc::clone(&peak_ref);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Some(n)
                }
            })
            .await;

        assert_eq!(results.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn a_rate_limited_pool_still_finishes_the_batch() {
        let pool = WorkPool::new(5).with_rate_limit(nonzero!(1000u32));
        let inputs: Vec<usize> = (0..25).collect();
        let results = pool.run(inputs, |n| async move { Some(n * 2) }).await;
        assert_eq!(results.len(), 25);
    }

    #[tokio::test]
    async fn blocking_jobs_fan_out_and_back() {
        let pool = WorkPool::new(5);
        let inputs: Vec<u64> = (0..50).collect();
        let results = pool
            .run_blocking(inputs, |n| if n % 10 == 0 { None } else { Some(n * n) })
            .await;
        assert_eq!(results.len(), 45);
    }

    #[tokio::test]
    async fn an_empty_universe_produces_no_results() {
        let pool = WorkPool::new(5);
        let results = pool.run(Vec::<u32>::new(), |n| async move { Some(n) }).await;
        assert!(results.is_empty());
    }
}
