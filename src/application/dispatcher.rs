//! Fixed-fanout concurrent dispatch.
//!
//! A run spawns exactly `fanout` tasks at once. Each task asks the rate
//! limiter once; admitted tasks perform one unit of work, rejected tasks are
//! counted as throttled and end immediately. The run returns when every task
//! has reached a terminal outcome.

use crate::application::metrics::Metrics;
use crate::application::ports::{OperationError, RateLimiter, WriteStore};
use crate::domain::config::ConfigError;
use crate::domain::outcome::{LatencyCutoff, WorkerId, WorkerOutcome};
use crate::domain::payload::PayloadGenerator;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Result of one admitted unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// Wall-clock time spent in the store call
    pub latency: Duration,
    /// Whether the store call succeeded
    pub result: Result<(), OperationError>,
}

impl Attempt {
    /// Run `operation` and time exactly that call.
    ///
    /// Anything done before building the future (payload generation, setup)
    /// is excluded from the measured latency.
    pub async fn measure<F>(operation: F) -> Self
    where
        F: Future<Output = Result<(), OperationError>>,
    {
        let started = Instant::now();
        let result = operation.await;
        Self {
            latency: started.elapsed(),
            result,
        }
    }
}

/// Tally of terminal worker outcomes for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Workers rejected by the rate limiter
    pub throttled: usize,
    /// Admitted workers whose write succeeded
    pub succeeded: usize,
    /// Failed writes slower than the cutoff; their latency was counted
    pub counted_as_latency: usize,
    /// Failed writes at or under the cutoff, and panicked workers
    pub discarded: usize,
}

impl RunReport {
    fn record(&mut self, outcome: WorkerOutcome) {
        match outcome {
            WorkerOutcome::Throttled => self.throttled += 1,
            WorkerOutcome::Succeeded(_) => self.succeeded += 1,
            WorkerOutcome::CountedAsLatency(_) => self.counted_as_latency += 1,
            WorkerOutcome::Discarded(_) => self.discarded += 1,
        }
    }

    /// Workers admitted by the rate limiter.
    pub fn admitted(&self) -> usize {
        self.succeeded + self.failed()
    }

    /// Admitted workers whose write failed.
    pub fn failed(&self) -> usize {
        self.counted_as_latency + self.discarded
    }

    /// All terminal outcomes; equals the fanout of the run.
    pub fn total(&self) -> usize {
        self.throttled + self.admitted()
    }
}

/// Dispatches workers through a rate limiter and folds results into metrics.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    limiter: Arc<dyn RateLimiter>,
    metrics: Metrics,
    cutoff: LatencyCutoff,
}

impl Dispatcher {
    /// Create a new dispatcher.
    ///
    /// # Arguments
    /// * `limiter` - Admission control consulted once per worker
    /// * `metrics` - Shared aggregator every worker reports into
    /// * `cutoff` - Latency above which failed writes still count
    pub fn new(limiter: Arc<dyn RateLimiter>, metrics: Metrics, cutoff: LatencyCutoff) -> Self {
        Self {
            limiter,
            metrics,
            cutoff,
        }
    }

    /// Run `fanout` workers concurrently and wait for all of them.
    ///
    /// `work` is invoked once per admitted worker and must return the timed
    /// [`Attempt`] of its store call.
    ///
    /// # Errors
    /// Returns `ConfigError::ZeroFanout` if `fanout` is zero; nothing is spawned.
    pub async fn run<F, Fut>(&self, fanout: usize, work: F) -> Result<RunReport, ConfigError>
    where
        F: Fn(WorkerId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Attempt> + Send + 'static,
    {
        if fanout == 0 {
            return Err(ConfigError::ZeroFanout);
        }

        let work = Arc::new(work);
        let mut workers = JoinSet::new();

        for index in 0..fanout {
            let worker = WorkerId(index);
            let limiter = Arc::clone(&self.limiter);
            let metrics = self.metrics.clone();
            let work = Arc::clone(&work);
            let cutoff = self.cutoff;

            workers.spawn(async move {
                if !limiter.allow_request() {
                    metrics.record_throttle();
                    debug!(worker = %worker, "request throttled");
                    return WorkerOutcome::Throttled;
                }

                let attempt = (*work)(worker).await;
                settle(worker, attempt, cutoff, &metrics)
            });
        }

        let mut report = RunReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    // A panicked worker still reaches a terminal state. The
                    // admission check cannot panic, so the panic came from
                    // admitted work and counts as a failed write.
                    error!(error = %e, "worker did not complete");
                    self.metrics.record_failure();
                    report.record(WorkerOutcome::Discarded(Duration::ZERO));
                }
            }
        }

        Ok(report)
    }

    /// Run `fanout` workers that each write one random payload to `store`.
    pub async fn run_writes(
        &self,
        fanout: usize,
        store: Arc<dyn WriteStore>,
        payload: PayloadGenerator,
    ) -> Result<RunReport, ConfigError> {
        let seed: u64 = rand::random();
        self.run(fanout, move |worker| {
            let store = Arc::clone(&store);
            async move { write_once(store.as_ref(), worker, payload, seed).await }
        })
        .await
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get the latency cutoff.
    pub fn cutoff(&self) -> LatencyCutoff {
        self.cutoff
    }

    /// Get a reference to the rate limiter.
    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }
}

/// Generate a payload for `worker`, then write it and time only the write.
pub async fn write_once(
    store: &dyn WriteStore,
    worker: WorkerId,
    payload: PayloadGenerator,
    seed: u64,
) -> Attempt {
    let payload = payload.generate_seeded(seed.wrapping_add(worker.0 as u64));
    Attempt::measure(store.execute_write(&payload.key, &payload.value)).await
}

fn settle(
    worker: WorkerId,
    attempt: Attempt,
    cutoff: LatencyCutoff,
    metrics: &Metrics,
) -> WorkerOutcome {
    let outcome = WorkerOutcome::classify(attempt.result.is_ok(), attempt.latency, cutoff);

    if let Err(e) = &attempt.result {
        metrics.record_failure();
        warn!(
            worker = %worker,
            error = %e,
            latency = ?attempt.latency,
            "write failed"
        );
    }

    if let Some(latency) = outcome.counted_latency() {
        metrics.record_completion(latency);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::limiter::WindowRateLimiter;
    use crate::domain::config::RateLimiterConfig;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::mocks::{MockCaptureLayer, ScriptedStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    fn dispatcher(rate: u32, cutoff: Duration) -> Dispatcher {
        let config = RateLimiterConfig::new(rate, Duration::from_secs(3600)).unwrap();
        let limiter = WindowRateLimiter::new(config, Arc::new(SystemClock::new()));
        Dispatcher::new(
            Arc::new(limiter),
            Metrics::new(),
            LatencyCutoff::new(cutoff),
        )
    }

    fn instant_success(_worker: WorkerId) -> impl Future<Output = Attempt> + Send {
        async {
            Attempt {
                latency: Duration::from_millis(1),
                result: Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_zero_fanout_rejected() {
        let dispatcher = dispatcher(10, Duration::from_secs(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let result = dispatcher
            .run(0, move |worker| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                instant_success(worker)
            })
            .await;

        assert_eq!(result, Err(ConfigError::ZeroFanout));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fanout_100_rate_10() {
        let dispatcher = dispatcher(10, Duration::from_secs(1));

        let report = dispatcher.run(100, instant_success).await.unwrap();

        assert_eq!(report.succeeded, 10);
        assert_eq!(report.throttled, 90);
        assert_eq!(report.total(), 100);

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.completed, 10);
        assert_eq!(snapshot.throttled, 90);
        assert_eq!(snapshot.failed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_worker_reaches_terminal_outcome() {
        for fanout in [1usize, 2, 7, 64, 257] {
            let dispatcher = dispatcher(20, Duration::from_millis(50));

            let report = dispatcher
                .run(fanout, |worker| async move {
                    let result = if worker.0 % 3 == 0 {
                        Err(OperationError::Store("rejected".to_string()))
                    } else {
                        Ok(())
                    };
                    Attempt {
                        latency: Duration::from_millis(worker.0 as u64 % 100),
                        result,
                    }
                })
                .await
                .unwrap();

            assert_eq!(report.total(), fanout, "fanout = {}", fanout);
            assert_eq!(report.admitted(), fanout.min(20));
        }
    }

    #[tokio::test]
    async fn test_fast_failure_is_discarded() {
        let dispatcher = dispatcher(5, Duration::from_millis(100));

        let report = dispatcher
            .run(5, |_| async {
                Attempt {
                    latency: Duration::from_millis(2),
                    result: Err(OperationError::NotProvisioned),
                }
            })
            .await
            .unwrap();

        assert_eq!(report.discarded, 5);
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.completed, 0);
        assert_eq!(snapshot.failed, 5);
        assert_eq!(snapshot.average_latency, None);
    }

    #[tokio::test]
    async fn test_slow_failure_counts_toward_latency() {
        let dispatcher = dispatcher(4, Duration::from_millis(100));

        let report = dispatcher
            .run(4, |_| async {
                Attempt {
                    latency: Duration::from_millis(400),
                    result: Err(OperationError::Timeout(Duration::from_millis(400))),
                }
            })
            .await
            .unwrap();

        assert_eq!(report.counted_as_latency, 4);
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.completed, 4);
        assert_eq!(snapshot.failed, 4);
        assert_eq!(snapshot.average_latency, Some(Duration::from_millis(400)));
    }

    #[tokio::test]
    async fn test_panicking_worker_still_terminates() {
        let dispatcher = dispatcher(10, Duration::from_secs(1));

        let report = dispatcher
            .run(6, |worker| async move {
                if worker.0 == 3 {
                    panic!("unit of work exploded");
                }
                Attempt {
                    latency: Duration::from_millis(1),
                    result: Ok(()),
                }
            })
            .await
            .unwrap();

        assert_eq!(report.total(), 6);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.discarded, 1);
    }

    #[tokio::test]
    async fn test_panics_are_counted_only_among_admitted_workers() {
        let dispatcher = dispatcher(2, Duration::from_secs(1));

        let report = dispatcher
            .run(5, |worker| async move {
                if worker.0 < 5 {
                    panic!("store client exploded");
                }
                Attempt {
                    latency: Duration::from_millis(1),
                    result: Ok(()),
                }
            })
            .await
            .unwrap();

        assert_eq!(report.throttled, 3);
        assert_eq!(report.discarded, 2);
        assert_eq!(report.admitted(), 2);
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.throttled, 3);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.completed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_measure_excludes_setup_time() {
        let attempt = {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Attempt::measure(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            })
            .await
        };

        assert!(attempt.latency >= Duration::from_millis(10));
        assert!(attempt.latency < Duration::from_secs(1));
        assert!(attempt.result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_writes_against_scripted_store() {
        let store = Arc::new(ScriptedStore::succeeding().with_latency(Duration::from_millis(20)));
        let dispatcher = dispatcher(3, Duration::from_millis(100));

        let report = dispatcher
            .run_writes(8, store.clone(), PayloadGenerator::new(5, 10))
            .await
            .unwrap();

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.throttled, 5);
        assert_eq!(store.writes(), 3);
        let average = dispatcher.metrics().average_latency().unwrap();
        assert!(average >= Duration::from_millis(20));
        assert!(average < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_failed_write_is_logged() {
        let capture = MockCaptureLayer::new();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let store = Arc::new(ScriptedStore::failing(OperationError::Transport(
            "connection reset".to_string(),
        )));
        let dispatcher = dispatcher(2, Duration::from_secs(1));

        let report = dispatcher
            .run_writes(2, store, PayloadGenerator::default())
            .await
            .unwrap();

        assert_eq!(report.discarded, 2);
        let warnings = capture
            .get_captured()
            .into_iter()
            .filter(|e| e.level == Level::WARN)
            .count();
        assert_eq!(warnings, 2);
    }
}
