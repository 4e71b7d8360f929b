//! Worker identity, terminal outcomes, and the latency cutoff.
//!
//! Every dispatched worker ends in exactly one [`WorkerOutcome`]:
//!
//! ```text
//! Pending ─┬─► Throttled
//!          └─► Admitted ─┬─► Succeeded
//!                        └─► Failed ─┬─► CountedAsLatency   (latency > cutoff)
//!                                    └─► Discarded          (latency <= cutoff)
//! ```
//!
//! Counting slow failures as completions mixes error accounting into latency
//! accounting. It is kept for compatibility with existing result sets and
//! should not be extended to other outcome kinds.

use std::fmt;
use std::time::Duration;

/// Identifier of one dispatched worker, in `0..fanout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal outcome of one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Rejected by the rate limiter; the write was never attempted
    Throttled,
    /// Write succeeded; latency counts toward the average
    Succeeded(Duration),
    /// Write failed slowly enough to look like a timeout; latency counts
    CountedAsLatency(Duration),
    /// Write failed fast; reported but excluded from the average
    Discarded(Duration),
}

impl WorkerOutcome {
    /// Classify an admitted attempt.
    pub fn classify(succeeded: bool, latency: Duration, cutoff: LatencyCutoff) -> Self {
        if succeeded {
            WorkerOutcome::Succeeded(latency)
        } else if cutoff.is_exceeded_by(latency) {
            WorkerOutcome::CountedAsLatency(latency)
        } else {
            WorkerOutcome::Discarded(latency)
        }
    }

    /// Latency to fold into the aggregate, if this outcome counts.
    pub fn counted_latency(&self) -> Option<Duration> {
        match self {
            WorkerOutcome::Succeeded(latency) | WorkerOutcome::CountedAsLatency(latency) => {
                Some(*latency)
            }
            WorkerOutcome::Throttled | WorkerOutcome::Discarded(_) => None,
        }
    }

    /// Check if the worker was admitted by the rate limiter.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, WorkerOutcome::Throttled)
    }
}

/// Threshold above which a failed write still counts toward latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyCutoff(Duration);

impl LatencyCutoff {
    /// Cutoff used when no per-request timeout is configured.
    pub const DEFAULT: LatencyCutoff = LatencyCutoff(Duration::from_secs(1));

    /// Create a cutoff from an explicit threshold.
    pub fn new(threshold: Duration) -> Self {
        Self(threshold)
    }

    /// Derive the cutoff from the per-request timeout.
    ///
    /// One fifth of the timeout, or one second when the timeout is absent or zero.
    pub fn from_request_timeout(timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) if !timeout.is_zero() => Self(timeout / 5),
            _ => Self::DEFAULT,
        }
    }

    /// The threshold duration.
    pub fn threshold(&self) -> Duration {
        self.0
    }

    /// Check if a latency is strictly above the threshold.
    pub fn is_exceeded_by(&self, latency: Duration) -> bool {
        latency > self.0
    }
}

impl Default for LatencyCutoff {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_from_timeout() {
        let cutoff = LatencyCutoff::from_request_timeout(Some(Duration::from_secs(5)));
        assert_eq!(cutoff.threshold(), Duration::from_secs(1));

        let cutoff = LatencyCutoff::from_request_timeout(Some(Duration::from_millis(500)));
        assert_eq!(cutoff.threshold(), Duration::from_millis(100));
    }

    #[test]
    fn test_cutoff_without_timeout() {
        assert_eq!(
            LatencyCutoff::from_request_timeout(None).threshold(),
            Duration::from_secs(1)
        );
        assert_eq!(
            LatencyCutoff::from_request_timeout(Some(Duration::ZERO)).threshold(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_cutoff_is_strict() {
        let cutoff = LatencyCutoff::new(Duration::from_millis(100));
        assert!(!cutoff.is_exceeded_by(Duration::from_millis(100)));
        assert!(cutoff.is_exceeded_by(Duration::from_millis(101)));
    }

    #[test]
    fn test_classify_success() {
        let cutoff = LatencyCutoff::new(Duration::from_millis(100));
        let outcome = WorkerOutcome::classify(true, Duration::from_millis(5), cutoff);
        assert_eq!(outcome, WorkerOutcome::Succeeded(Duration::from_millis(5)));
        assert_eq!(outcome.counted_latency(), Some(Duration::from_millis(5)));
    }

    #[test]
    fn test_classify_slow_failure_counts() {
        let cutoff = LatencyCutoff::new(Duration::from_millis(100));
        let outcome = WorkerOutcome::classify(false, Duration::from_millis(250), cutoff);
        assert_eq!(
            outcome,
            WorkerOutcome::CountedAsLatency(Duration::from_millis(250))
        );
        assert_eq!(outcome.counted_latency(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_classify_fast_failure_discarded() {
        let cutoff = LatencyCutoff::new(Duration::from_millis(100));
        let outcome = WorkerOutcome::classify(false, Duration::from_millis(3), cutoff);
        assert_eq!(outcome, WorkerOutcome::Discarded(Duration::from_millis(3)));
        assert_eq!(outcome.counted_latency(), None);
        assert!(outcome.is_admitted());
    }

    #[test]
    fn test_throttled_is_not_admitted() {
        assert!(!WorkerOutcome::Throttled.is_admitted());
        assert_eq!(WorkerOutcome::Throttled.counted_latency(), None);
    }
}
