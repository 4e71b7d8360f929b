//! Abrupt shutdown and watchdogs.
//!
//! A process-timeout watchdog and an interrupt watchdog race the run. Either
//! one, or the normal end of the run, may trigger cleanup of the store; the
//! cleanup itself runs at most once. In-flight workers are not drained.

use crate::application::ports::WriteStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Why the run is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// All workers finished
    Completed,
    /// Repeated interrupt signal
    Interrupted,
    /// The process timeout elapsed
    ProcessTimeout,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Completed => write!(f, "completed"),
            ShutdownReason::Interrupted => write!(f, "interrupted"),
            ShutdownReason::ProcessTimeout => write!(f, "process timeout"),
        }
    }
}

/// Called after cleanup on an abrupt shutdown. The binary exits the process here.
pub type ExitHook = Arc<dyn Fn(ShutdownReason) + Send + Sync + 'static>;

/// Runs store cleanup exactly once, whoever asks first.
pub struct ShutdownCoordinator {
    store: Arc<dyn WriteStore>,
    drop_after: bool,
    cleaned_up: OnceCell<ShutdownReason>,
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("drop_after", &self.drop_after)
            .field("cleaned_up", &self.cleaned_up.get())
            .finish_non_exhaustive()
    }
}

impl ShutdownCoordinator {
    /// Create a coordinator for `store`.
    ///
    /// # Arguments
    /// * `store` - The store to clean up
    /// * `drop_after` - Whether cleanup drops the provisioned namespace
    pub fn new(store: Arc<dyn WriteStore>, drop_after: bool) -> Self {
        Self {
            store,
            drop_after,
            cleaned_up: OnceCell::new(),
        }
    }

    /// Clean up the store if nobody has yet.
    ///
    /// Concurrent callers wait for the one cleanup in progress. Returns the
    /// reason of the caller that actually performed it.
    pub async fn cleanup(&self, reason: ShutdownReason) -> ShutdownReason {
        *self
            .cleaned_up
            .get_or_init(|| async move {
                info!(%reason, "cleaning up");
                if self.drop_after {
                    if let Err(e) = self.store.teardown().await {
                        warn!(error = %e, "failed to drop provisioned namespace");
                    }
                }
                reason
            })
            .await
    }

    /// Clean up, then hand control to the exit hook.
    pub async fn abort(&self, reason: ShutdownReason, exit: &ExitHook) {
        self.cleanup(reason).await;
        exit(reason);
    }

    /// Check if cleanup has already run.
    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.initialized()
    }
}

/// Abort the run once `after` has elapsed.
pub fn spawn_timeout_watchdog(
    coordinator: Arc<ShutdownCoordinator>,
    after: Duration,
    exit: ExitHook,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        eprintln!("\nProcess took longer than expected, timeout error");
        coordinator
            .abort(ShutdownReason::ProcessTimeout, &exit)
            .await;
    })
}

/// Register the interrupt handler once and forward every delivery.
///
/// The returned receiver yields one `()` per received interrupt. Signals that
/// arrive before anyone awaits the receiver are buffered, not lost.
///
/// # Errors
/// Returns the I/O error if the signal handler cannot be installed.
pub fn listen_for_interrupts() -> std::io::Result<mpsc::UnboundedReceiver<()>> {
    let (tx, rx) = mpsc::unbounded_channel();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupts = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            while interrupts.recv().await.is_some() {
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

/// Abort the run on the second interrupt.
///
/// The first interrupt only prints a notice. If the sender side goes away
/// first, the watchdog returns without aborting.
pub fn spawn_interrupt_watchdog(
    coordinator: Arc<ShutdownCoordinator>,
    mut interrupts: mpsc::UnboundedReceiver<()>,
    exit: ExitHook,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interrupts.recv().await.is_none() {
            return;
        }
        eprintln!("\ninterrupted");

        if interrupts.recv().await.is_none() {
            return;
        }
        eprintln!("\nkilled");
        coordinator.abort(ShutdownReason::Interrupted, &exit).await;
    })
}
