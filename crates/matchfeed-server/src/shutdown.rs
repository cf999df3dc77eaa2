//! Shutdown phases for the listener and the heartbeat monitor.
//!
//! The heartbeat stops first so no eviction races the hub teardown, then the
//! listener stops accepting, then the server task is drained with a bound.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How a bounded drain ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every task finished in time.
    Completed,
    /// The bound elapsed and stragglers were aborted.
    TimedOut,
}

/// Owns the cancellation tokens that stop background work.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    accept: CancellationToken,
    heartbeat: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator with nothing stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token the listener watches for graceful shutdown.
    pub fn accept_token(&self) -> CancellationToken {
        self.accept.clone()
    }

    /// Token the heartbeat monitor runs under.
    pub fn heartbeat_token(&self) -> CancellationToken {
        self.heartbeat.clone()
    }

    /// Stop the heartbeat monitor. Idempotent.
    pub fn stop_heartbeat(&self) {
        self.heartbeat.cancel();
    }

    /// Stop accepting connections. Idempotent.
    pub fn stop_accepting(&self) {
        self.accept.cancel();
    }

    /// Whether the listener has been told to stop.
    pub fn is_shutting_down(&self) -> bool {
        self.accept.is_cancelled()
    }

    /// Stop accepting, then wait up to `timeout` for `handles`, aborting
    /// whatever is still running afterwards.
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>, timeout: Duration) -> DrainOutcome {
        self.stop_accepting();
        info!(
            tasks = handles.len(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "draining server tasks"
        );

        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_ok()
        {
            return DrainOutcome::Completed;
        }

        warn!(?timeout, "drain timed out, aborting remaining tasks");
        for handle in aborts {
            handle.abort();
        }
        DrainOutcome::TimedOut
    }
}
