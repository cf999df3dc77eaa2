//! Heartbeat ping/pong liveness monitoring.
//!
//! One monitor supervises every connection. On each tick a connection whose
//! alive flag is set is flipped to pending and probed; a connection still
//! pending from the previous tick is evicted through the hub. A probe that
//! cannot be enqueued leaves the connection pending, so it is evicted on
//! the next tick.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{DisconnectReason, Hub};
use crate::metrics as names;
use crate::websocket::connection::ConnectionState;

/// Result of one heartbeat tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Connections probed this tick.
    pub probed: usize,
    /// Connections evicted this tick.
    pub evicted: usize,
}

/// Periodic liveness supervisor.
#[derive(Clone, Debug)]
pub struct HeartbeatMonitor {
    hub: Arc<Hub>,
    interval: Duration,
}

impl HeartbeatMonitor {
    /// Create a monitor with the given probe period.
    pub fn new(hub: Arc<Hub>, interval: Duration) -> Self {
        Self { hub, interval }
    }

    /// Run one supervision pass.
    pub fn tick(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();

        for conn in self.hub.connections() {
            if matches!(
                conn.state(),
                ConnectionState::Closing | ConnectionState::Closed
            ) {
                continue;
            }

            if !conn.check_alive() {
                if self
                    .hub
                    .disconnect(&conn.id, DisconnectReason::HeartbeatTimeout)
                    .is_some()
                {
                    report.evicted += 1;
                    counter!(names::WS_HEARTBEAT_EVICTIONS_TOTAL).increment(1);
                    warn!(conn_id = %conn.id, "heartbeat not acknowledged, evicting");
                }
                continue;
            }

            report.probed += 1;
            if let Err(e) = conn.send_ping() {
                debug!(conn_id = %conn.id, error = %e, "failed to enqueue heartbeat probe");
            }
        }

        if report.evicted > 0 {
            info!(
                probed = report.probed,
                evicted = report.evicted,
                "heartbeat tick"
            );
        }
        report
    }

    /// Tick every `interval` until `cancel` fires. The first tick happens
    /// one full interval after start.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick
        let _ = ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = self.tick();
                }
                () = cancel.cancelled() => {
                    debug!("heartbeat monitor stopped");
                    return;
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
