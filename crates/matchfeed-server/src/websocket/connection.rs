//! WebSocket client connection state.
//!
//! A [`ClientConnection`] is the registry-owned value for one transport
//! session. Every outbound frame for the connection goes through its bounded
//! queue, which a single writer task drains, so writes to one socket are
//! always serialized.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};

use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use matchfeed_core::ConnectionId;
use matchfeed_core::protocol::OutboundFrame;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Bytes enqueued but not yet written above which a connection is
/// considered congested and further frames are dropped.
pub const BACKPRESSURE_THRESHOLD_BYTES: usize = 1024 * 1024;

/// An item for the connection's writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// A text frame.
    Text(Utf8Bytes),
    /// A transport-level liveness probe.
    Ping,
}

/// Lifecycle state of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Registered, `connected` frame not yet queued.
    Connecting = 0,
    /// Accepting inbound frames and broadcasts.
    Open = 1,
    /// Teardown started; excluded from broadcasts.
    Closing = 2,
    /// Writer finished. Terminal.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Why a send to one connection did not happen.
#[derive(Debug, Error)]
pub enum SendError {
    /// The connection is closing or its writer is gone.
    #[error("connection closed")]
    Closed,
    /// The outbound backlog is over the threshold or the queue is full.
    #[error("connection congested ({queued_bytes} bytes queued)")]
    Backpressure {
        /// Backlog at the time of the attempt.
        queued_bytes: usize,
    },
    /// The frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Represents a connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// When this connection was accepted.
    pub connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Outbound>,
    state: AtomicU8,
    is_alive: AtomicBool,
    queued_bytes: AtomicUsize,
    dropped_messages: AtomicU64,
    cancel: CancellationToken,
}

impl ClientConnection {
    /// Create a new connection in the `Connecting` state.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Outbound>, cancel: CancellationToken) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            tx,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            is_alive: AtomicBool::new(true),
            queued_bytes: AtomicUsize::new(0),
            dropped_messages: AtomicU64::new(0),
            cancel,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether broadcasts should reach this connection.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// `Connecting -> Open`. Returns `false` if teardown already began.
    pub fn mark_open(&self) -> bool {
        self.transition(ConnectionState::Connecting, ConnectionState::Open)
    }

    /// Move to `Closing` from `Connecting` or `Open`.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn begin_close(&self) -> bool {
        self.transition(ConnectionState::Open, ConnectionState::Closing)
            || self.transition(ConnectionState::Connecting, ConnectionState::Closing)
    }

    /// Enter the terminal `Closed` state.
    pub fn mark_closed(&self) {
        self.state.store(ConnectionState::Closed as u8, Ordering::Release);
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enqueue a text frame.
    ///
    /// Fails without queuing when the connection is closing, when the
    /// unwritten backlog is over [`BACKPRESSURE_THRESHOLD_BYTES`], or when
    /// the queue is full. Never waits.
    pub fn send_text(&self, frame: Utf8Bytes) -> Result<(), SendError> {
        if matches!(
            self.state(),
            ConnectionState::Closing | ConnectionState::Closed
        ) {
            return Err(SendError::Closed);
        }

        let len = frame.as_str().len();
        let backlog = self.queued_bytes.fetch_add(len, Ordering::AcqRel);
        if backlog > BACKPRESSURE_THRESHOLD_BYTES {
            self.release_queued(len);
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            return Err(SendError::Backpressure {
                queued_bytes: backlog,
            });
        }

        match self.tx.try_send(Outbound::Text(frame)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.release_queued(len);
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Backpressure {
                    queued_bytes: backlog,
                })
            }
            Err(TrySendError::Closed(_)) => {
                self.release_queued(len);
                Err(SendError::Closed)
            }
        }
    }

    /// Serialize and enqueue a protocol frame.
    pub fn send_frame(&self, frame: &OutboundFrame) -> Result<(), SendError> {
        let json = frame.to_json()?;
        self.send_text(Utf8Bytes::from(json))
    }

    /// Enqueue a liveness probe.
    pub fn send_ping(&self) -> Result<(), SendError> {
        self.tx.try_send(Outbound::Ping).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Backpressure {
                queued_bytes: self.queued_bytes(),
            },
            TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Called by the writer once `len` bytes have left the queue.
    pub fn release_queued(&self, len: usize) {
        let _ = self.queued_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    /// Bytes enqueued and not yet written.
    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes.load(Ordering::Acquire)
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (probe acknowledged).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection acknowledged since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Current value of the alive flag.
    pub fn is_alive(&self) -> bool {
        self.is_alive.load(Ordering::Relaxed)
    }

    /// Token cancelled when the connection must shut down.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Signal the session and writer to stop.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("is_alive", &self.is_alive())
            .field("queued_bytes", &self.queued_bytes())
            .finish_non_exhaustive()
    }
}
