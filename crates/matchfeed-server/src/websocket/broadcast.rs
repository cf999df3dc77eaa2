//! Payload fan-out to connected clients.
//!
//! Each broadcast sanitizes and serializes its payload once, snapshots its
//! recipients from the hub, then enqueues the shared frame on every
//! recipient without waiting. A closed or congested recipient is skipped
//! and counted; it never affects delivery to the others.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use matchfeed_core::MatchId;
use matchfeed_core::protocol::sanitize;
use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::connection::{ClientConnection, SendError};
use crate::events::MatchEvent;
use crate::hub::Hub;
use crate::metrics as names;

/// A broadcast payload could not be encoded. Nothing was sent.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Payload serialization failed.
    #[error("failed to serialize broadcast payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-call delivery summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections in the snapshot.
    pub recipients: usize,
    /// Frames enqueued.
    pub delivered: usize,
    /// Recipients skipped because they were not open.
    pub skipped_closed: usize,
    /// Recipients skipped because they were congested.
    pub dropped_backpressure: usize,
}

impl BroadcastReport {
    /// Recipients that did not get the frame.
    pub fn skipped(&self) -> usize {
        self.skipped_closed + self.dropped_backpressure
    }
}

/// Broadcast engine over the hub's connections.
#[derive(Clone, Debug)]
pub struct BroadcastManager {
    hub: Arc<Hub>,
}

impl BroadcastManager {
    /// Create a broadcast manager for `hub`.
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Send `payload` to every open subscriber of `match_id`.
    ///
    /// A topic with no subscribers is a no-op.
    pub fn broadcast_to_topic<T: Serialize + ?Sized>(
        &self,
        match_id: MatchId,
        payload: &T,
    ) -> Result<BroadcastReport, BroadcastError> {
        let recipients = self.hub.subscribers_of(match_id);
        if recipients.is_empty() {
            debug!(%match_id, "broadcast to topic without subscribers");
            return Ok(BroadcastReport::default());
        }
        let frame = encode(payload)?;
        let report = fan_out(&recipients, &frame);
        record(&report, "topic");
        debug!(
            %match_id,
            recipients = report.recipients,
            delivered = report.delivered,
            skipped = report.skipped(),
            "broadcast to topic"
        );
        Ok(report)
    }

    /// Send `payload` to every open connection.
    pub fn broadcast_to_all<T: Serialize + ?Sized>(
        &self,
        payload: &T,
    ) -> Result<BroadcastReport, BroadcastError> {
        let recipients = self.hub.connections();
        if recipients.is_empty() {
            return Ok(BroadcastReport::default());
        }
        let frame = encode(payload)?;
        let report = fan_out(&recipients, &frame);
        record(&report, "all");
        debug!(
            recipients = report.recipients,
            delivered = report.delivered,
            skipped = report.skipped(),
            "broadcast to all"
        );
        Ok(report)
    }

    /// Publish a producer event to its topic, or to everyone.
    pub fn publish(&self, event: &MatchEvent) -> Result<BroadcastReport, BroadcastError> {
        debug!(event = event.kind(), "publishing event");
        match event.topic() {
            Some(match_id) => self.broadcast_to_topic(match_id, event),
            None => self.broadcast_to_all(event),
        }
    }
}

fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<Utf8Bytes, BroadcastError> {
    let value = sanitize(serde_json::to_value(payload)?);
    Ok(Utf8Bytes::from(serde_json::to_string(&value)?))
}

fn fan_out(recipients: &[Arc<ClientConnection>], frame: &Utf8Bytes) -> BroadcastReport {
    let mut report = BroadcastReport {
        recipients: recipients.len(),
        ..BroadcastReport::default()
    };

    for conn in recipients {
        if !conn.is_open() {
            report.skipped_closed += 1;
            continue;
        }
        match conn.send_text(frame.clone()) {
            Ok(()) => report.delivered += 1,
            Err(SendError::Backpressure { queued_bytes }) => {
                report.dropped_backpressure += 1;
                warn!(conn_id = %conn.id, queued_bytes, "recipient congested, dropping frame");
            }
            Err(e) => {
                report.skipped_closed += 1;
                warn!(conn_id = %conn.id, error = %e, "failed to send to recipient");
            }
        }
    }
    report
}

fn record(report: &BroadcastReport, scope: &'static str) {
    counter!(names::WS_BROADCASTS_TOTAL, "scope" => scope).increment(1);
    counter!(names::WS_BROADCAST_DELIVERIES_TOTAL).increment(report.delivered as u64);
    if report.dropped_backpressure > 0 {
        counter!(names::WS_BROADCAST_DROPS_TOTAL, "cause" => "backpressure")
            .increment(report.dropped_backpressure as u64);
    }
    if report.skipped_closed > 0 {
        counter!(names::WS_BROADCAST_DROPS_TOTAL, "cause" => "closed")
            .increment(report.skipped_closed as u64);
    }
}
