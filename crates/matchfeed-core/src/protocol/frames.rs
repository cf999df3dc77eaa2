//! Inbound and outbound frame types.

use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionId, MatchId};

/// A validated client frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundFrame {
    /// Join the topic for `match_id`.
    Subscribe {
        /// Topic to join.
        match_id: MatchId,
    },
    /// Leave the topic for `match_id`.
    Unsubscribe {
        /// Topic to leave.
        match_id: MatchId,
    },
    /// Application-level ping; answered with [`OutboundFrame::Pong`].
    Ping,
    /// Application-level heartbeat acknowledgment.
    Pong,
}

impl InboundFrame {
    /// Wire name of this frame kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

/// A frame the hub sends to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    /// Sent immediately after accept.
    Connected {
        /// The id assigned to this connection.
        client_id: ConnectionId,
    },
    /// Acknowledges a `subscribe`.
    Subscribed {
        /// Topic joined.
        match_id: MatchId,
        /// Human-readable confirmation.
        message: String,
    },
    /// Acknowledges an `unsubscribe`.
    Unsubscribed {
        /// Topic left.
        match_id: MatchId,
        /// Human-readable confirmation.
        message: String,
    },
    /// Validation or protocol failure. The connection stays open.
    Error {
        /// Description of the problem.
        message: String,
    },
    /// Reply to a client `ping`.
    Pong {
        /// Server time in epoch milliseconds.
        timestamp: i64,
    },
    /// Broadcast to every connection before a graceful shutdown.
    ServerShutdown {
        /// Human-readable notice.
        message: String,
    },
}

impl OutboundFrame {
    /// `subscribed` acknowledgment for `match_id`.
    pub fn subscribed(match_id: MatchId) -> Self {
        Self::Subscribed {
            match_id,
            message: format!("Subscribed to match {match_id}"),
        }
    }

    /// `unsubscribed` acknowledgment for `match_id`.
    pub fn unsubscribed(match_id: MatchId) -> Self {
        Self::Unsubscribed {
            match_id,
            message: format!("Unsubscribed from match {match_id}"),
        }
    }

    /// `error` frame carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// `pong` stamped with the current wall-clock time.
    pub fn pong_now() -> Self {
        Self::Pong {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// `server_shutdown` with the standard notice.
    pub fn server_shutdown() -> Self {
        Self::ServerShutdown {
            message: "Server is shutting down".into(),
        }
    }

    /// Serialize to a JSON text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn mid(n: u64) -> MatchId {
        MatchId::new(n).unwrap()
    }

    fn to_value(frame: &OutboundFrame) -> Value {
        serde_json::from_str(&frame.to_json().unwrap()).unwrap()
    }

    #[test]
    fn connected_uses_client_id_field() {
        let frame = OutboundFrame::Connected {
            client_id: ConnectionId::from("client_1"),
        };
        assert_eq!(
            to_value(&frame),
            json!({"type": "connected", "clientId": "client_1"})
        );
    }

    #[test]
    fn subscribed_carries_match_id_and_message() {
        assert_eq!(
            to_value(&OutboundFrame::subscribed(mid(7))),
            json!({"type": "subscribed", "matchId": 7, "message": "Subscribed to match 7"})
        );
    }

    #[test]
    fn unsubscribed_carries_match_id_and_message() {
        assert_eq!(
            to_value(&OutboundFrame::unsubscribed(mid(3))),
            json!({"type": "unsubscribed", "matchId": 3, "message": "Unsubscribed from match 3"})
        );
    }

    #[test]
    fn error_frame() {
        assert_eq!(
            to_value(&OutboundFrame::error("bad")),
            json!({"type": "error", "message": "bad"})
        );
    }

    #[test]
    fn pong_timestamp_is_epoch_millis() {
        let before = chrono::Utc::now().timestamp_millis();
        let value = to_value(&OutboundFrame::pong_now());
        assert_eq!(value["type"], "pong");
        let ts = value["timestamp"].as_i64().unwrap();
        assert!(ts >= before);
    }

    #[test]
    fn server_shutdown_frame() {
        assert_eq!(
            to_value(&OutboundFrame::server_shutdown()),
            json!({"type": "server_shutdown", "message": "Server is shutting down"})
        );
    }

    #[test]
    fn outbound_parses_back() {
        let frame = OutboundFrame::subscribed(mid(9));
        let back: OutboundFrame = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn inbound_kind_names() {
        assert_eq!(InboundFrame::Subscribe { match_id: mid(1) }.kind(), "subscribe");
        assert_eq!(InboundFrame::Unsubscribe { match_id: mid(1) }.kind(), "unsubscribe");
        assert_eq!(InboundFrame::Ping.kind(), "ping");
        assert_eq!(InboundFrame::Pong.kind(), "pong");
    }
}
