//! Inbound frame validation.
//!
//! [`validate`] is a pure function of the raw bytes. Size is checked before
//! any parsing, so an oversized frame is never handed to the JSON parser.

use serde_json::{Map, Value};
use thiserror::Error;

use super::frames::InboundFrame;
use crate::ids::MatchId;

/// Largest inbound frame, in bytes, accepted by the protocol.
///
/// The transport enforces its own, larger cap before frames get here.
pub const MAX_MESSAGE_BYTES: usize = 10_000;

/// Why an inbound frame was rejected.
///
/// None of these are fatal to the connection: each is answered with a
/// single `error` frame carrying the [`Display`](std::fmt::Display) text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Frame exceeds [`MAX_MESSAGE_BYTES`].
    #[error("Message too large: {size} bytes (limit {limit})")]
    TooLarge {
        /// Actual frame size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Not JSON, or not a JSON object.
    #[error("Invalid message format")]
    InvalidFormat,

    /// Object without a string `type` field.
    #[error("Invalid message format: missing type")]
    MissingType,

    /// `type` names no known frame kind.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// `subscribe`/`unsubscribe` without a positive integer `matchId`.
    #[error("Invalid {kind}: matchId must be a positive integer")]
    InvalidMatchId {
        /// The frame kind that was missing it.
        kind: &'static str,
    },
}

impl ValidationError {
    /// Whether this is a well-formed frame with invalid content, as opposed
    /// to an oversized or unparseable one.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::MissingType | Self::UnknownType(_) | Self::InvalidMatchId { .. }
        )
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooLarge { .. } => "too_large",
            Self::InvalidFormat => "invalid_format",
            Self::MissingType => "missing_type",
            Self::UnknownType(_) => "unknown_type",
            Self::InvalidMatchId { .. } => "invalid_match_id",
        }
    }
}

/// Parse and type-check one inbound frame.
pub fn validate(raw: &[u8]) -> Result<InboundFrame, ValidationError> {
    if raw.len() > MAX_MESSAGE_BYTES {
        return Err(ValidationError::TooLarge {
            size: raw.len(),
            limit: MAX_MESSAGE_BYTES,
        });
    }

    let value: Value = serde_json::from_slice(raw).map_err(|_| ValidationError::InvalidFormat)?;
    let Value::Object(obj) = value else {
        return Err(ValidationError::InvalidFormat);
    };

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingType)?;

    match kind {
        "subscribe" => Ok(InboundFrame::Subscribe {
            match_id: required_match_id(&obj, "subscribe")?,
        }),
        "unsubscribe" => Ok(InboundFrame::Unsubscribe {
            match_id: required_match_id(&obj, "unsubscribe")?,
        }),
        "ping" => Ok(InboundFrame::Ping),
        "pong" => Ok(InboundFrame::Pong),
        other => Err(ValidationError::UnknownType(other.to_owned())),
    }
}

fn required_match_id(
    obj: &Map<String, Value>,
    kind: &'static str,
) -> Result<MatchId, ValidationError> {
    obj.get("matchId")
        .and_then(Value::as_u64)
        .and_then(MatchId::new)
        .ok_or(ValidationError::InvalidMatchId { kind })
}
