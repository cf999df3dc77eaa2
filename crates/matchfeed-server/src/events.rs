//! Typed events published by the data layer.
//!
//! Each variant serializes to the frame clients receive, e.g.
//! `{"type":"score_update","matchId":42,"data":{...}}`.

use matchfeed_core::MatchId;
use serde::Serialize;
use serde_json::Value;

/// A producer event bound for connected clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum MatchEvent {
    /// A new match exists. Sent to every connection.
    MatchCreated {
        /// The match record.
        data: Value,
    },
    /// Score changed. Sent to the match's subscribers.
    ScoreUpdate {
        /// Match the update belongs to.
        match_id: MatchId,
        /// Updated score fields.
        data: Value,
    },
    /// New commentary entry. Sent to the match's subscribers.
    Commentary {
        /// Match the entry belongs to.
        match_id: MatchId,
        /// The commentary record.
        data: Value,
    },
}

impl MatchEvent {
    /// The topic this event targets, or `None` for everyone.
    pub fn topic(&self) -> Option<MatchId> {
        match self {
            Self::MatchCreated { .. } => None,
            Self::ScoreUpdate { match_id, .. } | Self::Commentary { match_id, .. } => {
                Some(*match_id)
            }
        }
    }

    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MatchCreated { .. } => "match_created",
            Self::ScoreUpdate { .. } => "score_update",
            Self::Commentary { .. } => "commentary",
        }
    }
}
