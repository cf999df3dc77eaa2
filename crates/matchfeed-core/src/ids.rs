//! Identifier newtypes.
//!
//! [`ConnectionId`] is an opaque string assigned when a transport session is
//! accepted (`client_` followed by a UUID v7, so ids sort by accept time).
//! [`MatchId`] names a topic; it is the positive integer carried in the
//! `matchId` field of `subscribe`/`unsubscribe` frames.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one accepted connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Allocate a fresh id, unique for the lifetime of the process.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("client_{}", Uuid::now_v7()))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for ConnectionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Topic identifier: a match. Always non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(NonZeroU64);

impl MatchId {
    /// Build from a raw integer. Returns `None` for zero.
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw integer value.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NonZeroU64> for MatchId {
    fn from(n: NonZeroU64) -> Self {
        Self(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_has_client_prefix_and_v7_uuid() {
        let id = ConnectionId::new();
        let suffix = id.as_str().strip_prefix("client_").unwrap();
        let parsed = Uuid::parse_str(suffix).unwrap();
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn connection_id_display_and_deref() {
        let id = ConnectionId::from("client_abc");
        assert_eq!(format!("{id}"), "client_abc");
        let s: &str = &id;
        assert_eq!(s, "client_abc");
    }

    #[test]
    fn connection_id_serializes_as_plain_string() {
        let id = ConnectionId::from("client_x");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"client_x\"");
    }

    #[test]
    fn match_id_rejects_zero() {
        assert!(MatchId::new(0).is_none());
        assert_eq!(MatchId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn match_id_serde_is_transparent() {
        let id = MatchId::new(42).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: MatchId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<MatchId>("0").is_err());
    }

    #[test]
    fn match_id_display() {
        assert_eq!(MatchId::new(5).unwrap().to_string(), "5");
    }
}
