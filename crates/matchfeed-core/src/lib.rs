//! # matchfeed-core
//!
//! Shared vocabulary for the matchfeed broadcast hub.
//!
//! - **Identifiers**: [`ConnectionId`] and [`MatchId`] newtypes
//! - **Protocol**: inbound/outbound frame types, the message validator, and
//!   the payload sanitizer applied before every broadcast
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` stack

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod protocol;

pub use ids::{ConnectionId, MatchId};
