//! # matchfeed-server
//!
//! Real-time broadcast hub for live match updates, served over WebSocket.
//!
//! - [`hub`]: connection registry and subscription index behind one lock
//! - [`websocket`]: per-connection session, inbound dispatch, broadcast
//!   fan-out and heartbeat supervision
//! - [`server`]: Axum router (`/ws`, `/health`, `/metrics`) and lifecycle
//! - [`events`]: typed producer events published through the broadcast engine

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use error::ServerError;
pub use events::MatchEvent;
pub use hub::{DisconnectReason, Hub, HubConfig, HubError};
pub use server::MatchfeedServer;
pub use websocket::broadcast::{BroadcastError, BroadcastManager, BroadcastReport};
