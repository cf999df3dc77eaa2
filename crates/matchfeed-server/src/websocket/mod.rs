//! WebSocket sessions, inbound dispatch, broadcasting, and heartbeat.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod session;
