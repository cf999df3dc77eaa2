//! Wire protocol: frame types, inbound validation, and payload sanitizing.
//!
//! Every frame on the wire is a JSON object with a `type` discriminator.
//! Clients send [`InboundFrame`]s, which are only ever produced by
//! [`validate`]; the hub replies with [`OutboundFrame`]s. Broadcast
//! payloads are opaque JSON values passed through [`sanitize`] first.

pub mod frames;
pub mod sanitize;
pub mod validation;

pub use frames::{InboundFrame, OutboundFrame};
pub use sanitize::sanitize;
pub use validation::{MAX_MESSAGE_BYTES, ValidationError, validate};
