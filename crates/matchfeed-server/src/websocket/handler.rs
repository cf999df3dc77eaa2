//! Inbound frame dispatch for an open connection.

use matchfeed_core::protocol::{InboundFrame, OutboundFrame, validate};
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::hub::Hub;
use crate::metrics as names;
use crate::websocket::connection::ClientConnection;

/// Validate one inbound frame and apply it.
///
/// Returns the reply to send, if any. Validation failures produce an
/// `error` reply and leave the connection open.
#[instrument(skip_all, fields(conn_id = %conn.id))]
pub fn dispatch(hub: &Hub, conn: &ClientConnection, raw: &[u8]) -> Option<OutboundFrame> {
    counter!(names::WS_MESSAGES_RECEIVED_TOTAL).increment(1);

    let frame = match validate(raw) {
        Ok(frame) => frame,
        Err(e) => {
            counter!(names::WS_VALIDATION_ERRORS_TOTAL, "kind" => e.kind()).increment(1);
            debug!(error = %e, protocol = e.is_protocol(), len = raw.len(), "rejected frame");
            return Some(OutboundFrame::error(e.to_string()));
        }
    };
    debug!(kind = frame.kind(), "dispatching frame");

    match frame {
        InboundFrame::Subscribe { match_id } => match hub.subscribe(&conn.id, match_id) {
            Ok(_) => Some(OutboundFrame::subscribed(match_id)),
            Err(e) => {
                warn!(error = %e, %match_id, "subscribe on departed connection");
                Some(OutboundFrame::error("Connection is closing"))
            }
        },
        InboundFrame::Unsubscribe { match_id } => match hub.unsubscribe(&conn.id, match_id) {
            Ok(_) => Some(OutboundFrame::unsubscribed(match_id)),
            Err(e) => {
                warn!(error = %e, %match_id, "unsubscribe on departed connection");
                Some(OutboundFrame::error("Connection is closing"))
            }
        },
        InboundFrame::Ping => Some(OutboundFrame::pong_now()),
        InboundFrame::Pong => {
            conn.mark_alive();
            None
        }
    }
}
