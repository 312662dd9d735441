//! Inbound decode-and-dispatch
//!
//! A received dictionary carries one packed command under key 0. The
//! dispatcher pulls it out, decodes it and runs the matching handler against
//! the host. Malformed messages are logged and dropped, unknown command ids
//! are ignored, and handlers whose target does not exist do nothing.

use tracing::{debug, warn};

use crate::exceptions::WireError;
use crate::host::{CardField, Host};
use crate::wire::command::Command;
use crate::wire::consts::KEY_PAYLOAD;
use crate::wire::dict::{self, Value};
use crate::wire::types::{MenuIndex, WindowKind};

/// Per-command handlers
pub mod handlers;

/// Subtitle shown when the peer is gone
pub const DISCONNECTED_SUBTITLE: &str = "Disconnected";
/// Body shown when the peer is gone
pub const DISCONNECTED_BODY: &str = "Run the companion app";

/// Outbound work a handler asks the link to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Queue a menu-selection report for this row
    ReportMenuSelection(MenuIndex),
    /// Start the accelerometer poll
    StartAccelPoll,
}

/// Packed command carried under key 0 of a received dictionary.
pub fn payload(message: &[u8]) -> Result<&[u8], WireError> {
    match dict::find(message, KEY_PAYLOAD)? {
        Some(tuple) => match tuple.value {
            Value::Bytes(bytes) => Ok(bytes),
            _ => Err(WireError::MissingPayload),
        },
        None => Err(WireError::MissingPayload),
    }
}

/// What came of one received dictionary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    /// No packed command could be located under key 0
    Rejected,
    /// A payload was present; the command ran or was dropped
    Accepted(Option<FollowUp>),
}

/// Decode one received dictionary and run its handler.
pub fn on_receive(host: &mut dyn Host, message: &[u8]) -> Received {
    let packed = match payload(message) {
        Ok(packed) => packed,
        Err(e) => {
            warn!(error = %e, len = message.len(), "Rejecting message without payload");
            return Received::Rejected;
        }
    };
    let command = match Command::decode(packed) {
        Ok(Some(command)) => command,
        Ok(None) => {
            debug!(len = packed.len(), "Ignoring unknown command");
            return Received::Accepted(None);
        }
        Err(e) => {
            warn!(error = %e, len = packed.len(), "Dropping malformed command");
            return Received::Accepted(None);
        }
    };
    debug!(command = ?command.id(), "Dispatching command");
    Received::Accepted(handlers::handle(host, &command))
}

/// Replace the display with the disconnected notice.
///
/// Runs when a send fails because the peer is not connected.
pub fn show_disconnected(host: &mut dyn Host) {
    warn!("Peer not connected, showing disconnected notice");
    let card = host.card();
    card.clear(u8::MAX);
    card.set_text(CardField::Subtitle, DISCONNECTED_SUBTITLE);
    card.set_text(CardField::Body, DISCONNECTED_BODY);
    host.windows().show(WindowKind::Card, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Card;
    use crate::host::memory::MemoryHost;
    use crate::wire::dict::DictWriter;

    fn wrap(packed: &[u8]) -> Vec<u8> {
        let mut w = DictWriter::for_values(&[packed.len()]).unwrap();
        w.bytes(KEY_PAYLOAD, packed).unwrap();
        w.finish()
    }

    #[test]
    fn payload_requires_bytes_under_key_zero() {
        let mut w = DictWriter::for_values(&[1]).unwrap();
        w.u8(KEY_PAYLOAD, 3).unwrap();
        assert_eq!(payload(&w.finish()), Err(WireError::MissingPayload));
        assert_eq!(payload(&wrap(&[1, 2])), Ok(&[1u8, 2][..]));
    }

    #[test]
    fn malformed_message_changes_nothing() {
        let mut host = MemoryHost::new();
        assert_eq!(
            on_receive(&mut host, &wrap(&[2, 0, 4, 0, 7])),
            Received::Accepted(None)
        );
        assert_eq!(on_receive(&mut host, &[9, 9]), Received::Rejected);
        assert!(host.windows.stack.is_empty());
    }

    #[test]
    fn dictionary_without_key_zero_is_rejected() {
        let mut host = MemoryHost::new();
        let mut w = DictWriter::for_values(&[1]).unwrap();
        w.u8(5, 1).unwrap();
        assert_eq!(on_receive(&mut host, &w.finish()), Received::Rejected);
        assert_eq!(on_receive(&mut host, &[0xff]), Received::Rejected);
        assert_eq!(
            on_receive(&mut host, &wrap(&[23, 0, 0, 0])),
            Received::Accepted(None)
        );
    }

    #[test]
    fn disconnected_notice_pushes_card() {
        let mut host = MemoryHost::new();
        host.card.set_text(CardField::Title, "Weather");
        show_disconnected(&mut host);
        assert_eq!(host.card.text(CardField::Title), "");
        assert_eq!(host.card.text(CardField::Subtitle), DISCONNECTED_SUBTITLE);
        assert_eq!(host.card.text(CardField::Body), DISCONNECTED_BODY);
        assert_eq!(host.windows.stack.last().unwrap().kind, WindowKind::Card);
    }
}
