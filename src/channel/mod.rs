//! Channel adapter boundary
//!
//! The messaging core never talks to a transport directly. It asks a
//! [`Channel`] to begin a send, writes one dictionary, and commits it. The
//! transport reports everything else back as [`ChannelEvent`]s.

use crate::exceptions::ChannelError;

/// Scripted in-memory channel
pub mod memory;
/// tokio mpsc backed channel and its peer end
pub mod pipe;

/// Outbound half of the transport
pub trait Channel {
    /// Token proving the outbox accepted one message
    type Permit;

    /// Reserve the outbox. `Busy` while a previous message is in flight.
    fn begin_send(&mut self) -> Result<Self::Permit, ChannelError>;

    /// Hand one encoded dictionary to the transport.
    fn commit_send(&mut self, permit: Self::Permit, message: Vec<u8>) -> Result<(), ChannelError>;

    /// Largest message the outbox accepts
    fn outbound_capacity(&self) -> usize;

    /// Begin and commit in one step.
    fn send(&mut self, message: Vec<u8>) -> Result<(), ChannelError> {
        let permit = self.begin_send()?;
        if message.len() > self.outbound_capacity() {
            return Err(ChannelError::BufferOverflow);
        }
        self.commit_send(permit, message)
    }
}

/// Callbacks from the transport, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One inbound dictionary
    Received(Vec<u8>),
    /// An inbound message was lost before reaching the core
    Dropped(ChannelError),
    /// The peer acknowledged the last outbound message
    Sent,
    /// The last outbound message failed for good
    SendFailed(ChannelError),
}
