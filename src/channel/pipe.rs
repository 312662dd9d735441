use tokio::sync::mpsc::{self, OwnedPermit, error::TrySendError};
use tracing::debug;

use crate::channel::{Channel, ChannelEvent};
use crate::exceptions::ChannelError;

/// Embedded end of an in-process link
///
/// The outbox is a bounded tokio channel: a full outbox reports `Busy`,
/// a dropped peer reports `NotConnected`.
#[derive(Debug, Clone)]
pub struct PipeChannel {
    outbound: mpsc::Sender<Vec<u8>>,
    capacity: usize,
}

/// Companion end of an in-process link
#[derive(Debug)]
pub struct PipePeer {
    outbound: mpsc::Receiver<Vec<u8>>,
    events: mpsc::Sender<ChannelEvent>,
    inbound_capacity: usize,
}

/// Open a link with the given message size limits.
///
/// `depth` bounds how many outbound messages may wait for the peer. The
/// returned receiver yields the transport callbacks for the embedded side.
pub fn open(
    inbound_capacity: usize,
    outbound_capacity: usize,
    depth: usize,
) -> (PipeChannel, PipePeer, mpsc::Receiver<ChannelEvent>) {
    let (out_tx, out_rx) = mpsc::channel(depth.max(1));
    let (ev_tx, ev_rx) = mpsc::channel(depth.max(1));
    let channel = PipeChannel {
        outbound: out_tx,
        capacity: outbound_capacity,
    };
    let peer = PipePeer {
        outbound: out_rx,
        events: ev_tx,
        inbound_capacity,
    };
    (channel, peer, ev_rx)
}

impl Channel for PipeChannel {
    type Permit = OwnedPermit<Vec<u8>>;

    fn begin_send(&mut self) -> Result<Self::Permit, ChannelError> {
        self.outbound
            .clone()
            .try_reserve_owned()
            .map_err(|e| match e {
                TrySendError::Full(_) => ChannelError::Busy,
                TrySendError::Closed(_) => ChannelError::NotConnected,
            })
    }

    fn commit_send(&mut self, permit: Self::Permit, message: Vec<u8>) -> Result<(), ChannelError> {
        if message.len() > self.capacity {
            return Err(ChannelError::BufferOverflow);
        }
        permit.send(message);
        Ok(())
    }

    fn outbound_capacity(&self) -> usize {
        self.capacity
    }
}

impl PipePeer {
    /// Wait for the next outbound message and acknowledge it.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        let message = self.outbound.recv().await?;
        let _ = self.events.send(ChannelEvent::Sent).await;
        Some(message)
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        let message = self.outbound.try_recv().ok()?;
        let _ = self.events.try_send(ChannelEvent::Sent);
        Some(message)
    }

    /// Deliver one inbound dictionary to the embedded side.
    ///
    /// Messages over the inbound capacity are reported as dropped.
    pub async fn deliver(&self, message: Vec<u8>) -> Result<(), ChannelError> {
        let event = if message.len() > self.inbound_capacity {
            debug!(size = message.len(), capacity = self.inbound_capacity, "Inbound message dropped");
            ChannelEvent::Dropped(ChannelError::BufferOverflow)
        } else {
            ChannelEvent::Received(message)
        };
        self.events
            .send(event)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Report a permanent outbound failure, as a transport would on disconnect.
    pub async fn fail(&self, reason: ChannelError) -> Result<(), ChannelError> {
        self.events
            .send(ChannelEvent::SendFailed(reason))
            .await
            .map_err(|_| ChannelError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_outbox_reports_busy() {
        let (mut channel, mut peer, mut events) = open(64, 64, 1);
        assert_eq!(channel.send(vec![1]), Ok(()));
        assert_eq!(channel.send(vec![2]), Err(ChannelError::Busy));
        assert_eq!(peer.recv().await, Some(vec![1]));
        assert_eq!(events.recv().await, Some(ChannelEvent::Sent));
        assert_eq!(channel.send(vec![2]), Ok(()));
    }

    #[tokio::test]
    async fn dropped_peer_reports_not_connected() {
        let (mut channel, peer, _events) = open(64, 64, 4);
        drop(peer);
        assert_eq!(channel.send(vec![1]), Err(ChannelError::NotConnected));
    }

    #[tokio::test]
    async fn oversize_inbound_is_dropped() {
        let (_channel, peer, mut events) = open(4, 64, 4);
        peer.deliver(vec![0; 5]).await.unwrap();
        peer.deliver(vec![0; 4]).await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::Dropped(ChannelError::BufferOverflow))
        );
        assert_eq!(events.recv().await, Some(ChannelEvent::Received(vec![0; 4])));
    }
}
