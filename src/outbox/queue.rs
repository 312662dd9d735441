use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error};

use crate::channel::Channel;
use crate::config::DeliveryConfig;
use crate::exceptions::{ChannelError, LinkError, QueueError};
use crate::outbox::backoff::Backoff;
use crate::wire::consts::KEY_PAYLOAD;
use crate::wire::dict::{self, DictWriter};

/// How a queued buffer is put on the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// A packed command, sent as one byte array under key 0
    Raw,
    /// A complete key/value dictionary, sent as is
    Dict,
}

/// One owned outbound buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedPacket {
    encoding: Encoding,
    buffer: Vec<u8>,
}

impl QueuedPacket {
    pub fn raw(buffer: Vec<u8>) -> Self {
        Self {
            encoding: Encoding::Raw,
            buffer,
        }
    }

    pub fn dict(buffer: Vec<u8>) -> Self {
        Self {
            encoding: Encoding::Dict,
            buffer,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Size of the dictionary this packet becomes on the channel
    pub fn wire_size(&self) -> usize {
        match self.encoding {
            Encoding::Raw => dict::buffer_size(&[self.buffer.len()]),
            Encoding::Dict => self.buffer.len(),
        }
    }

    /// Bytes handed to the channel for one attempt
    pub fn message(&self) -> Result<Vec<u8>, LinkError> {
        match self.encoding {
            Encoding::Dict => {
                let mut copy = Vec::new();
                copy.try_reserve_exact(self.buffer.len())
                    .map_err(|_| QueueError::Allocation)?;
                copy.extend_from_slice(&self.buffer);
                Ok(copy)
            }
            Encoding::Raw => {
                let mut w = DictWriter::for_values(&[self.buffer.len()])?;
                w.bytes(KEY_PAYLOAD, &self.buffer)?;
                Ok(w.finish())
            }
        }
    }
}

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// Nothing queued
    Idle,
    /// The head was handed to the channel and released
    Delivered { remaining: usize },
    /// The head can never be sent and was released
    Dropped { remaining: usize },
    /// The channel refused the head; try again after the delay
    Retry(Duration),
    /// The channel is closed; packets stay queued
    Stalled,
}

/// Strict FIFO of outbound packets with one attempt in flight at a time
///
/// Only the head is ever offered to the channel, and it leaves the queue
/// only after the channel accepted it. Later packets wait behind a head that
/// is being retried.
#[derive(Debug)]
pub struct DeliveryQueue {
    packets: VecDeque<QueuedPacket>,
    backoff: Backoff,
    capacity: usize,
    delivered: u64,
}

impl DeliveryQueue {
    pub fn new(config: &DeliveryConfig, outbound_capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            backoff: Backoff::new(config.base_delay(), config.max_delay()),
            capacity: outbound_capacity,
            delivered: 0,
        }
    }

    /// Append a packet and attempt delivery of the current head.
    ///
    /// On error the packet is discarded and nothing is queued.
    pub fn enqueue<C: Channel>(
        &mut self,
        packet: QueuedPacket,
        channel: &mut C,
    ) -> Result<Flush, QueueError> {
        let size = packet.wire_size();
        if size > self.capacity {
            return Err(QueueError::TooLarge {
                size,
                capacity: self.capacity,
            });
        }
        self.packets
            .try_reserve(1)
            .map_err(|_| QueueError::Allocation)?;
        self.packets.push_back(packet);
        Ok(self.drive(channel))
    }

    /// Offer the head to the channel once.
    pub fn drive<C: Channel>(&mut self, channel: &mut C) -> Flush {
        let Some(head) = self.packets.front() else {
            return Flush::Idle;
        };

        let message = match head.message() {
            Ok(message) => message,
            Err(e) => {
                let delay = self.backoff.on_failure();
                debug!(error = %e, delay_ms = delay.as_millis() as u64, "Could not stage outbound packet");
                return Flush::Retry(delay);
            }
        };

        match channel.send(message) {
            Ok(()) => {
                self.packets.pop_front();
                self.backoff.reset();
                self.delivered += 1;
                debug!(remaining = self.packets.len(), "Outbound packet delivered");
                Flush::Delivered {
                    remaining: self.packets.len(),
                }
            }
            Err(ChannelError::BufferOverflow) => {
                let dropped = self.packets.pop_front();
                self.backoff.reset();
                error!(
                    size = dropped.map(|p| p.wire_size()).unwrap_or_default(),
                    capacity = channel.outbound_capacity(),
                    "Outbound packet does not fit the channel, dropped"
                );
                Flush::Dropped {
                    remaining: self.packets.len(),
                }
            }
            Err(ChannelError::Closed) => {
                debug!(queued = self.packets.len(), "Channel closed, delivery stalled");
                Flush::Stalled
            }
            Err(e) => {
                let delay = self.backoff.on_failure();
                debug!(
                    reason = %e,
                    attempt = self.backoff.failures(),
                    delay_ms = delay.as_millis() as u64,
                    "Send rejected, retry scheduled"
                );
                Flush::Retry(delay)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Packets handed to the channel since creation
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Release every queued packet without sending it.
    pub fn clear(&mut self) -> usize {
        let released = self.packets.len();
        self.packets.clear();
        self.backoff.reset();
        released
    }
}
