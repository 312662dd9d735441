use std::collections::VecDeque;

use crate::channel::Channel;
use crate::exceptions::ChannelError;

/// Synchronous channel that records every committed message
///
/// Rejections are scripted: queued errors are returned by the next
/// `begin_send` calls, and `set_busy(true)` rejects every attempt.
#[derive(Debug)]
pub struct MemoryChannel {
    capacity: usize,
    busy: bool,
    script: VecDeque<ChannelError>,
    attempts: usize,
    sent: Vec<Vec<u8>>,
}

impl MemoryChannel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            busy: false,
            script: VecDeque::new(),
            attempts: 0,
            sent: Vec::new(),
        }
    }

    /// Fail the next `count` attempts with `error`
    pub fn reject_next(&mut self, count: usize, error: ChannelError) {
        self.script.extend(std::iter::repeat_n(error, count));
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Number of `begin_send` calls so far
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }
}

impl Channel for MemoryChannel {
    type Permit = ();

    fn begin_send(&mut self) -> Result<(), ChannelError> {
        self.attempts += 1;
        if self.busy {
            return Err(ChannelError::Busy);
        }
        match self.script.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn commit_send(&mut self, _permit: (), message: Vec<u8>) -> Result<(), ChannelError> {
        if message.len() > self.capacity {
            return Err(ChannelError::BufferOverflow);
        }
        self.sent.push(message);
        Ok(())
    }

    fn outbound_capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_rejections_are_consumed_in_order() {
        let mut channel = MemoryChannel::new(16);
        channel.reject_next(2, ChannelError::Busy);
        assert_eq!(channel.send(vec![1]), Err(ChannelError::Busy));
        assert_eq!(channel.send(vec![2]), Err(ChannelError::Busy));
        assert_eq!(channel.send(vec![3]), Ok(()));
        assert_eq!(channel.attempts(), 3);
        assert_eq!(channel.sent(), &[vec![3u8]]);
    }

    #[test]
    fn oversize_message_is_refused() {
        let mut channel = MemoryChannel::new(2);
        assert_eq!(channel.send(vec![0; 3]), Err(ChannelError::BufferOverflow));
        assert!(channel.sent().is_empty());
    }
}
