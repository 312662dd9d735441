use std::time::Duration;
use tracing::debug;

use crate::channel::Channel;
use crate::exceptions::ChannelError;
use crate::wire::action::Action;
use crate::wire::types::AccelSample;

/// Transaction id reported for peeked samples
pub const PEEK_TRANSACTION: i32 = 0;

/// Outcome of one poll step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// The sample reached the channel; the poll is over
    Sent,
    /// The channel refused; run the step again after the delay
    Again(Duration),
    /// The poll was cancelled or the channel is gone
    Cancelled,
}

/// Repeating attempt to deliver the latest accelerometer sample
///
/// Sends bypass the delivery queue: each step reads a fresh sample, so a
/// refused sample is superseded by the next one instead of piling up.
#[derive(Debug)]
pub struct AccelPoll {
    interval: Duration,
    cancelled: bool,
    attempts: u32,
}

impl AccelPoll {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            cancelled: false,
            attempts: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Try to send `sample` directly on the channel.
    pub fn step<C: Channel>(&mut self, channel: &mut C, sample: AccelSample) -> PollStep {
        if self.cancelled {
            return PollStep::Cancelled;
        }
        self.attempts = self.attempts.saturating_add(1);

        let samples = [sample];
        let message = match (Action::AccelData {
            transaction_id: Some(PEEK_TRANSACTION),
            samples: &samples,
        })
        .encode()
        {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Could not encode accel sample");
                return PollStep::Again(self.interval);
            }
        };

        match channel.send(message) {
            Ok(()) => {
                debug!(attempts = self.attempts, "Accel sample sent");
                PollStep::Sent
            }
            Err(ChannelError::Closed) => {
                self.cancelled = true;
                PollStep::Cancelled
            }
            Err(e) => {
                debug!(reason = %e, "Accel sample refused, polling again");
                PollStep::Again(self.interval)
            }
        }
    }
}
