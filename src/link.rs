//! Session state of one messaging link
//!
//! [`Link`] owns the channel, the delivery queue, the accelerometer poll and
//! the communication-established flag. It performs no I/O waits of its own:
//! every operation returns the [`Wake`] it needs, and the caller re-enters
//! through [`Link::flush`] or [`Link::poll_accel`] once that time has passed.

use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, ChannelEvent};
use crate::config::Config;
use crate::dispatch::{self, FollowUp, Received};
use crate::exceptions::{ChannelError, LinkError};
use crate::host::Host;
use crate::outbox::{AccelPoll, DeliveryQueue, Flush, PollStep, QueuedPacket};
use crate::wire::action::{Action, click_packet};
use crate::wire::types::{AccelAxis, AccelSample, ButtonId, MenuIndex};

/// Timer the caller must arm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Call [`Link::flush`] after the delay
    Retry(Duration),
    /// Call [`Link::poll_accel`] after the delay
    AccelPoll(Duration),
}

/// Events the embedded side reports through the delivery queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound {
    WindowShow(u32),
    WindowHide(u32),
    Click(ButtonId),
    LongClick(ButtonId),
    AccelTap { axis: AccelAxis, direction: i8 },
    MenuGetSection(u16),
    MenuGetItem(MenuIndex),
    MenuSelect(MenuIndex),
    MenuLongSelect(MenuIndex),
    MenuSelection(MenuIndex),
    AnimateDone(u16),
}

impl Outbound {
    fn packet(self) -> Result<QueuedPacket, LinkError> {
        let action = match self {
            Outbound::Click(button) => return Ok(QueuedPacket::raw(click_packet(button, false)?)),
            Outbound::LongClick(button) => return Ok(QueuedPacket::raw(click_packet(button, true)?)),
            Outbound::WindowShow(id) => Action::WindowShow { id },
            Outbound::WindowHide(id) => Action::WindowHide { id },
            Outbound::AccelTap { axis, direction } => Action::AccelTap { axis, direction },
            Outbound::MenuGetSection(section) => Action::MenuGetSection { section },
            Outbound::MenuGetItem(index) => Action::MenuGetItem { index },
            Outbound::MenuSelect(index) => Action::MenuSelect { index },
            Outbound::MenuLongSelect(index) => Action::MenuLongSelect { index },
            Outbound::MenuSelection(index) => Action::MenuSelection { index },
            Outbound::AnimateDone(index) => Action::StageAnimateDone { index },
        };
        Ok(QueuedPacket::dict(action.encode()?))
    }
}

pub struct Link<C: Channel> {
    channel: C,
    queue: DeliveryQueue,
    communicated: bool,
    poll: Option<AccelPoll>,
    poll_interval: Duration,
    retry_base: Duration,
}

impl<C: Channel> Link<C> {
    pub fn new(channel: C, config: &Config) -> Self {
        let queue = DeliveryQueue::new(&config.delivery, channel.outbound_capacity());
        Self {
            channel,
            queue,
            communicated: false,
            poll: None,
            poll_interval: config.accel.poll_interval(),
            retry_base: config.delivery.base_delay(),
        }
    }

    /// True once an inbound message carrying a payload has arrived. Never reset.
    pub fn has_communicated(&self) -> bool {
        self.communicated
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|p| !p.is_cancelled())
    }

    /// Queue one event and attempt delivery of the head.
    pub fn send(&mut self, event: Outbound) -> Result<Option<Wake>, LinkError> {
        let packet = event.packet()?;
        let flush = self.queue.enqueue(packet, &mut self.channel)?;
        Ok(self.wake_for(flush))
    }

    /// Send accelerometer samples directly, bypassing the queue.
    ///
    /// Negative or absent transaction ids are left out of the message.
    pub fn send_accel_data(
        &mut self,
        samples: &[AccelSample],
        transaction_id: Option<i32>,
    ) -> Result<(), LinkError> {
        let message = Action::AccelData {
            transaction_id,
            samples,
        }
        .encode()?;
        self.channel.send(message)?;
        Ok(())
    }

    /// Offer the queue head to the channel again.
    pub fn flush(&mut self) -> Option<Wake> {
        let flush = self.queue.drive(&mut self.channel);
        self.wake_for(flush)
    }

    /// Arm the accelerometer poll. A poll already running absorbs the request.
    pub fn start_accel_poll(&mut self) -> Option<Wake> {
        if self.is_polling() {
            debug!("Accel poll already running");
            return None;
        }
        self.poll = Some(AccelPoll::new(self.poll_interval));
        Some(Wake::AccelPoll(self.poll_interval))
    }

    /// Run one poll step with a fresh sample from the host.
    pub fn poll_accel(&mut self, host: &mut dyn Host) -> Option<Wake> {
        let poll = self.poll.as_mut()?;
        if poll.is_cancelled() {
            self.poll = None;
            return None;
        }
        let sample = host.accel().peek();
        match poll.step(&mut self.channel, sample) {
            PollStep::Again(delay) => Some(Wake::AccelPoll(delay)),
            PollStep::Sent | PollStep::Cancelled => {
                self.poll = None;
                None
            }
        }
    }

    pub fn cancel_accel_poll(&mut self) {
        if let Some(poll) = self.poll.as_mut() {
            poll.cancel();
        }
        self.poll = None;
    }

    /// React to one transport callback.
    pub fn handle_event(&mut self, host: &mut dyn Host, event: ChannelEvent) -> Option<Wake> {
        match event {
            ChannelEvent::Received(message) => {
                let Received::Accepted(follow_up) = dispatch::on_receive(host, &message) else {
                    return None;
                };
                if !self.communicated {
                    info!("First message from peer");
                }
                self.communicated = true;
                match follow_up? {
                    FollowUp::StartAccelPoll => self.start_accel_poll(),
                    FollowUp::ReportMenuSelection(index) => {
                        match self.send(Outbound::MenuSelection(index)) {
                            Ok(wake) => wake,
                            Err(e) => {
                                error!(error = %e, "Could not queue menu selection");
                                None
                            }
                        }
                    }
                }
            }
            ChannelEvent::Dropped(reason) => {
                warn!(reason = %reason, "Inbound message dropped");
                None
            }
            ChannelEvent::Sent => self.flush(),
            ChannelEvent::SendFailed(reason) => {
                if reason == ChannelError::NotConnected {
                    dispatch::show_disconnected(host);
                } else {
                    debug!(reason = %reason, "Outbound message failed");
                }
                self.flush()
            }
        }
    }

    /// Release queued packets and stop the poll.
    pub fn shutdown(&mut self) -> usize {
        self.cancel_accel_poll();
        let released = self.queue.clear();
        if released > 0 {
            info!(released, "Released undelivered packets");
        }
        released
    }

    fn wake_for(&self, flush: Flush) -> Option<Wake> {
        match flush {
            Flush::Retry(delay) => Some(Wake::Retry(delay)),
            Flush::Delivered { remaining } | Flush::Dropped { remaining } if remaining > 0 => {
                Some(Wake::Retry(self.retry_base))
            }
            Flush::Delivered { .. } | Flush::Dropped { .. } | Flush::Idle | Flush::Stalled => None,
        }
    }
}
