//! Async driver for one [`Link`]
//!
//! All session state lives in a single tokio task. Transport callbacks,
//! requests from [`LinkHandle`]s and the retry and poll deadlines are served
//! one at a time from one `select!` loop, so the queue and its backoff are
//! never touched concurrently.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::channel::pipe::{self, PipeChannel, PipePeer};
use crate::channel::{Channel, ChannelEvent};
use crate::config::Config;
use crate::exceptions::{LinkError, Result};
use crate::host::Host;
use crate::link::{Link, Outbound, Wake};
use crate::wire::types::{AccelAxis, AccelSample, ButtonId, MenuIndex};

const REQUEST_DEPTH: usize = 64;

type Reply<T> = oneshot::Sender<T>;

#[derive(Debug)]
enum Request {
    Send(Outbound, Reply<Result<()>>),
    AccelData {
        samples: Vec<AccelSample>,
        transaction_id: Option<i32>,
        reply: Reply<Result<()>>,
    },
    QueueLen(Reply<usize>),
    Shutdown,
}

/// Task owning the link, the host and the transport callbacks
pub struct LinkService<C: Channel, H: Host> {
    link: Link<C>,
    host: H,
    events: mpsc::Receiver<ChannelEvent>,
    requests: mpsc::Receiver<Request>,
    communicated: watch::Sender<bool>,
    retry_at: Option<Instant>,
    poll_at: Option<Instant>,
}

impl<C, H> LinkService<C, H>
where
    C: Channel + Send + 'static,
    H: Host + Send + 'static,
{
    pub fn new(
        channel: C,
        events: mpsc::Receiver<ChannelEvent>,
        host: H,
        config: &Config,
    ) -> (Self, LinkHandle) {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_DEPTH);
        let (flag_tx, flag_rx) = watch::channel(false);
        let service = Self {
            link: Link::new(channel, config),
            host,
            events,
            requests: req_rx,
            communicated: flag_tx,
            retry_at: None,
            poll_at: None,
        };
        let handle = LinkHandle {
            requests: req_tx,
            communicated: flag_rx,
        };
        (service, handle)
    }

    pub fn spawn(self) -> JoinHandle<H> {
        tokio::spawn(self.run())
    }

    /// Serve until shutdown, then hand the host back.
    pub async fn run(mut self) -> H {
        info!("Link service started");
        loop {
            tokio::select! {
                // Transport callbacks first, in channel order
                biased;
                event = self.events.recv() => match event {
                    Some(event) => {
                        let wake = self.link.handle_event(&mut self.host, event);
                        self.arm(wake);
                        self.publish();
                    }
                    None => {
                        info!("Transport closed");
                        break;
                    }
                },
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.serve(request),
                },
                _ = deadline(self.retry_at) => {
                    self.retry_at = None;
                    let wake = self.link.flush();
                    self.arm(wake);
                }
                _ = deadline(self.poll_at) => {
                    self.poll_at = None;
                    let wake = self.link.poll_accel(&mut self.host);
                    self.arm(wake);
                }
            }
        }
        let released = self.link.shutdown();
        info!(released, "Link service stopped");
        self.host
    }

    fn serve(&mut self, request: Request) {
        match request {
            Request::Send(event, reply) => {
                let result = self.link.send(event).map(|wake| self.arm(wake));
                let _ = reply.send(result);
            }
            Request::AccelData {
                samples,
                transaction_id,
                reply,
            } => {
                let _ = reply.send(self.link.send_accel_data(&samples, transaction_id));
            }
            Request::QueueLen(reply) => {
                let _ = reply.send(self.link.queue().len());
            }
            Request::Shutdown => {}
        }
    }

    /// Replace the matching deadline; only the latest request counts.
    fn arm(&mut self, wake: Option<Wake>) {
        match wake {
            Some(Wake::Retry(delay)) => {
                debug!(delay_ms = delay.as_millis() as u64, "Retry armed");
                self.retry_at = Some(Instant::now() + delay);
            }
            Some(Wake::AccelPoll(delay)) => {
                self.poll_at = Some(Instant::now() + delay);
            }
            None => {}
        }
    }

    fn publish(&self) {
        if self.link.has_communicated() && !*self.communicated.borrow() {
            self.communicated.send_replace(true);
        }
    }
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Spawn a service over an in-process pipe sized from `config`.
pub fn spawn_pipe<H>(host: H, config: &Config) -> (LinkHandle, PipePeer, JoinHandle<H>)
where
    H: Host + Send + 'static,
{
    let (channel, peer, events) = pipe::open(
        config.channel.inbound_capacity,
        config.channel.outbound_capacity,
        config.channel.event_depth,
    );
    let (service, handle): (LinkService<PipeChannel, H>, _) =
        LinkService::new(channel, events, host, config);
    (handle, peer, service.spawn())
}

/// Cloneable front end of a running [`LinkService`]
#[derive(Debug, Clone)]
pub struct LinkHandle {
    requests: mpsc::Sender<Request>,
    communicated: watch::Receiver<bool>,
}

impl LinkHandle {
    pub async fn window_show(&self, id: u32) -> Result<()> {
        self.send(Outbound::WindowShow(id)).await
    }

    pub async fn window_hide(&self, id: u32) -> Result<()> {
        self.send(Outbound::WindowHide(id)).await
    }

    pub async fn single_click(&self, button: ButtonId) -> Result<()> {
        self.send(Outbound::Click(button)).await
    }

    pub async fn long_click(&self, button: ButtonId) -> Result<()> {
        self.send(Outbound::LongClick(button)).await
    }

    pub async fn accel_tap(&self, axis: AccelAxis, direction: i8) -> Result<()> {
        self.send(Outbound::AccelTap { axis, direction }).await
    }

    pub async fn menu_get_section(&self, section: u16) -> Result<()> {
        self.send(Outbound::MenuGetSection(section)).await
    }

    pub async fn menu_get_item(&self, section: u16, row: u16) -> Result<()> {
        self.send(Outbound::MenuGetItem(MenuIndex::new(section, row)))
            .await
    }

    pub async fn menu_select_click(&self, section: u16, row: u16) -> Result<()> {
        self.send(Outbound::MenuSelect(MenuIndex::new(section, row)))
            .await
    }

    pub async fn menu_select_long_click(&self, section: u16, row: u16) -> Result<()> {
        self.send(Outbound::MenuLongSelect(MenuIndex::new(section, row)))
            .await
    }

    pub async fn menu_selection(&self, section: u16, row: u16) -> Result<()> {
        self.send(Outbound::MenuSelection(MenuIndex::new(section, row)))
            .await
    }

    pub async fn animate_element_done(&self, index: u16) -> Result<()> {
        self.send(Outbound::AnimateDone(index)).await
    }

    /// Send a sample batch directly. Fails instead of retrying when the
    /// channel is busy.
    pub async fn accel_data(
        &self,
        samples: Vec<AccelSample>,
        transaction_id: Option<i32>,
    ) -> Result<()> {
        self.call(|reply| Request::AccelData {
            samples,
            transaction_id,
            reply,
        })
        .await?
    }

    /// Packets waiting in the delivery queue
    pub async fn queue_len(&self) -> Result<usize> {
        self.call(Request::QueueLen).await
    }

    pub fn has_communicated(&self) -> bool {
        *self.communicated.borrow()
    }

    /// Wait until the first inbound message arrived.
    pub async fn communicated(&self) -> Result<()> {
        let mut flag = self.communicated.clone();
        flag.wait_for(|established| *established)
            .await
            .map_err(|_| LinkError::ServiceStopped)?;
        Ok(())
    }

    pub async fn shutdown(&self) {
        if self.requests.send(Request::Shutdown).await.is_err() {
            warn!("Link service already stopped");
        }
    }

    async fn send(&self, event: Outbound) -> Result<()> {
        self.call(|reply| Request::Send(event, reply)).await?
    }

    async fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(request(tx))
            .await
            .map_err(|_| LinkError::ServiceStopped)?;
        rx.await.map_err(|_| LinkError::ServiceStopped)
    }
}
