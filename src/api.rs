//! Stagelink
//!
//! Stagelink is the messaging core of an embedded app whose UI is driven by a
//! companion process over a narrow, unreliable channel. The companion sends
//! packed binary commands that build windows, menus, cards and a stage of
//! positioned elements; the app reports clicks, menu selections, accelerometer
//! data and animation completion back as key/value dictionaries.
//!
//! ## Features
//! - Bounds-checked zero-copy decoding of every inbound command shape.
//! - Strict FIFO outbound delivery with capped exponential backoff.
//! - Accelerometer polling that bypasses the queue and never piles up samples.
//! - A sans-IO core ([`Link`]) with a tokio actor ([`LinkService`]) on top.

/// Transport boundary and its adapters
pub mod channel;
/// Configuration Module
pub mod config;
/// Inbound decode-and-dispatch
pub mod dispatch;
/// Stagelink Exceptions Module
pub mod exceptions;
/// Collaborator traits driven by command handlers
pub mod host;
/// Session state of one link
pub mod link;
/// Module for logging and registration of events
pub mod logger;
/// Outbound delivery queue and accelerometer poll
pub mod outbox;
/// tokio driver for a link
pub mod service;
/// Wire formats in both directions
pub mod wire;

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

pub use crate::channel::{Channel, ChannelEvent};
pub use crate::config::Config;
pub use crate::exceptions::{LinkError, Result};
pub use crate::host::Host;
pub use crate::link::{Link, Outbound, Wake};
pub use crate::service::{LinkHandle, LinkService};

use crate::channel::pipe::PipePeer;

/// Client running one link over an in-process pipe
pub struct StagelinkClient {
    inner: Arc<RwLock<ClientInner>>,
}

struct ClientInner {
    config: Config,
    handle: Option<LinkHandle>,
    task: Option<JoinHandle<()>>,
}

impl StagelinkClient {
    /// Client configured from `config_path`, else `stagelink.yaml` when present.
    pub fn new(config_path: Option<String>) -> Arc<Self> {
        let config = match config_path {
            Some(path) => Config::from_file(Some(PathBuf::from(path))),
            None => Config::from_file(None),
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(RwLock::new(ClientInner {
                config,
                handle: None,
                task: None,
            })),
        })
    }

    pub async fn config(&self) -> Config {
        self.inner.read().await.config.clone()
    }

    /// Start the link service for `host` and return the companion end.
    pub async fn start<H>(&self, host: H) -> Result<PipePeer>
    where
        H: Host + Send + 'static,
    {
        let mut inner = self.inner.write().await;
        if inner.handle.is_some() {
            return Err(LinkError::AlreadyRunning);
        }

        let (handle, peer, task) = service::spawn_pipe(host, &inner.config);
        inner.task = Some(tokio::spawn(async move {
            let _ = task.await;
        }));
        inner.handle = Some(handle);
        info!("Stagelink client started");
        Ok(peer)
    }

    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(handle) = inner.handle.take() {
            handle.shutdown().await;
            if let Some(task) = inner.task.take() {
                let _ = task.await;
            }
            info!("Stagelink client stopped");
        }
        Ok(())
    }

    /// Handle of the running service
    pub async fn handle(&self) -> Result<LinkHandle> {
        self.inner
            .read()
            .await
            .handle
            .clone()
            .ok_or(LinkError::ServiceStopped)
    }

    pub async fn is_running(&self) -> bool {
        self.inner.read().await.handle.is_some()
    }
}
