//! Bridge service task
//!
//! Runs a [`Bridge`] on a single tokio task. Hosts and transport implementations
//! post events through a cloneable [`BridgeHandle`]; the task applies them one at
//! a time, so the bridge never needs locking.

use std::future::Future;
use std::net::IpAddr;

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};
use crate::registry::{ContextId, ContextInfo};
use crate::session::PublishingClient;
use crate::stats::BridgeStats;
use crate::transport::{GroupHandle, SessionHandle, StreamHandle, Transport};

use super::bridge::Bridge;
use super::config::BridgeConfig;

/// Events accepted by the bridge service
#[derive(Debug)]
pub enum BridgeEvent {
    /// A client started publishing
    Publish {
        client: PublishingClient,
        stream_name: String,
        query: String,
        reply: oneshot::Sender<Result<ContextId>>,
    },
    /// A source stream was unpublished
    Unpublish { client_id: u64, stream_name: String },
    /// A peer released a stream name
    Release { address: IpAddr, stream_name: String },
    /// A publishing client disconnected
    Disconnect { client_id: u64 },
    /// Loopback session status
    SessionStatus {
        session: SessionHandle,
        code: String,
        description: String,
    },
    /// Distribution group status
    GroupStatus {
        group: GroupHandle,
        code: String,
        description: String,
    },
    /// Distribution stream status
    StreamStatus {
        stream: StreamHandle,
        code: String,
        description: String,
    },
    /// Request a statistics snapshot
    Stats { reply: oneshot::Sender<BridgeStats> },
    /// Request a snapshot of every context
    Contexts {
        reply: oneshot::Sender<Vec<ContextInfo>>,
    },
}

/// Sender side of the bridge service mailbox
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<BridgeEvent>,
}

impl BridgeHandle {
    /// Post an event, waiting for mailbox capacity
    pub async fn send(&self, event: BridgeEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::ServiceClosed)
    }

    /// Post an event without waiting
    ///
    /// For transport callbacks running outside an async context. Fails if the
    /// mailbox is full or the service stopped.
    pub fn try_send(&self, event: BridgeEvent) -> Result<()> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => {
                tracing::warn!(event = ?event, "Bridge mailbox full, event dropped");
                Error::MailboxFull
            }
            mpsc::error::TrySendError::Closed(_) => Error::ServiceClosed,
        })
    }

    /// Admit a publish; `Err` means the client's connection must be closed
    pub async fn publish(
        &self,
        client: PublishingClient,
        stream_name: impl Into<String>,
        query: impl Into<String>,
    ) -> Result<ContextId> {
        let (reply, rx) = oneshot::channel();
        self.send(BridgeEvent::Publish {
            client,
            stream_name: stream_name.into(),
            query: query.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| Error::ServiceClosed)?
    }

    pub async fn unpublish(&self, client_id: u64, stream_name: impl Into<String>) -> Result<()> {
        self.send(BridgeEvent::Unpublish {
            client_id,
            stream_name: stream_name.into(),
        })
        .await
    }

    pub async fn release(&self, address: IpAddr, stream_name: impl Into<String>) -> Result<()> {
        self.send(BridgeEvent::Release {
            address,
            stream_name: stream_name.into(),
        })
        .await
    }

    pub async fn disconnect(&self, client_id: u64) -> Result<()> {
        self.send(BridgeEvent::Disconnect { client_id }).await
    }

    pub async fn session_status(
        &self,
        session: SessionHandle,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        self.send(BridgeEvent::SessionStatus {
            session,
            code: code.into(),
            description: description.into(),
        })
        .await
    }

    pub async fn group_status(
        &self,
        group: GroupHandle,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        self.send(BridgeEvent::GroupStatus {
            group,
            code: code.into(),
            description: description.into(),
        })
        .await
    }

    pub async fn stream_status(
        &self,
        stream: StreamHandle,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<()> {
        self.send(BridgeEvent::StreamStatus {
            stream,
            code: code.into(),
            description: description.into(),
        })
        .await
    }

    pub async fn stats(&self) -> Result<BridgeStats> {
        let (reply, rx) = oneshot::channel();
        self.send(BridgeEvent::Stats { reply }).await?;
        rx.await.map_err(|_| Error::ServiceClosed)
    }

    pub async fn contexts(&self) -> Result<Vec<ContextInfo>> {
        let (reply, rx) = oneshot::channel();
        self.send(BridgeEvent::Contexts { reply }).await?;
        rx.await.map_err(|_| Error::ServiceClosed)
    }
}

/// Single-task owner of a [`Bridge`]
pub struct BridgeService<T: Transport> {
    bridge: Bridge<T>,
    rx: mpsc::Receiver<BridgeEvent>,
}

impl<T: Transport> BridgeService<T> {
    /// Create a service and the handle used to feed it
    pub fn new(config: BridgeConfig, transport: T) -> (Self, BridgeHandle) {
        Self::with_bridge(Bridge::new(config, transport))
    }

    /// Wrap an existing bridge
    pub fn with_bridge(bridge: Bridge<T>) -> (Self, BridgeHandle) {
        let (tx, rx) = mpsc::channel(bridge.config().mailbox_capacity.max(1));
        (Self { bridge, rx }, BridgeHandle { tx })
    }

    /// Run until every handle is dropped
    ///
    /// Live contexts are force-closed before returning the bridge.
    pub async fn run(mut self) -> Bridge<T> {
        tracing::info!("Bridge service started");

        while let Some(event) = self.rx.recv().await {
            dispatch(&mut self.bridge, event);
        }

        tracing::info!("All bridge handles dropped");
        self.bridge.shutdown();
        self.bridge
    }

    /// Run until `shutdown` resolves or every handle is dropped
    pub async fn run_until<F>(mut self, shutdown: F) -> Bridge<T>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Bridge service started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                event = self.rx.recv() => match event {
                    Some(event) => dispatch(&mut self.bridge, event),
                    None => {
                        tracing::info!("All bridge handles dropped");
                        break;
                    }
                },
            }
        }

        self.rx.close();
        self.bridge.shutdown();
        self.bridge
    }
}

fn dispatch<T: Transport>(bridge: &mut Bridge<T>, event: BridgeEvent) {
    match event {
        BridgeEvent::Publish {
            client,
            stream_name,
            query,
            reply,
        } => {
            let result = bridge.on_publish(client, &stream_name, &query);
            if reply.send(result).is_err() {
                tracing::debug!(stream = %stream_name, "Publish caller went away");
            }
        }
        BridgeEvent::Unpublish {
            client_id,
            stream_name,
        } => {
            bridge.on_unpublish(client_id, &stream_name);
        }
        BridgeEvent::Release {
            address,
            stream_name,
        } => {
            bridge.on_release(address, &stream_name);
        }
        BridgeEvent::Disconnect { client_id } => {
            bridge.on_client_disconnect(client_id);
        }
        BridgeEvent::SessionStatus {
            session,
            code,
            description,
        } => bridge.on_session_status(session, &code, &description),
        BridgeEvent::GroupStatus {
            group,
            code,
            description,
        } => bridge.on_group_status(group, &code, &description),
        BridgeEvent::StreamStatus {
            stream,
            code,
            description,
        } => bridge.on_stream_status(stream, &code, &description),
        BridgeEvent::Stats { reply } => {
            let _ = reply.send(bridge.stats());
        }
        BridgeEvent::Contexts { reply } => {
            let _ = reply.send(bridge.contexts());
        }
    }
}
