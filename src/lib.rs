//! RTMP to multicast republishing bridge
//!
//! When a client publishes a live stream with multicast parameters on its query
//! string, the bridge opens a loopback session over the internal transport
//! (RTMFP by default), optionally joins a distribution group, and republishes the
//! source stream into IP multicast, a peer-to-peer group, or both ("fusion").
//!
//! ```text
//!  publish "cam1?fms.multicast.type=1&..."
//!        │
//!        ▼
//!  validate ─► replace stale "cam1" ─► register ─► open session ─► join group
//!                                                                     │
//!                        Republishing ◄─ publish ◄─ attach ◄─ create stream
//! ```
//!
//! The network primitives are supplied by the host through the
//! [`transport::Transport`] trait; their status notifications are fed back into
//! [`Bridge`] directly or through a [`BridgeHandle`] when running the
//! [`BridgeService`] task.
//!
//! # Example
//! ```no_run
//! use rtmp_multicast::transport::Transport;
//! use rtmp_multicast::{BridgeConfig, BridgeService};
//!
//! # async fn example<T: Transport + Send + 'static>(transport: T) {
//! let (service, handle) = BridgeService::new(BridgeConfig::default(), transport);
//! let task = tokio::spawn(service.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }));
//! # drop(handle);
//! # let _ = task.await;
//! # }
//! ```

pub mod error;
pub mod multicast;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
pub use multicast::{MulticastType, PublishRequest};
pub use registry::{ContextId, ContextRegistry, StreamContext};
pub use server::{Bridge, BridgeConfig, BridgeEvent, BridgeHandle, BridgeService};
pub use session::{LifecycleState, PublishingClient};
pub use stats::BridgeStats;
