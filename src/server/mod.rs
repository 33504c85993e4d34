//! Multicast bridge server
//!
//! - [`Bridge`]: admission, lifecycle orchestration and teardown
//! - [`BridgeService`] / [`BridgeHandle`]: single-task runtime and its mailbox
//! - [`BridgeConfig`]: configuration

pub mod bridge;
pub mod config;
pub mod service;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use service::{BridgeEvent, BridgeHandle, BridgeService};
