//! Stream context registry
//!
//! The registry owns every [`StreamContext`] and routes asynchronous status
//! events back to the context that owns the reporting handle.
//!
//! # Indexes
//!
//! ```text
//!                         ContextRegistry
//!               ┌────────────────────────────────┐
//!               │ contexts: ContextId → Context  │
//!               └───────────────▲────────────────┘
//!        ┌───────────────┬──────┴────────┬────────────────┐
//!   by_name          by_session      by_stream        by_group
//!   "cam1"           session#4       stream#9         group#6
//!   (publish,        (NetConnection  (NetStream       (NetGroup
//!    unpublish,       status)         status)          status)
//!    release)
//! ```
//!
//! The name entry is dropped as soon as teardown starts so a new publish of the
//! same name can proceed; handle entries live until the handle is released so
//! late status events still resolve. A status for a handle that is no longer
//! indexed is stale and ignored.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{ContextId, ContextInfo, StreamContext};
pub use error::RegistryError;
pub use store::ContextRegistry;
