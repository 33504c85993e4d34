//! Stream context record
//!
//! One [`StreamContext`] exists per source stream being republished. It owns the
//! handles of everything the bridge created for that stream.

use std::fmt;
use std::time::Instant;

use crate::multicast::{MulticastType, PublishRequest};
use crate::session::{Facts, LifecycleState, PublishingClient};
use crate::transport::{GroupHandle, SessionHandle, StreamHandle};

/// Registry-assigned identifier of a stream context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Per-stream republishing state
#[derive(Debug)]
pub struct StreamContext {
    /// Peer that published the source stream
    pub client: PublishingClient,

    /// Source stream name, also the republished name
    pub stream_name: String,

    /// Distribution mode, fixed at creation
    pub multicast_type: MulticastType,

    /// Group specifier passed to the group and the stream
    pub group_spec: String,

    /// Raw multicast address, only for modes that bind one
    pub address: Option<String>,

    /// Loopback session
    pub session: Option<SessionHandle>,

    /// Distribution stream
    pub stream: Option<StreamHandle>,

    /// Distribution group, only for modes that join one
    pub group: Option<GroupHandle>,

    /// Current lifecycle state
    pub state: LifecycleState,

    /// Group reported `UnpublishNotify` while our unpublish was in flight
    pub peers_notified: bool,

    /// Publish was confirmed at least once
    pub reached_republishing: bool,

    /// When the publish was admitted
    pub created_at: Instant,
}

impl StreamContext {
    /// Create a context for a validated publish request
    pub fn new(
        client: PublishingClient,
        stream_name: impl Into<String>,
        request: PublishRequest,
    ) -> Self {
        Self {
            client,
            stream_name: stream_name.into(),
            multicast_type: request.multicast_type,
            group_spec: request.group_spec,
            address: request.address,
            session: None,
            stream: None,
            group: None,
            state: LifecycleState::Init,
            peers_notified: false,
            reached_republishing: false,
            created_at: Instant::now(),
        }
    }

    /// Facts the transition table needs
    pub fn facts(&self) -> Facts {
        Facts {
            multicast_type: self.multicast_type,
            has_group: self.group.is_some(),
            peers_notified: self.peers_notified,
        }
    }

    /// Whether the context still owns any transport handle
    pub fn holds_handles(&self) -> bool {
        self.session.is_some() || self.stream.is_some() || self.group.is_some()
    }
}

/// Snapshot of one context, for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextInfo {
    pub id: ContextId,
    pub stream_name: String,
    pub multicast_type: MulticastType,
    pub state: LifecycleState,
    pub client_id: u64,
    pub has_session: bool,
    pub has_stream: bool,
    pub has_group: bool,
}

impl ContextInfo {
    pub(super) fn new(id: ContextId, ctx: &StreamContext) -> Self {
        Self {
            id,
            stream_name: ctx.stream_name.clone(),
            multicast_type: ctx.multicast_type,
            state: ctx.state,
            client_id: ctx.client.id,
            has_session: ctx.session.is_some(),
            has_stream: ctx.stream.is_some(),
            has_group: ctx.group.is_some(),
        }
    }
}
