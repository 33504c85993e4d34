//! Loopback transport collaborator
//!
//! The bridge never talks to the network itself. It drives an implementation of
//! [`Transport`], which owns the real sessions, groups and distribution streams
//! and hands back opaque, copyable handles.
//!
//! Every method only *starts* an operation. Outcomes are reported later through
//! the bridge's status entry points (`on_session_status`, `on_group_status`,
//! `on_stream_status`) keyed by the same handles:
//!
//! ```text
//!   Bridge ──open_session()──► Transport ··· NetConnection.Connect.Success ···► Bridge
//!   Bridge ──create_group()──► Transport ··· NetGroup.Connect.Success ·······► Bridge
//!   Bridge ──create_stream()─► Transport ··· NetStream.Connect.Success ······► Bridge
//!   Bridge ──publish()───────► Transport ··· NetStream.Publish.Start ········► Bridge
//! ```

pub mod status;

use std::fmt;

pub use status::{GroupStatus, SessionStatus, StreamStatus};

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle_type!(
    /// Loopback session (NetConnection) handle
    SessionHandle,
    "session"
);
handle_type!(
    /// Distribution group (NetGroup) handle
    GroupHandle,
    "group"
);
handle_type!(
    /// Distribution stream (NetStream) handle
    StreamHandle,
    "stream"
);

/// Publish type passed to the distribution stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Live only, nothing recorded
    #[default]
    Live,
}

impl PublishMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishMode::Live => "live",
        }
    }
}

/// A transport operation could not be started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Operations the bridge needs from the session/group/stream primitives
///
/// Fallible methods fail synchronously only when the operation cannot be started
/// at all (bad URI, invalid group spec, unbindable address). Asynchronous
/// failures arrive as status codes.
pub trait Transport {
    /// Open a loopback session to `uri`
    fn open_session(&mut self, uri: &str) -> Result<SessionHandle, TransportError>;

    /// Close a session; a `NetConnection.Connect.Closed` status follows
    fn close_session(&mut self, session: SessionHandle);

    /// Join the group described by `group_spec` over `session`
    fn create_group(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<GroupHandle, TransportError>;

    /// Create a distribution stream bound to `group_spec` over `session`
    fn create_stream(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<StreamHandle, TransportError>;

    /// Bind a raw IP multicast `address` (`ip:port`) for the stream
    fn set_multicast_address(
        &mut self,
        stream: StreamHandle,
        address: &str,
    ) -> Result<(), TransportError>;

    /// Feed the stream from the locally published source stream `source`
    fn attach(&mut self, stream: StreamHandle, source: &str) -> Result<(), TransportError>;

    /// Stop feeding the stream
    fn detach(&mut self, stream: StreamHandle);

    /// Start publishing the stream as `name`
    fn publish(&mut self, stream: StreamHandle, name: &str, mode: PublishMode);

    /// Stop publishing; a `NetStream.Unpublish.Success` status follows
    fn unpublish(&mut self, stream: StreamHandle);

    /// Stop delivering status for the group
    fn clear_group_status(&mut self, group: GroupHandle);

    /// Stop delivering status for the stream
    fn clear_stream_status(&mut self, stream: StreamHandle);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open_session(&mut self, uri: &str) -> Result<SessionHandle, TransportError> {
        (**self).open_session(uri)
    }

    fn close_session(&mut self, session: SessionHandle) {
        (**self).close_session(session)
    }

    fn create_group(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<GroupHandle, TransportError> {
        (**self).create_group(session, group_spec)
    }

    fn create_stream(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<StreamHandle, TransportError> {
        (**self).create_stream(session, group_spec)
    }

    fn set_multicast_address(
        &mut self,
        stream: StreamHandle,
        address: &str,
    ) -> Result<(), TransportError> {
        (**self).set_multicast_address(stream, address)
    }

    fn attach(&mut self, stream: StreamHandle, source: &str) -> Result<(), TransportError> {
        (**self).attach(stream, source)
    }

    fn detach(&mut self, stream: StreamHandle) {
        (**self).detach(stream)
    }

    fn publish(&mut self, stream: StreamHandle, name: &str, mode: PublishMode) {
        (**self).publish(stream, name, mode)
    }

    fn unpublish(&mut self, stream: StreamHandle) {
        (**self).unpublish(stream)
    }

    fn clear_group_status(&mut self, group: GroupHandle) {
        (**self).clear_group_status(group)
    }

    fn clear_stream_status(&mut self, stream: StreamHandle) {
        (**self).clear_stream_status(stream)
    }
}
