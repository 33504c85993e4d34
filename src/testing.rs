//! Recording transport for unit tests

use crate::transport::{
    GroupHandle, PublishMode, SessionHandle, StreamHandle, Transport, TransportError,
};

/// A transport call, in the order the bridge issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    OpenSession(String),
    CloseSession(SessionHandle),
    CreateGroup(SessionHandle, String),
    CreateStream(SessionHandle, String),
    SetMulticastAddress(StreamHandle, String),
    Attach(StreamHandle, String),
    Detach(StreamHandle),
    Publish(StreamHandle, String),
    Unpublish(StreamHandle),
    ClearGroupStatus(GroupHandle),
    ClearStreamStatus(StreamHandle),
}

/// Transport that records calls and fails on demand
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub calls: Vec<Call>,
    pub sessions: Vec<SessionHandle>,
    pub groups: Vec<GroupHandle>,
    pub streams: Vec<StreamHandle>,
    pub fail_open: bool,
    pub fail_group: bool,
    pub fail_stream: bool,
    pub fail_bind: bool,
    pub fail_attach: bool,
    next_handle: u64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    pub fn last_session(&self) -> SessionHandle {
        *self.sessions.last().expect("no session opened")
    }

    pub fn last_group(&self) -> GroupHandle {
        *self.groups.last().expect("no group created")
    }

    pub fn last_stream(&self) -> StreamHandle {
        *self.streams.last().expect("no stream created")
    }

    pub fn called(&self, call: &Call) -> bool {
        self.calls.contains(call)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Transport for RecordingTransport {
    fn open_session(&mut self, uri: &str) -> Result<SessionHandle, TransportError> {
        self.calls.push(Call::OpenSession(uri.to_string()));
        if self.fail_open {
            return Err(TransportError::new("connect refused"));
        }
        let session = SessionHandle(self.next());
        self.sessions.push(session);
        Ok(session)
    }

    fn close_session(&mut self, session: SessionHandle) {
        self.calls.push(Call::CloseSession(session));
    }

    fn create_group(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<GroupHandle, TransportError> {
        self.calls
            .push(Call::CreateGroup(session, group_spec.to_string()));
        if self.fail_group {
            return Err(TransportError::new("invalid group specifier"));
        }
        let group = GroupHandle(self.next());
        self.groups.push(group);
        Ok(group)
    }

    fn create_stream(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<StreamHandle, TransportError> {
        self.calls
            .push(Call::CreateStream(session, group_spec.to_string()));
        if self.fail_stream {
            return Err(TransportError::new("stream creation failed"));
        }
        let stream = StreamHandle(self.next());
        self.streams.push(stream);
        Ok(stream)
    }

    fn set_multicast_address(
        &mut self,
        stream: StreamHandle,
        address: &str,
    ) -> Result<(), TransportError> {
        self.calls
            .push(Call::SetMulticastAddress(stream, address.to_string()));
        if self.fail_bind {
            return Err(TransportError::new("address not bindable"));
        }
        Ok(())
    }

    fn attach(&mut self, stream: StreamHandle, source: &str) -> Result<(), TransportError> {
        self.calls.push(Call::Attach(stream, source.to_string()));
        if self.fail_attach {
            return Err(TransportError::new("source stream not found"));
        }
        Ok(())
    }

    fn detach(&mut self, stream: StreamHandle) {
        self.calls.push(Call::Detach(stream));
    }

    fn publish(&mut self, stream: StreamHandle, name: &str, _mode: PublishMode) {
        self.calls.push(Call::Publish(stream, name.to_string()));
    }

    fn unpublish(&mut self, stream: StreamHandle) {
        self.calls.push(Call::Unpublish(stream));
    }

    fn clear_group_status(&mut self, group: GroupHandle) {
        self.calls.push(Call::ClearGroupStatus(group));
    }

    fn clear_stream_status(&mut self, stream: StreamHandle) {
        self.calls.push(Call::ClearStreamStatus(stream));
    }
}
