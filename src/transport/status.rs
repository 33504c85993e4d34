//! Status codes reported by transport resources
//!
//! Each resource kind has a closed set of codes the bridge reacts to. Anything
//! else parses to `None` and is ignored by the caller.

/// Loopback session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    ConnectSuccess,
    ConnectFailed,
    ConnectRejected,
    AppShutdown,
    Closed,
}

impl SessionStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NetConnection.Connect.Success" => Some(SessionStatus::ConnectSuccess),
            "NetConnection.Connect.Failed" => Some(SessionStatus::ConnectFailed),
            "NetConnection.Connect.Rejected" => Some(SessionStatus::ConnectRejected),
            "NetConnection.Connect.AppShutdown" => Some(SessionStatus::AppShutdown),
            "NetConnection.Connect.Closed" => Some(SessionStatus::Closed),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            SessionStatus::ConnectSuccess => "NetConnection.Connect.Success",
            SessionStatus::ConnectFailed => "NetConnection.Connect.Failed",
            SessionStatus::ConnectRejected => "NetConnection.Connect.Rejected",
            SessionStatus::AppShutdown => "NetConnection.Connect.AppShutdown",
            SessionStatus::Closed => "NetConnection.Connect.Closed",
        }
    }
}

/// Distribution group status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    ConnectSuccess,
    ConnectFailed,
    ConnectRejected,
    /// Peers were told the multicast stream went away
    UnpublishNotify,
}

impl GroupStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NetGroup.Connect.Success" => Some(GroupStatus::ConnectSuccess),
            "NetGroup.Connect.Failed" => Some(GroupStatus::ConnectFailed),
            "NetGroup.Connect.Rejected" => Some(GroupStatus::ConnectRejected),
            "NetGroup.MulticastStream.UnpublishNotify" => Some(GroupStatus::UnpublishNotify),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            GroupStatus::ConnectSuccess => "NetGroup.Connect.Success",
            GroupStatus::ConnectFailed => "NetGroup.Connect.Failed",
            GroupStatus::ConnectRejected => "NetGroup.Connect.Rejected",
            GroupStatus::UnpublishNotify => "NetGroup.MulticastStream.UnpublishNotify",
        }
    }
}

/// Distribution stream status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    ConnectSuccess,
    PublishStart,
    UnpublishSuccess,
}

impl StreamStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NetStream.Connect.Success" => Some(StreamStatus::ConnectSuccess),
            "NetStream.Publish.Start" => Some(StreamStatus::PublishStart),
            "NetStream.Unpublish.Success" => Some(StreamStatus::UnpublishSuccess),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            StreamStatus::ConnectSuccess => "NetStream.Connect.Success",
            StreamStatus::PublishStart => "NetStream.Publish.Start",
            StreamStatus::UnpublishSuccess => "NetStream.Unpublish.Success",
        }
    }
}
