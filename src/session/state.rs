//! Stream context lifecycle state
//!
//! Tracks a republished stream from loopback connection to full teardown. The
//! variants are ordered; "still live" checks compare against `Republishing`.

use std::fmt;

/// Lifecycle state of a stream context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Registered, loopback session not opened yet
    Init,
    /// Loopback session opening
    Connecting,
    /// Session up, group joining (group modes) or stream about to be created
    Connected,
    /// Distribution stream created, waiting for it to connect and publish
    PublishPending,
    /// Source stream republished into the distribution group
    Republishing,
    /// Distribution stream unpublishing
    Unpublishing,
    /// Distribution stream unpublished, waiting for peers to be notified
    Unpublished,
    /// Loopback session closing
    Disconnecting,
    /// Loopback session gone
    Disconnected,
}

impl LifecycleState {
    /// Whether unpublish, release and replacement still act on this context
    pub fn is_live(self) -> bool {
        self <= LifecycleState::Republishing
    }

    /// Whether teardown has been started
    pub fn is_tearing_down(self) -> bool {
        self >= LifecycleState::Unpublishing
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Init => "init",
            LifecycleState::Connecting => "connecting",
            LifecycleState::Connected => "connected",
            LifecycleState::PublishPending => "publish-pending",
            LifecycleState::Republishing => "republishing",
            LifecycleState::Unpublishing => "unpublishing",
            LifecycleState::Unpublished => "unpublished",
            LifecycleState::Disconnecting => "disconnecting",
            LifecycleState::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
