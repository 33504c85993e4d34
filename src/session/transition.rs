//! Lifecycle transition table
//!
//! Pure functions mapping `(state, facts, event)` to the next state and the side
//! effect the bridge must perform. Nothing here touches the registry or the
//! transport, so every edge of the state machine is testable on its own.

use crate::multicast::MulticastType;
use crate::transport::{GroupStatus, SessionStatus, StreamStatus};

use super::state::LifecycleState;

/// Per-context facts the table depends on besides the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub multicast_type: MulticastType,
    /// A group handle is attached
    pub has_group: bool,
    /// The group already reported `UnpublishNotify`
    pub peers_notified: bool,
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Session(SessionStatus),
    Group(GroupStatus),
    Stream(StreamStatus),
    /// Source stream unpublished or its client went away
    Unpublish,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Event does not apply in this state
    Ignore,
    /// Join the distribution group
    CreateGroup,
    /// Create the distribution stream (and bind the multicast address)
    InitStream,
    /// Attach the source stream and publish live
    AttachAndPublish,
    /// Publish confirmed
    Republishing,
    /// Stream unpublished, peers not notified yet
    AwaitPeers,
    /// Remember that peers were notified before our own unpublish completed
    LatchPeersNotified,
    /// Run teardown
    Destroy,
    /// Setup step failed; run teardown
    Fail,
    /// Session went away; run teardown. `expected` when we asked for the close
    SessionEnded { expected: bool },
}

/// Result of one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// New state, if it changes before the action runs
    pub next: Option<LifecycleState>,
    pub action: Action,
}

impl Step {
    fn ignore() -> Self {
        Self {
            next: None,
            action: Action::Ignore,
        }
    }

    fn act(action: Action) -> Self {
        Self { next: None, action }
    }

    fn to(next: LifecycleState, action: Action) -> Self {
        Self {
            next: Some(next),
            action,
        }
    }
}

/// Compute the transition for `event` in `state`
pub fn step(state: LifecycleState, facts: Facts, event: LifecycleEvent) -> Step {
    use LifecycleState::*;

    match event {
        LifecycleEvent::Session(SessionStatus::ConnectSuccess) => match state {
            Connecting if facts.multicast_type.requires_group() => {
                Step::to(Connected, Action::CreateGroup)
            }
            Connecting => Step::to(Connected, Action::InitStream),
            _ => Step::ignore(),
        },
        LifecycleEvent::Session(_) => match state {
            Disconnected => Step::ignore(),
            _ => Step::to(
                Disconnected,
                Action::SessionEnded {
                    expected: state == Disconnecting,
                },
            ),
        },

        LifecycleEvent::Group(GroupStatus::ConnectSuccess) => match state {
            Connected => Step::act(Action::InitStream),
            _ => Step::ignore(),
        },
        LifecycleEvent::Group(GroupStatus::ConnectFailed | GroupStatus::ConnectRejected) => {
            if state >= Connected && state.is_live() {
                Step::act(Action::Fail)
            } else {
                Step::ignore()
            }
        }
        LifecycleEvent::Group(GroupStatus::UnpublishNotify) => match state {
            Unpublishing => Step::act(Action::LatchPeersNotified),
            Disconnecting | Disconnected | Init => Step::ignore(),
            _ => Step::act(Action::Destroy),
        },

        LifecycleEvent::Stream(StreamStatus::ConnectSuccess) => match state {
            PublishPending => Step::act(Action::AttachAndPublish),
            _ => Step::ignore(),
        },
        LifecycleEvent::Stream(StreamStatus::PublishStart) => match state {
            PublishPending => Step::to(Republishing, Action::Republishing),
            _ => Step::ignore(),
        },
        LifecycleEvent::Stream(StreamStatus::UnpublishSuccess) => match state {
            Unpublishing if facts.has_group && !facts.peers_notified => {
                Step::to(Unpublished, Action::AwaitPeers)
            }
            Unpublishing => Step::to(Unpublished, Action::Destroy),
            _ => Step::ignore(),
        },

        LifecycleEvent::Unpublish => {
            if state.is_live() {
                Step::act(Action::Destroy)
            } else {
                Step::ignore()
            }
        }
    }
}

/// Teardown stage selected by the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Detach and unpublish the distribution stream, then wait
    Unpublish,
    /// Silence status, detach, close the session, then wait
    Disconnect,
    /// Nothing left in flight: drop every index entry
    Unregister,
}

impl Teardown {
    /// State entered once this stage has been issued
    pub fn next_state(self) -> Option<LifecycleState> {
        match self {
            Teardown::Unpublish => Some(LifecycleState::Unpublishing),
            Teardown::Disconnect => Some(LifecycleState::Disconnecting),
            Teardown::Unregister => None,
        }
    }
}

/// Select the teardown stage for `state`
pub fn teardown(state: LifecycleState) -> Teardown {
    use LifecycleState::*;

    match state {
        Republishing => Teardown::Unpublish,
        Connecting | Connected | PublishPending | Unpublished => Teardown::Disconnect,
        Init | Unpublishing | Disconnecting | Disconnected => Teardown::Unregister,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use LifecycleState::*;

    fn facts(multicast_type: MulticastType) -> Facts {
        Facts {
            multicast_type,
            has_group: multicast_type.requires_group(),
            peers_notified: false,
        }
    }

    const ALL_STATES: [LifecycleState; 9] = [
        Init,
        Connecting,
        Connected,
        PublishPending,
        Republishing,
        Unpublishing,
        Unpublished,
        Disconnecting,
        Disconnected,
    ];

    #[test]
    fn test_connect_success_branches_on_type() {
        let ip = step(
            Connecting,
            facts(MulticastType::IpMulticast),
            LifecycleEvent::Session(SessionStatus::ConnectSuccess),
        );
        assert_eq!(ip, Step::to(Connected, Action::InitStream));

        for kind in [MulticastType::Fusion, MulticastType::PeerToPeer] {
            let s = step(
                Connecting,
                facts(kind),
                LifecycleEvent::Session(SessionStatus::ConnectSuccess),
            );
            assert_eq!(s, Step::to(Connected, Action::CreateGroup));
        }
    }

    #[test]
    fn test_duplicate_connect_success_ignored() {
        let s = step(
            Connected,
            facts(MulticastType::Fusion),
            LifecycleEvent::Session(SessionStatus::ConnectSuccess),
        );
        assert_eq!(s.action, Action::Ignore);
    }

    #[test]
    fn test_session_loss_expected_only_when_disconnecting() {
        let f = facts(MulticastType::IpMulticast);

        let lost = step(Republishing, f, LifecycleEvent::Session(SessionStatus::Closed));
        assert_eq!(
            lost,
            Step::to(Disconnected, Action::SessionEnded { expected: false })
        );

        let closed = step(Disconnecting, f, LifecycleEvent::Session(SessionStatus::Closed));
        assert_eq!(
            closed,
            Step::to(Disconnected, Action::SessionEnded { expected: true })
        );

        let rejected = step(
            Connecting,
            f,
            LifecycleEvent::Session(SessionStatus::ConnectRejected),
        );
        assert_eq!(rejected.action, Action::SessionEnded { expected: false });
    }

    #[test]
    fn test_group_flow() {
        let f = facts(MulticastType::PeerToPeer);

        assert_eq!(
            step(Connected, f, LifecycleEvent::Group(GroupStatus::ConnectSuccess)).action,
            Action::InitStream
        );
        assert_eq!(
            step(Connected, f, LifecycleEvent::Group(GroupStatus::ConnectFailed)).action,
            Action::Fail
        );
        assert_eq!(
            step(Connected, f, LifecycleEvent::Group(GroupStatus::ConnectRejected)).action,
            Action::Fail
        );
        assert_eq!(
            step(Disconnecting, f, LifecycleEvent::Group(GroupStatus::ConnectFailed)).action,
            Action::Ignore
        );
    }

    #[test]
    fn test_unpublish_notify() {
        let f = facts(MulticastType::Fusion);
        let notify = LifecycleEvent::Group(GroupStatus::UnpublishNotify);

        assert_eq!(step(Republishing, f, notify).action, Action::Destroy);
        assert_eq!(step(Unpublished, f, notify).action, Action::Destroy);
        assert_eq!(step(Unpublishing, f, notify).action, Action::LatchPeersNotified);
        assert_eq!(step(Disconnecting, f, notify).action, Action::Ignore);
    }

    #[test]
    fn test_stream_publish_flow() {
        let f = facts(MulticastType::IpMulticast);

        assert_eq!(
            step(PublishPending, f, LifecycleEvent::Stream(StreamStatus::ConnectSuccess)).action,
            Action::AttachAndPublish
        );
        assert_eq!(
            step(PublishPending, f, LifecycleEvent::Stream(StreamStatus::PublishStart)),
            Step::to(Republishing, Action::Republishing)
        );
        assert_eq!(
            step(Republishing, f, LifecycleEvent::Stream(StreamStatus::PublishStart)).action,
            Action::Ignore
        );
    }

    #[test]
    fn test_unpublish_success_waits_for_peers_with_group() {
        let done = LifecycleEvent::Stream(StreamStatus::UnpublishSuccess);

        assert_eq!(
            step(Unpublishing, facts(MulticastType::Fusion), done),
            Step::to(Unpublished, Action::AwaitPeers)
        );
        assert_eq!(
            step(Unpublishing, facts(MulticastType::IpMulticast), done),
            Step::to(Unpublished, Action::Destroy)
        );

        let notified = Facts {
            peers_notified: true,
            ..facts(MulticastType::PeerToPeer)
        };
        assert_eq!(
            step(Unpublishing, notified, done),
            Step::to(Unpublished, Action::Destroy)
        );
    }

    #[test]
    fn test_unpublish_only_while_live() {
        let f = facts(MulticastType::IpMulticast);

        for state in ALL_STATES {
            let expected = if state.is_live() {
                Action::Destroy
            } else {
                Action::Ignore
            };
            assert_eq!(step(state, f, LifecycleEvent::Unpublish).action, expected);
        }
    }

    #[test]
    fn test_teardown_stages() {
        assert_eq!(teardown(Republishing), Teardown::Unpublish);
        for state in [Connecting, Connected, PublishPending, Unpublished] {
            assert_eq!(teardown(state), Teardown::Disconnect);
        }
        for state in [Init, Unpublishing, Disconnecting, Disconnected] {
            assert_eq!(teardown(state), Teardown::Unregister);
        }
    }

    fn any_event() -> impl Strategy<Value = LifecycleEvent> {
        prop_oneof![
            Just(LifecycleEvent::Session(SessionStatus::ConnectSuccess)),
            Just(LifecycleEvent::Session(SessionStatus::ConnectFailed)),
            Just(LifecycleEvent::Session(SessionStatus::ConnectRejected)),
            Just(LifecycleEvent::Session(SessionStatus::AppShutdown)),
            Just(LifecycleEvent::Session(SessionStatus::Closed)),
            Just(LifecycleEvent::Group(GroupStatus::ConnectSuccess)),
            Just(LifecycleEvent::Group(GroupStatus::ConnectFailed)),
            Just(LifecycleEvent::Group(GroupStatus::ConnectRejected)),
            Just(LifecycleEvent::Group(GroupStatus::UnpublishNotify)),
            Just(LifecycleEvent::Stream(StreamStatus::ConnectSuccess)),
            Just(LifecycleEvent::Stream(StreamStatus::PublishStart)),
            Just(LifecycleEvent::Stream(StreamStatus::UnpublishSuccess)),
            Just(LifecycleEvent::Unpublish),
        ]
    }

    fn any_type() -> impl Strategy<Value = MulticastType> {
        prop_oneof![
            Just(MulticastType::Fusion),
            Just(MulticastType::IpMulticast),
            Just(MulticastType::PeerToPeer),
        ]
    }

    proptest! {
        #[test]
        fn prop_state_never_decreases(
            kind in any_type(),
            events in proptest::collection::vec(any_event(), 0..40),
        ) {
            let mut state = Connecting;
            let mut f = facts(kind);

            for event in events {
                let s = step(state, f, event);
                if let Some(next) = s.next {
                    prop_assert!(next >= state);
                    state = next;
                }
                match s.action {
                    Action::LatchPeersNotified => f.peers_notified = true,
                    Action::Destroy | Action::Fail | Action::SessionEnded { .. } => {
                        match teardown(state).next_state() {
                            Some(next) => {
                                prop_assert!(next >= state);
                                state = next;
                            }
                            None => break,
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
