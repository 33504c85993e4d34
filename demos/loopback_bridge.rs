//! Loopback bridge demo with a simulated transport
//!
//! Run with: cargo run --example loopback_bridge [STREAM_NAME]
//!
//! Publishes one fusion (IP multicast + peer-to-peer) stream into the bridge,
//! lets the simulated transport acknowledge every step, then unpublishes it and
//! prints the bridge statistics after each phase.
//!
//! Set `RUST_LOG=rtmp_multicast=trace` to see every state change.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::sync::mpsc;

use rtmp_multicast::transport::{
    GroupHandle, PublishMode, SessionHandle, StreamHandle, Transport, TransportError,
};
use rtmp_multicast::{BridgeConfig, BridgeHandle, BridgeService, PublishingClient};

/// Status notification produced by the simulated network
#[derive(Debug)]
enum Notice {
    Session(SessionHandle, &'static str),
    Group(GroupHandle, &'static str),
    Stream(StreamHandle, &'static str),
}

/// Transport that acknowledges every operation asynchronously
struct SimulatedTransport {
    next_handle: u64,
    notices: mpsc::UnboundedSender<Notice>,
    groups: HashMap<SessionHandle, GroupHandle>,
    stream_sessions: HashMap<StreamHandle, SessionHandle>,
    muted_groups: HashSet<GroupHandle>,
    muted_streams: HashSet<StreamHandle>,
}

impl SimulatedTransport {
    fn new(notices: mpsc::UnboundedSender<Notice>) -> Self {
        Self {
            next_handle: 0,
            notices,
            groups: HashMap::new(),
            stream_sessions: HashMap::new(),
            muted_groups: HashSet::new(),
            muted_streams: HashSet::new(),
        }
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn notify(&self, notice: Notice) {
        let muted = match notice {
            Notice::Group(group, _) => self.muted_groups.contains(&group),
            Notice::Stream(stream, _) => self.muted_streams.contains(&stream),
            Notice::Session(..) => false,
        };
        if !muted {
            let _ = self.notices.send(notice);
        }
    }
}

impl Transport for SimulatedTransport {
    fn open_session(&mut self, uri: &str) -> Result<SessionHandle, TransportError> {
        println!("  transport: connect {}", uri);
        let session = SessionHandle(self.next());
        self.notify(Notice::Session(session, "NetConnection.Connect.Success"));
        Ok(session)
    }

    fn close_session(&mut self, session: SessionHandle) {
        println!("  transport: close {}", session);
        self.notify(Notice::Session(session, "NetConnection.Connect.Closed"));
    }

    fn create_group(
        &mut self,
        session: SessionHandle,
        group_spec: &str,
    ) -> Result<GroupHandle, TransportError> {
        if group_spec.is_empty() {
            return Err(TransportError::new("empty group specifier"));
        }
        let group = GroupHandle(self.next());
        self.groups.insert(session, group);
        self.notify(Notice::Group(group, "NetGroup.Connect.Success"));
        Ok(group)
    }

    fn create_stream(
        &mut self,
        session: SessionHandle,
        _group_spec: &str,
    ) -> Result<StreamHandle, TransportError> {
        let stream = StreamHandle(self.next());
        self.stream_sessions.insert(stream, session);
        self.notify(Notice::Stream(stream, "NetStream.Connect.Success"));
        Ok(stream)
    }

    fn set_multicast_address(
        &mut self,
        stream: StreamHandle,
        address: &str,
    ) -> Result<(), TransportError> {
        address
            .parse::<std::net::SocketAddr>()
            .map_err(|e| TransportError::new(format!("bad multicast address: {}", e)))?;
        println!("  transport: {} bound to {}", stream, address);
        Ok(())
    }

    fn attach(&mut self, stream: StreamHandle, source: &str) -> Result<(), TransportError> {
        println!("  transport: {} attached to source '{}'", stream, source);
        Ok(())
    }

    fn detach(&mut self, stream: StreamHandle) {
        println!("  transport: {} detached", stream);
    }

    fn publish(&mut self, stream: StreamHandle, name: &str, mode: PublishMode) {
        println!("  transport: {} publishing '{}' ({})", stream, name, mode.as_str());
        self.notify(Notice::Stream(stream, "NetStream.Publish.Start"));
    }

    fn unpublish(&mut self, stream: StreamHandle) {
        self.notify(Notice::Stream(stream, "NetStream.Unpublish.Success"));

        let group = self
            .stream_sessions
            .get(&stream)
            .and_then(|session| self.groups.get(session))
            .copied();
        if let Some(group) = group {
            self.notify(Notice::Group(group, "NetGroup.MulticastStream.UnpublishNotify"));
        }
    }

    fn clear_group_status(&mut self, group: GroupHandle) {
        self.muted_groups.insert(group);
    }

    fn clear_stream_status(&mut self, stream: StreamHandle) {
        self.muted_streams.insert(stream);
    }
}

/// Forward simulated notices into the bridge mailbox
async fn forward(mut notices: mpsc::UnboundedReceiver<Notice>, handle: BridgeHandle) {
    while let Some(notice) = notices.recv().await {
        let result = match notice {
            Notice::Session(session, code) => handle.session_status(session, code, "").await,
            Notice::Group(group, code) => handle.group_status(group, code, "").await,
            Notice::Stream(stream, code) => handle.stream_status(stream, code, "").await,
        };
        if result.is_err() {
            break;
        }
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let stream_name = std::env::args().nth(1).unwrap_or_else(|| "cam1".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtmp_multicast=info".parse()?),
        )
        .init();

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let (service, handle) =
        BridgeService::new(BridgeConfig::default(), SimulatedTransport::new(notice_tx));

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let service_task = tokio::spawn(service.run_until(async {
        tokio::select! {
            _ = stop_rx => {}
            _ = tokio::signal::ctrl_c() => {}
        }
    }));
    let forward_task = tokio::spawn(forward(notice_rx, handle.clone()));

    let client = PublishingClient::new(
        1,
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
        "rtmp://localhost/multicast",
    );
    let query = "fms.multicast.type=1\
                 &fms.multicast.groupspec=G%3A0101010c05\
                 &fms.multicast.address=224.0.0.1%3A30000";

    println!("=== Publishing '{}' (fusion) ===", stream_name);
    let context = handle.publish(client, stream_name.as_str(), query).await?;
    settle().await;
    for info in handle.contexts().await? {
        println!("{} '{}' is {}", info.id, info.stream_name, info.state);
    }
    println!("{:?}", handle.stats().await?);
    println!();

    println!("=== Unpublishing {} ===", context);
    handle.unpublish(1, stream_name.as_str()).await?;
    settle().await;
    println!("{:?}", handle.stats().await?);

    let _ = stop_tx.send(());
    let bridge = service_task.await?;
    forward_task.abort();

    println!();
    println!("Contexts left: {}", bridge.registry().len());
    Ok(())
}
