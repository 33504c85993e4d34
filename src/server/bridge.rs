//! Stream context lifecycle orchestration
//!
//! [`Bridge`] admits publishes, drives every [`StreamContext`] through its
//! lifecycle as status events arrive, and tears contexts down in stages:
//!
//! ```text
//!  publish ─► Init ─open─► Connecting ─ok─► Connected ─(group ok)─► PublishPending
//!                                                                        │ stream ok:
//!                                                                        │ attach + publish
//!                                                                        ▼
//!  unregister ◄─closed─ Disconnecting ◄─close─ Unpublished ◄─ok─ Unpublishing ◄─ Republishing
//! ```
//!
//! Every method runs to completion; nothing blocks. Transport results come back
//! through the `on_*_status` entry points.

use std::net::IpAddr;

use crate::error::Result;
use crate::multicast::{parse_query, rewrite_protocol, validate};
use crate::registry::{ContextId, ContextInfo, ContextRegistry, StreamContext};
use crate::session::transition::{self, Action, LifecycleEvent, Teardown};
use crate::session::{LifecycleState, PublishingClient};
use crate::stats::BridgeStats;
use crate::transport::{
    GroupHandle, GroupStatus, SessionHandle, SessionStatus, StreamHandle, StreamStatus, Transport,
};

use super::config::BridgeConfig;

/// Publish-to-multicast bridge
pub struct Bridge<T: Transport> {
    config: BridgeConfig,
    transport: T,
    registry: ContextRegistry,
    stats: BridgeStats,
}

impl<T: Transport> Bridge<T> {
    /// Create a bridge with an empty registry
    pub fn new(config: BridgeConfig, transport: T) -> Self {
        Self::with_registry(config, transport, ContextRegistry::new())
    }

    /// Create a bridge around an existing registry
    pub fn with_registry(config: BridgeConfig, transport: T, registry: ContextRegistry) -> Self {
        let mut stats = BridgeStats::new();
        stats.active_contexts = registry.len() as u64;

        Self {
            config,
            transport,
            registry,
            stats,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats.clone()
    }

    /// Snapshot of every registered context
    pub fn contexts(&self) -> Vec<ContextInfo> {
        self.registry.infos()
    }

    /// Consume the bridge, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// A client started publishing `stream_name`
    ///
    /// Returns the new context on success. On `Err` the caller must close the
    /// publishing client's connection; no context was created.
    pub fn on_publish(
        &mut self,
        client: PublishingClient,
        stream_name: &str,
        query: &str,
    ) -> Result<ContextId> {
        let params = parse_query(query);
        let request = match validate(&params, &self.config.parameters) {
            Ok(request) => request,
            Err(e) => {
                self.stats.publishes_rejected += 1;
                tracing::debug!(
                    stream = stream_name,
                    client = client.id,
                    peer = %client.address,
                    "Closing rejected publisher"
                );
                return Err(e.into());
            }
        };

        if let Some(stale) = self.registry.lookup_by_stream_name(stream_name) {
            self.stats.replacements += 1;
            self.force_close(stale);
        }

        let multicast_type = request.multicast_type;
        let client_id = client.id;
        let id = self
            .registry
            .register(StreamContext::new(client, stream_name, request))?;

        self.stats.publishes_accepted += 1;
        self.stats.active_contexts = self.registry.len() as u64;

        tracing::info!(
            stream = stream_name,
            context = %id,
            client = client_id,
            multicast_type = %multicast_type,
            "Publish accepted"
        );

        self.connect(id);
        Ok(id)
    }

    /// The source stream was unpublished
    ///
    /// Returns `true` if teardown was started.
    pub fn on_unpublish(&mut self, client_id: u64, stream_name: &str) -> bool {
        match self.registry.lookup_by_stream_name(stream_name) {
            Some(id) => {
                tracing::info!(stream = stream_name, client = client_id, "Source unpublished");
                self.apply(id, LifecycleEvent::Unpublish, "unpublish")
            }
            None => {
                tracing::debug!(stream = stream_name, client = client_id, "Unpublish for unknown stream");
                false
            }
        }
    }

    /// Status reported for a loopback session
    ///
    /// Unknown codes and handles that are no longer registered are ignored.
    pub fn on_session_status(&mut self, session: SessionHandle, code: &str, description: &str) {
        match SessionStatus::from_code(code) {
            Some(status) => self.handle_session_status(session, status, description),
            None => tracing::debug!(session = %session, code, "Ignoring session status"),
        }
    }

    /// Status reported for a distribution group
    pub fn on_group_status(&mut self, group: GroupHandle, code: &str, description: &str) {
        match GroupStatus::from_code(code) {
            Some(status) => self.handle_group_status(group, status, description),
            None => tracing::debug!(group = %group, code, "Ignoring group status"),
        }
    }

    /// Status reported for a distribution stream
    pub fn on_stream_status(&mut self, stream: StreamHandle, code: &str, description: &str) {
        match StreamStatus::from_code(code) {
            Some(status) => self.handle_stream_status(stream, status, description),
            None => tracing::debug!(stream_handle = %stream, code, "Ignoring stream status"),
        }
    }

    pub fn handle_session_status(
        &mut self,
        session: SessionHandle,
        status: SessionStatus,
        description: &str,
    ) {
        match self.registry.lookup_by_session(session) {
            Some(id) => {
                self.apply(id, LifecycleEvent::Session(status), description);
            }
            None => tracing::debug!(session = %session, code = status.code(), "Stale session status"),
        }
    }

    pub fn handle_group_status(&mut self, group: GroupHandle, status: GroupStatus, description: &str) {
        match self.registry.lookup_by_group(group) {
            Some(id) => {
                self.apply(id, LifecycleEvent::Group(status), description);
            }
            None => tracing::debug!(group = %group, code = status.code(), "Stale group status"),
        }
    }

    pub fn handle_stream_status(
        &mut self,
        stream: StreamHandle,
        status: StreamStatus,
        description: &str,
    ) {
        match self.registry.lookup_by_stream(stream) {
            Some(id) => {
                self.apply(id, LifecycleEvent::Stream(status), description);
            }
            None => {
                tracing::debug!(stream_handle = %stream, code = status.code(), "Stale stream status")
            }
        }
    }

    /// Run one event through the transition table and perform its action
    ///
    /// Returns `false` if the event did not apply in the context's state.
    fn apply(&mut self, id: ContextId, event: LifecycleEvent, description: &str) -> bool {
        let Some(ctx) = self.registry.get(id) else {
            return false;
        };
        let state = ctx.state;
        let step = transition::step(state, ctx.facts(), event);

        if step.action == Action::Ignore {
            tracing::debug!(
                stream = %ctx.stream_name,
                context = %id,
                state = %state,
                event = ?event,
                "Event ignored in current state"
            );
            return false;
        }

        if let Some(next) = step.next {
            self.set_state(id, next);
        }

        match step.action {
            Action::Ignore => {}
            Action::CreateGroup => self.create_group(id),
            Action::InitStream => self.init_stream(id),
            Action::AttachAndPublish => self.attach_and_publish(id),
            Action::Republishing => {
                if let Some(ctx) = self.registry.get_mut(id) {
                    ctx.reached_republishing = true;
                }
                self.stats.republishing_started += 1;
                self.log_info(id, "Republishing into distribution group");
            }
            Action::AwaitPeers => {
                self.log_info(id, "Distribution stream unpublished, waiting for peers");
            }
            Action::LatchPeersNotified => {
                if let Some(ctx) = self.registry.get_mut(id) {
                    ctx.peers_notified = true;
                }
                self.log_info(id, "Peers notified before unpublish completed");
            }
            Action::Destroy => {
                tracing::info!(context = %id, state = %state, description, "Tearing down");
                self.destroy(id);
            }
            Action::Fail if state == LifecycleState::Republishing => {
                self.stats.transport_failures += 1;
                self.log_error(id, description, "Distribution group lost while republishing");
                self.destroy(id);
            }
            Action::Fail => {
                self.stats.setup_failures += 1;
                self.log_error(id, description, "Distribution group failed to connect");
                self.destroy(id);
            }
            Action::SessionEnded { expected } => {
                if expected {
                    self.log_info(id, "Loopback session closed");
                } else {
                    self.stats.transport_failures += 1;
                    self.log_error(id, description, "Loopback session lost");
                }
                self.release_session(id);
                self.destroy(id);
            }
        }

        true
    }

    /// `Init → Connecting`: open the loopback session
    fn connect(&mut self, id: ContextId) {
        let Some(ctx) = self.registry.get(id) else {
            return;
        };

        let uri = match rewrite_protocol(&ctx.client.uri, &self.config.loopback_protocol) {
            Ok(uri) => uri,
            Err(e) => {
                self.stats.setup_failures += 1;
                self.log_error(id, &e.to_string(), "Cannot derive loopback URI");
                self.destroy(id);
                return;
            }
        };

        match self.transport.open_session(&uri) {
            Ok(session) => {
                self.attach_session(id, session);
                self.set_state(id, LifecycleState::Connecting);
                tracing::info!(context = %id, session = %session, uri = %uri, "Connecting loopback session");
            }
            Err(e) => {
                self.stats.setup_failures += 1;
                self.log_error(id, e.message(), "Loopback session failed to open");
                self.destroy(id);
            }
        }
    }

    /// Join the distribution group over the loopback session
    fn create_group(&mut self, id: ContextId) {
        let Some(ctx) = self.registry.get(id) else {
            return;
        };
        let Some(session) = ctx.session else {
            return;
        };

        match self.transport.create_group(session, &ctx.group_spec) {
            Ok(group) => {
                if let Err(e) = self.registry.set_group(id, Some(group)) {
                    tracing::error!(context = %id, error = %e, "Failed to index group");
                }
                tracing::info!(context = %id, group = %group, "Joining distribution group");
            }
            Err(e) => {
                self.stats.setup_failures += 1;
                self.log_error(id, e.message(), "Distribution group construction failed");
                self.destroy(id);
            }
        }
    }

    /// Create the distribution stream and bind its multicast address
    fn init_stream(&mut self, id: ContextId) {
        let Some(ctx) = self.registry.get(id) else {
            return;
        };
        let Some(session) = ctx.session else {
            return;
        };
        let address = ctx
            .address
            .clone()
            .filter(|_| ctx.multicast_type.requires_address());

        let stream = match self.transport.create_stream(session, &ctx.group_spec) {
            Ok(stream) => stream,
            Err(e) => {
                self.stats.setup_failures += 1;
                self.log_error(id, e.message(), "Distribution stream construction failed");
                self.destroy(id);
                return;
            }
        };

        // Indexed before binding so a failed bind still releases the stream
        if let Err(e) = self.registry.set_stream(id, Some(stream)) {
            tracing::error!(context = %id, error = %e, "Failed to index stream");
        }

        if let Some(address) = address {
            if let Err(e) = self.transport.set_multicast_address(stream, &address) {
                self.stats.setup_failures += 1;
                self.log_error(id, e.message(), "Multicast address bind failed");
                self.destroy(id);
                return;
            }
        }

        self.set_state(id, LifecycleState::PublishPending);
        tracing::info!(context = %id, stream_handle = %stream, "Distribution stream created");
    }

    /// `PublishPending`: feed the distribution stream and publish it live
    fn attach_and_publish(&mut self, id: ContextId) {
        let Some(ctx) = self.registry.get(id) else {
            return;
        };
        let Some(stream) = ctx.stream else {
            return;
        };
        let name = ctx.stream_name.clone();

        if let Err(e) = self.transport.attach(stream, &name) {
            self.stats.setup_failures += 1;
            self.log_error(id, e.message(), "Attaching source stream failed");
            self.destroy(id);
            return;
        }

        self.transport.publish(stream, &name, self.config.publish_mode);
        tracing::info!(
            stream = %name,
            context = %id,
            mode = self.config.publish_mode.as_str(),
            "Publishing distribution stream"
        );
    }

    /// Tear a context down one stage
    ///
    /// Releases the stream name first so a new publish can claim it, then acts on
    /// the current state: unpublish the stream, close the session, or unregister
    /// once nothing is in flight. Calling it on an unregistered context is a no-op.
    pub fn destroy(&mut self, id: ContextId) {
        self.registry.unindex_stream_name(id);

        let Some(ctx) = self.registry.get(id) else {
            tracing::debug!(context = %id, "Destroy on unregistered context");
            return;
        };
        let state = ctx.state;
        let (session, stream, group) = (ctx.session, ctx.stream, ctx.group);

        match transition::teardown(state) {
            Teardown::Unpublish => {
                if let Some(stream) = stream {
                    self.transport.detach(stream);
                    self.transport.unpublish(stream);
                }
                self.set_state(id, LifecycleState::Unpublishing);
                self.log_info(id, "Unpublishing distribution stream");
            }
            Teardown::Disconnect => {
                if let Some(group) = group {
                    self.transport.clear_group_status(group);
                }
                if let Some(stream) = stream {
                    self.transport.clear_stream_status(stream);
                    self.transport.detach(stream);
                }
                match session {
                    Some(session) => {
                        self.transport.close_session(session);
                        self.set_state(id, LifecycleState::Disconnecting);
                        self.log_info(id, "Closing loopback session");
                    }
                    None => self.unregister(id),
                }
            }
            Teardown::Unregister => self.unregister(id),
        }
    }

    /// Remove a context and all its index entries
    fn unregister(&mut self, id: ContextId) {
        if let Some(ctx) = self.registry.unregister(id) {
            self.stats.teardowns_completed += 1;
            if !ctx.reached_republishing {
                self.stats.failed_setups += 1;
            }
            self.stats.active_contexts = self.registry.len() as u64;
            tracing::info!(
                stream = %ctx.stream_name,
                context = %id,
                state = %ctx.state,
                lifetime_ms = ctx.created_at.elapsed().as_millis() as u64,
                "Stream context removed"
            );
        }
    }

    /// Force a context into teardown regardless of its state
    pub(super) fn force_close(&mut self, id: ContextId) {
        let Some(ctx) = self.registry.get(id) else {
            return;
        };
        tracing::info!(
            stream = %ctx.stream_name,
            context = %id,
            state = %ctx.state,
            "Force-closing stream context"
        );

        if ctx.state < LifecycleState::Unpublished {
            self.set_state(id, LifecycleState::Unpublished);
        }
        self.destroy(id);
    }

    fn attach_session(&mut self, id: ContextId, session: SessionHandle) {
        if let Err(e) = self.registry.set_session(id, Some(session)) {
            tracing::error!(context = %id, error = %e, "Failed to index session");
        }
    }

    /// The session is gone; drop its handle and index entry
    fn release_session(&mut self, id: ContextId) {
        if let Err(e) = self.registry.set_session(id, None) {
            tracing::debug!(context = %id, error = %e, "Session already released");
        }
    }

    fn set_state(&mut self, id: ContextId, state: LifecycleState) {
        if let Some(ctx) = self.registry.get_mut(id) {
            tracing::trace!(context = %id, from = %ctx.state, to = %state, "State change");
            ctx.state = state;
        }
    }

    fn log_info(&self, id: ContextId, message: &str) {
        if let Some(ctx) = self.registry.get(id) {
            tracing::info!(stream = %ctx.stream_name, context = %id, state = %ctx.state, "{}", message);
        }
    }

    fn log_error(&self, id: ContextId, detail: &str, message: &str) {
        if let Some(ctx) = self.registry.get(id) {
            tracing::error!(
                stream = %ctx.stream_name,
                context = %id,
                state = %ctx.state,
                detail,
                "{}",
                message
            );
        }
    }

    /// Tear down every context published by `client_id`
    ///
    /// Covers a publisher vanishing without an unpublish. Returns the number of
    /// contexts torn down.
    pub fn on_client_disconnect(&mut self, client_id: u64) -> usize {
        let mut closed = 0;

        for id in self.registry.contexts_for_client(client_id) {
            if self.apply(id, LifecycleEvent::Unpublish, "client disconnected") {
                closed += 1;
            }
        }

        if closed > 0 {
            tracing::info!(client = client_id, contexts = closed, "Publisher disconnected");
        }
        closed
    }

    /// Release request from `address` for `stream_name`
    ///
    /// Tears the context down only if the same peer published it and it is still
    /// live; a newer client that took the name over is left alone.
    pub fn on_release(&mut self, address: IpAddr, stream_name: &str) -> bool {
        let Some(id) = self.registry.lookup_by_stream_name(stream_name) else {
            return false;
        };
        let Some(ctx) = self.registry.get(id) else {
            return false;
        };

        if ctx.client.address != address {
            tracing::debug!(
                stream = stream_name,
                owner = %ctx.client.address,
                peer = %address,
                "Release from a different peer ignored"
            );
            return false;
        }

        if !ctx.state.is_live() {
            return false;
        }

        tracing::info!(stream = stream_name, peer = %address, "Stream released");
        self.destroy(id);
        true
    }

    /// Force-close every live context
    ///
    /// Called when the service stops. Sessions are closed immediately instead of
    /// waiting for unpublish acknowledgements. Returns the number of contexts closed.
    pub fn shutdown(&mut self) -> usize {
        let live = self.registry.live_contexts();
        let count = live.len();

        for id in live {
            self.force_close(id);
        }

        tracing::info!(contexts = count, remaining = self.registry.len(), "Bridge shut down");
        count
    }
}
