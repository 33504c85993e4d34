//! Stream context registry implementation
//!
//! Owns every live [`StreamContext`] and the four indexes used to route events
//! back to them: source stream name, session handle, distribution stream handle
//! and group handle.

use std::collections::HashMap;

use crate::session::LifecycleState;
use crate::transport::{GroupHandle, SessionHandle, StreamHandle};

use super::entry::{ContextId, ContextInfo, StreamContext};
use super::error::RegistryError;

/// Keys currently indexed for one context
#[derive(Debug, Default)]
struct IndexedKeys {
    name: Option<String>,
    session: Option<SessionHandle>,
    stream: Option<StreamHandle>,
    group: Option<GroupHandle>,
}

/// Registry of all stream contexts
///
/// Not synchronised: the bridge owns it and runs every event to completion on a
/// single task.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: HashMap<ContextId, StreamContext>,
    indexed: HashMap<ContextId, IndexedKeys>,
    by_name: HashMap<String, ContextId>,
    by_session: HashMap<SessionHandle, ContextId>,
    by_stream: HashMap<StreamHandle, ContextId>,
    by_group: HashMap<GroupHandle, ContextId>,
    next_id: u64,
}

impl ContextRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new context
    ///
    /// Indexes the stream name and every handle already set on the context.
    /// Fails if a live context still claims the same stream name.
    pub fn register(&mut self, context: StreamContext) -> Result<ContextId, RegistryError> {
        if let Some(&owner) = self.by_name.get(&context.stream_name) {
            return Err(RegistryError::StreamNameInUse {
                name: context.stream_name,
                owner,
            });
        }

        self.next_id += 1;
        let id = ContextId(self.next_id);

        self.by_name.insert(context.stream_name.clone(), id);
        self.indexed.insert(
            id,
            IndexedKeys {
                name: Some(context.stream_name.clone()),
                ..IndexedKeys::default()
            },
        );
        self.contexts.insert(id, context);
        self.reindex(id)?;

        tracing::debug!(context = %id, stream = %self.contexts[&id].stream_name, "Context registered");

        Ok(id)
    }

    /// Bring the handle indexes in line with the context's handles
    ///
    /// Idempotent. Adds entries for handles that were set and drops entries for
    /// handles that were cleared since the last call.
    pub fn reindex(&mut self, id: ContextId) -> Result<(), RegistryError> {
        let ctx = self
            .contexts
            .get(&id)
            .ok_or(RegistryError::ContextNotFound(id))?;
        let keys = self.indexed.entry(id).or_default();

        sync_index(&mut self.by_session, &mut keys.session, ctx.session, id);
        sync_index(&mut self.by_stream, &mut keys.stream, ctx.stream, id);
        sync_index(&mut self.by_group, &mut keys.group, ctx.group, id);

        Ok(())
    }

    /// Set or clear the session handle, updating its index
    pub fn set_session(
        &mut self,
        id: ContextId,
        session: Option<SessionHandle>,
    ) -> Result<(), RegistryError> {
        self.context_mut(id)?.session = session;
        self.reindex(id)
    }

    /// Set or clear the distribution stream handle, updating its index
    pub fn set_stream(
        &mut self,
        id: ContextId,
        stream: Option<StreamHandle>,
    ) -> Result<(), RegistryError> {
        self.context_mut(id)?.stream = stream;
        self.reindex(id)
    }

    /// Set or clear the group handle, updating its index
    pub fn set_group(
        &mut self,
        id: ContextId,
        group: Option<GroupHandle>,
    ) -> Result<(), RegistryError> {
        self.context_mut(id)?.group = group;
        self.reindex(id)
    }

    /// Release the stream name so a new publish can claim it
    ///
    /// Handle indexes are kept so late status events still reach the context.
    pub fn unindex_stream_name(&mut self, id: ContextId) {
        if let Some(name) = self.indexed.get_mut(&id).and_then(|keys| keys.name.take()) {
            if self.by_name.get(&name) == Some(&id) {
                self.by_name.remove(&name);
            }
        }
    }

    /// Remove a context and every index entry pointing at it
    ///
    /// Returns the context with its handles cleared, or `None` if it was already
    /// gone.
    pub fn unregister(&mut self, id: ContextId) -> Option<StreamContext> {
        self.unindex_stream_name(id);

        if let Some(keys) = self.indexed.remove(&id) {
            remove_if_owned(&mut self.by_session, keys.session, id);
            remove_if_owned(&mut self.by_stream, keys.stream, id);
            remove_if_owned(&mut self.by_group, keys.group, id);
        }

        let mut ctx = self.contexts.remove(&id)?;
        ctx.session = None;
        ctx.stream = None;
        ctx.group = None;

        tracing::debug!(context = %id, stream = %ctx.stream_name, "Context unregistered");

        Some(ctx)
    }

    pub fn get(&self, id: ContextId) -> Option<&StreamContext> {
        self.contexts.get(&id)
    }

    /// Mutable access for state changes
    ///
    /// Handle fields changed through this reference must be followed by
    /// [`reindex`](Self::reindex); prefer the `set_*` methods.
    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut StreamContext> {
        self.contexts.get_mut(&id)
    }

    fn context_mut(&mut self, id: ContextId) -> Result<&mut StreamContext, RegistryError> {
        self.contexts
            .get_mut(&id)
            .ok_or(RegistryError::ContextNotFound(id))
    }

    pub fn lookup_by_stream_name(&self, name: &str) -> Option<ContextId> {
        self.by_name.get(name).copied()
    }

    pub fn lookup_by_session(&self, session: SessionHandle) -> Option<ContextId> {
        self.by_session.get(&session).copied()
    }

    pub fn lookup_by_stream(&self, stream: StreamHandle) -> Option<ContextId> {
        self.by_stream.get(&stream).copied()
    }

    pub fn lookup_by_group(&self, group: GroupHandle) -> Option<ContextId> {
        self.by_group.get(&group).copied()
    }

    /// IDs of contexts published by `client_id`, oldest first
    pub fn contexts_for_client(&self, client_id: u64) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self
            .contexts
            .iter()
            .filter(|(_, ctx)| ctx.client.id == client_id)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// IDs of contexts that have not started teardown, oldest first
    pub fn live_contexts(&self) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self
            .contexts
            .iter()
            .filter(|(_, ctx)| ctx.state.is_live())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Snapshot of one context
    pub fn info(&self, id: ContextId) -> Option<ContextInfo> {
        self.contexts.get(&id).map(|ctx| ContextInfo::new(id, ctx))
    }

    /// Snapshot of every context, oldest first
    pub fn infos(&self) -> Vec<ContextInfo> {
        let mut infos: Vec<ContextInfo> = self
            .contexts
            .iter()
            .map(|(id, ctx)| ContextInfo::new(*id, ctx))
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// State of a context, if registered
    pub fn state(&self, id: ContextId) -> Option<LifecycleState> {
        self.contexts.get(&id).map(|ctx| ctx.state)
    }

    /// Number of registered contexts
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

fn sync_index<K>(
    index: &mut HashMap<K, ContextId>,
    indexed: &mut Option<K>,
    current: Option<K>,
    id: ContextId,
) where
    K: std::hash::Hash + Eq + Copy,
{
    if *indexed == current {
        return;
    }

    remove_if_owned(index, indexed.take(), id);

    if let Some(key) = current {
        index.insert(key, id);
        *indexed = Some(key);
    }
}

fn remove_if_owned<K>(index: &mut HashMap<K, ContextId>, key: Option<K>, id: ContextId)
where
    K: std::hash::Hash + Eq,
{
    if let Some(key) = key {
        if index.get(&key) == Some(&id) {
            index.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use proptest::prelude::*;

    use super::*;
    use crate::multicast::{MulticastType, PublishRequest};
    use crate::session::PublishingClient;

    fn context(name: &str) -> StreamContext {
        let client = PublishingClient::new(
            1,
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            "rtmp://localhost/multicast",
        );
        let request = PublishRequest {
            multicast_type: MulticastType::Fusion,
            group_spec: "G:0101".into(),
            address: Some("224.0.0.1:30000".into()),
        };
        StreamContext::new(client, name, request)
    }

    /// Every set handle has exactly one entry, every cleared one has none
    fn assert_consistent(registry: &ContextRegistry) {
        for (id, ctx) in &registry.contexts {
            if let Some(s) = ctx.session {
                assert_eq!(registry.lookup_by_session(s), Some(*id));
            }
            if let Some(s) = ctx.stream {
                assert_eq!(registry.lookup_by_stream(s), Some(*id));
            }
            if let Some(g) = ctx.group {
                assert_eq!(registry.lookup_by_group(g), Some(*id));
            }
        }

        let sessions = registry.contexts.values().filter(|c| c.session.is_some()).count();
        let streams = registry.contexts.values().filter(|c| c.stream.is_some()).count();
        let groups = registry.contexts.values().filter(|c| c.group.is_some()).count();
        assert_eq!(registry.by_session.len(), sessions);
        assert_eq!(registry.by_stream.len(), streams);
        assert_eq!(registry.by_group.len(), groups);
        assert!(registry.by_name.values().all(|id| registry.contexts.contains_key(id)));
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ContextRegistry::new();

        let id = registry.register(context("cam1")).unwrap();
        assert_eq!(registry.lookup_by_stream_name("cam1"), Some(id));
        assert_eq!(registry.len(), 1);

        registry.set_session(id, Some(SessionHandle(7))).unwrap();
        registry.set_group(id, Some(GroupHandle(8))).unwrap();
        registry.set_stream(id, Some(StreamHandle(9))).unwrap();

        assert_eq!(registry.lookup_by_session(SessionHandle(7)), Some(id));
        assert_eq!(registry.lookup_by_group(GroupHandle(8)), Some(id));
        assert_eq!(registry.lookup_by_stream(StreamHandle(9)), Some(id));
        assert_consistent(&registry);
    }

    #[test]
    fn test_register_with_handles_preset() {
        let mut registry = ContextRegistry::new();
        let mut ctx = context("cam1");
        ctx.session = Some(SessionHandle(1));

        let id = registry.register(ctx).unwrap();
        assert_eq!(registry.lookup_by_session(SessionHandle(1)), Some(id));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ContextRegistry::new();
        let first = registry.register(context("cam1")).unwrap();

        let result = registry.register(context("cam1"));
        assert_eq!(
            result,
            Err(RegistryError::StreamNameInUse {
                name: "cam1".into(),
                owner: first,
            })
        );
    }

    #[test]
    fn test_unindex_name_keeps_handles() {
        let mut registry = ContextRegistry::new();
        let old = registry.register(context("cam1")).unwrap();
        registry.set_session(old, Some(SessionHandle(1))).unwrap();

        registry.unindex_stream_name(old);
        assert_eq!(registry.lookup_by_stream_name("cam1"), None);
        assert_eq!(registry.lookup_by_session(SessionHandle(1)), Some(old));

        // The name is free for a replacement
        let new = registry.register(context("cam1")).unwrap();
        assert_eq!(registry.lookup_by_stream_name("cam1"), Some(new));

        // Unregistering the old context must not touch the new name entry
        registry.unregister(old);
        assert_eq!(registry.lookup_by_stream_name("cam1"), Some(new));
        assert_eq!(registry.lookup_by_session(SessionHandle(1)), None);
    }

    #[test]
    fn test_reindex_is_idempotent() {
        let mut registry = ContextRegistry::new();
        let id = registry.register(context("cam1")).unwrap();
        registry.get_mut(id).unwrap().stream = Some(StreamHandle(3));

        registry.reindex(id).unwrap();
        registry.reindex(id).unwrap();

        assert_eq!(registry.by_stream.len(), 1);
        assert_consistent(&registry);
    }

    #[test]
    fn test_cleared_handle_unindexed() {
        let mut registry = ContextRegistry::new();
        let id = registry.register(context("cam1")).unwrap();
        registry.set_group(id, Some(GroupHandle(2))).unwrap();

        registry.set_group(id, None).unwrap();
        assert_eq!(registry.lookup_by_group(GroupHandle(2)), None);
        assert_consistent(&registry);
    }

    #[test]
    fn test_unregister_twice() {
        let mut registry = ContextRegistry::new();
        let id = registry.register(context("cam1")).unwrap();
        registry.set_session(id, Some(SessionHandle(1))).unwrap();

        let ctx = registry.unregister(id).unwrap();
        assert!(!ctx.holds_handles());
        assert!(registry.unregister(id).is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.lookup_by_session(SessionHandle(1)), None);
        assert_eq!(registry.reindex(id), Err(RegistryError::ContextNotFound(id)));
    }

    #[test]
    fn test_contexts_for_client() {
        let mut registry = ContextRegistry::new();
        let a = registry.register(context("a")).unwrap();
        let b = registry.register(context("b")).unwrap();
        let mut other = context("c");
        other.client.id = 2;
        registry.register(other).unwrap();

        assert_eq!(registry.contexts_for_client(1), vec![a, b]);
        assert_eq!(registry.live_contexts().len(), 3);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Register(u8),
        SetSession(u8, Option<u64>),
        SetStream(u8, Option<u64>),
        SetGroup(u8, Option<u64>),
        UnindexName(u8),
        Unregister(u8),
    }

    fn any_op() -> impl Strategy<Value = Op> {
        let handle = || proptest::option::of(0u64..6);
        prop_oneof![
            (0u8..4).prop_map(Op::Register),
            (0u8..4, handle()).prop_map(|(s, h)| Op::SetSession(s, h)),
            (0u8..4, handle()).prop_map(|(s, h)| Op::SetStream(s, h)),
            (0u8..4, handle()).prop_map(|(s, h)| Op::SetGroup(s, h)),
            (0u8..4).prop_map(Op::UnindexName),
            (0u8..4).prop_map(Op::Unregister),
        ]
    }

    proptest! {
        #[test]
        fn prop_indexes_track_handles(ops in proptest::collection::vec(any_op(), 0..60)) {
            let mut registry = ContextRegistry::new();
            let mut slots: Vec<Option<ContextId>> = vec![None; 4];
            let mut next_handle = 100u64;

            for op in ops {
                // Handles are unique per transport; map the generated values to
                // fresh ones so two contexts never share a handle.
                let mut fresh = |h: Option<u64>| {
                    h.map(|_| {
                        next_handle += 1;
                        next_handle
                    })
                };

                match op {
                    Op::Register(slot) => {
                        let name = format!("s{}", slot);
                        if let Ok(id) = registry.register(context(&name)) {
                            slots[slot as usize] = Some(id);
                        }
                    }
                    Op::SetSession(slot, h) => {
                        if let Some(id) = slots[slot as usize] {
                            let _ = registry.set_session(id, fresh(h).map(SessionHandle));
                        }
                    }
                    Op::SetStream(slot, h) => {
                        if let Some(id) = slots[slot as usize] {
                            let _ = registry.set_stream(id, fresh(h).map(StreamHandle));
                        }
                    }
                    Op::SetGroup(slot, h) => {
                        if let Some(id) = slots[slot as usize] {
                            let _ = registry.set_group(id, fresh(h).map(GroupHandle));
                        }
                    }
                    Op::UnindexName(slot) => {
                        if let Some(id) = slots[slot as usize] {
                            registry.unindex_stream_name(id);
                        }
                    }
                    Op::Unregister(slot) => {
                        if let Some(id) = slots[slot as usize].take() {
                            registry.unregister(id);
                        }
                    }
                }

                assert_consistent(&registry);
            }
        }
    }
}
