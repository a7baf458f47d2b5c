use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use log::warn;

use wraith_shared::{
    diff_states, overlay_masked, replicates_statically, should_send_field, wrapping_diff,
    write_update, ApprovalResponseMessage, BitReader, BitWriter, CapacityError, ChangeMask,
    ClientHandshakeMessage, DisconnectMessage, DisconnectReason, FieldPath, GhostActionTag,
    GhostGroupError, GhostGroupId, GhostGroupManager, GhostId, GhostState, GhostType, GhostTypeId,
    KeyGenerator, NetworkId, PacketReceiver, PacketSender, PacketType, PredictionMode, SchemaError,
    SchemaRegistry, SendContext, Serde, ServerAcceptMessage, SpawnPrefix, Tick, VersionMismatch,
};

use crate::{
    connection::{
        connection::{Connection, ConnectionState},
        ghost_channel::{GhostChannel, GhostChannelStatus},
    },
    error::WraithServerError,
    events::{Events, LifecycleEvent},
    server_config::ServerConfig,
    user::{User, UserKey},
};

struct Io {
    sender: Box<dyn PacketSender>,
    receiver: Box<dyn PacketReceiver>,
}

struct GhostRecord {
    type_id: GhostTypeId,
    current: GhostState,
    owner: Option<UserKey>,
}

/// The authoritative peer. The host drives it with `receive()` then
/// world mutation then `send_all_updates()`, once per tick, from a single
/// thread; the protocol never blocks inside either call.
pub struct Server {
    config: ServerConfig,
    registry: SchemaRegistry,
    io: Option<Io>,
    current_tick: Tick,
    next_user_key: u64,
    users: HashMap<UserKey, Connection>,
    address_index: HashMap<SocketAddr, UserKey>,
    /// unique id -> the NetworkId it was last assigned. Never pruned, so a
    /// reconnect at any later time resumes the same NetworkId.
    identities: HashMap<u64, NetworkId>,
    ghost_keys: KeyGenerator,
    ghosts: HashMap<GhostId, GhostRecord>,
    /// Despawned ghosts whose ids cannot be recycled until every listed
    /// connection has acked the despawn action.
    despawning: HashMap<GhostId, HashSet<UserKey>>,
    groups: GhostGroupManager,
    /// Errors raised during `send_all_updates`, surfaced by the next
    /// `receive()` call.
    pending_capacity: Vec<(UserKey, CapacityError)>,
    pending_errors: Vec<WraithServerError>,
}

impl Server {
    pub fn new(config: ServerConfig, registry: SchemaRegistry) -> Self {
        Self {
            config,
            registry,
            io: None,
            current_tick: 0,
            next_user_key: 0,
            users: HashMap::new(),
            address_index: HashMap::new(),
            identities: HashMap::new(),
            ghost_keys: KeyGenerator::new(),
            ghosts: HashMap::new(),
            despawning: HashMap::new(),
            groups: GhostGroupManager::new(),
            pending_capacity: Vec::new(),
            pending_errors: Vec::new(),
        }
    }

    pub fn listen(&mut self, sender: Box<dyn PacketSender>, receiver: Box<dyn PacketReceiver>) {
        self.io = Some(Io { sender, receiver });
    }

    pub fn is_listening(&self) -> bool {
        self.io.is_some()
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    // Connections

    /// Drains the transport, advances every connection's state machine, and
    /// returns the events. Emits at most one lifecycle event per connection
    /// per call.
    pub fn receive(&mut self) -> Events {
        let mut events = Events::new();
        for (user_key, error) in self.pending_capacity.drain(..) {
            events.push_capacity_drop(user_key, error);
        }
        for error in self.pending_errors.drain(..) {
            events.push_error(error);
        }

        if self.io.is_none() {
            return events;
        }

        loop {
            let result = match &mut self.io {
                Some(io) => io.receiver.receive(),
                None => break,
            };
            match result {
                Ok(Some((address, payload))) => {
                    self.process_packet(address, &payload, &mut events);
                }
                Ok(None) => break,
                Err(error) => {
                    events.push_error(error.into());
                    break;
                }
            }
        }

        self.check_timeouts();
        self.drain_lifecycle(&mut events);
        events
    }

    /// Lets an Approval-state connection through. The client receives
    /// ServerAccept with its (possibly resumed) NetworkId.
    pub fn accept_connection(&mut self, user_key: &UserKey) {
        let Some(conn) = self.users.get(user_key) else {
            return;
        };
        if conn.state != ConnectionState::Approval {
            return;
        }
        self.finalize_accept(*user_key);
    }

    pub fn reject_connection(&mut self, user_key: &UserKey) {
        let Some(conn) = self.users.get_mut(user_key) else {
            return;
        };
        if conn.state != ConnectionState::Approval {
            return;
        }
        let address = conn.address;
        conn.disconnect(DisconnectReason::ApprovalDenied);
        self.send_disconnect(address, DisconnectReason::ApprovalDenied);
    }

    pub fn disconnect_user(&mut self, user_key: &UserKey) {
        let Some(conn) = self.users.get_mut(user_key) else {
            return;
        };
        let address = conn.address;
        conn.disconnect(DisconnectReason::ConnectionClose);
        self.send_disconnect(address, DisconnectReason::ConnectionClose);
    }

    pub fn user(&self, user_key: &UserKey) -> Option<User> {
        let conn = self.users.get(user_key)?;
        Some(User {
            address: conn.address,
            network_id: conn.network_id?,
            reconnected: conn.reconnected,
        })
    }

    pub fn user_keys(&self) -> Vec<UserKey> {
        self.users
            .iter()
            .filter(|(_, conn)| conn.is_connected())
            .map(|(key, _)| *key)
            .collect()
    }

    // Ghosts

    pub fn spawn_ghost(
        &mut self,
        type_id: GhostTypeId,
        state: GhostState,
    ) -> Result<GhostId, WraithServerError> {
        let ghost_type = self.registry.ghost_type(type_id)?;
        if !ghost_type.state_matches(&state) {
            return Err(SchemaError::ValueShapeMismatch {
                field: ghost_type.name(),
            }
            .into());
        }
        let ghost_id = self
            .ghost_keys
            .generate()
            .ok_or(WraithServerError::GhostIdsExhausted)?;
        self.ghosts.insert(
            ghost_id,
            GhostRecord {
                type_id,
                current: state,
                owner: None,
            },
        );
        Ok(ghost_id)
    }

    /// Replaces a ghost's authoritative state. Shape-checked against the
    /// schema; deltas are computed at send time.
    pub fn update_ghost(
        &mut self,
        ghost_id: GhostId,
        state: GhostState,
    ) -> Result<(), WraithServerError> {
        let record = self
            .ghosts
            .get_mut(&ghost_id)
            .ok_or(WraithServerError::UnknownGhost)?;
        let ghost_type = self.registry.ghost_type(record.type_id)?;
        if !ghost_type.state_matches(&state) {
            return Err(SchemaError::ValueShapeMismatch {
                field: ghost_type.name(),
            }
            .into());
        }
        record.current = state;
        Ok(())
    }

    pub fn ghost_state(&self, ghost_id: GhostId) -> Option<&GhostState> {
        self.ghosts.get(&ghost_id).map(|record| &record.current)
    }

    /// Removes a ghost. Its id is recycled only after every connection that
    /// ever saw it acks the despawn action.
    pub fn despawn_ghost(&mut self, ghost_id: GhostId) -> Result<(), WraithServerError> {
        if self.ghosts.remove(&ghost_id).is_none() {
            return Err(WraithServerError::UnknownGhost);
        }
        self.groups.remove_from_all(ghost_id);

        let holders: HashSet<UserKey> = self
            .users
            .iter()
            .filter(|(_, conn)| conn.channels.contains_key(&ghost_id))
            .map(|(key, _)| *key)
            .collect();
        if holders.is_empty() {
            self.ghost_keys.recycle(ghost_id);
        } else {
            self.despawning.insert(ghost_id, holders);
        }
        Ok(())
    }

    /// Assigns or clears a ghost's owning connection. Every connection that
    /// already holds the ghost is re-spawned in full, because the filter's
    /// owner rules change which fields it may see.
    pub fn set_owner(
        &mut self,
        ghost_id: GhostId,
        owner: Option<UserKey>,
    ) -> Result<(), WraithServerError> {
        let record = self
            .ghosts
            .get_mut(&ghost_id)
            .ok_or(WraithServerError::UnknownGhost)?;
        if record.owner == owner {
            return Ok(());
        }
        record.owner = owner;
        for conn in self.users.values_mut() {
            conn.reset_ghost(ghost_id);
        }
        Ok(())
    }

    pub fn owner_of(&self, ghost_id: GhostId) -> Option<UserKey> {
        self.ghosts.get(&ghost_id).and_then(|record| record.owner)
    }

    pub fn set_prediction(
        &mut self,
        user_key: &UserKey,
        ghost_id: GhostId,
        mode: PredictionMode,
    ) -> Result<(), WraithServerError> {
        let conn = self
            .users
            .get_mut(user_key)
            .ok_or(WraithServerError::UnknownUser(*user_key))?;
        // prediction affects field relevancy, so delta state resets too
        if conn.prediction_of(ghost_id) != mode {
            conn.set_prediction(ghost_id, mode);
            conn.reset_ghost(ghost_id);
        }
        Ok(())
    }

    // Scope

    pub fn scope_include(
        &mut self,
        user_key: &UserKey,
        ghost_id: GhostId,
    ) -> Result<(), WraithServerError> {
        let conn = self
            .users
            .get_mut(user_key)
            .ok_or(WraithServerError::UnknownUser(*user_key))?;
        conn.scope.insert(ghost_id);
        Ok(())
    }

    pub fn scope_exclude(
        &mut self,
        user_key: &UserKey,
        ghost_id: GhostId,
    ) -> Result<(), WraithServerError> {
        let conn = self
            .users
            .get_mut(user_key)
            .ok_or(WraithServerError::UnknownUser(*user_key))?;
        conn.scope.remove(&ghost_id);
        Ok(())
    }

    // Groups

    pub fn create_group(&mut self) -> GhostGroupId {
        self.groups.create_group()
    }

    pub fn destroy_group(&mut self, group: GhostGroupId) -> Result<(), GhostGroupError> {
        self.groups.destroy_group(group)
    }

    pub fn add_group_member(
        &mut self,
        group: GhostGroupId,
        ghost_id: GhostId,
    ) -> Result<(), GhostGroupError> {
        self.groups.add_member(group, ghost_id)
    }

    pub fn remove_group_member(
        &mut self,
        group: GhostGroupId,
        ghost_id: GhostId,
    ) -> Result<(), GhostGroupError> {
        self.groups.remove_member(group, ghost_id)
    }

    pub fn group_members(&self, group: GhostGroupId) -> Result<&[GhostId], GhostGroupError> {
        Ok(self.groups.group(group)?.members())
    }

    /// Puts every member of a group into a user's scope in one call.
    pub fn scope_include_group(
        &mut self,
        user_key: &UserKey,
        group: GhostGroupId,
    ) -> Result<(), WraithServerError> {
        let members: Vec<GhostId> = self
            .groups
            .group(group)
            .map_err(|e| WraithServerError::Ghost(e.into()))?
            .members()
            .to_vec();
        let conn = self
            .users
            .get_mut(user_key)
            .ok_or(WraithServerError::UnknownUser(*user_key))?;
        for ghost_id in members {
            conn.scope.insert(ghost_id);
        }
        Ok(())
    }

    // Outgoing

    /// Advances the server tick and sends one Data packet to each connected
    /// client. Every ghost's sent state lands in that connection's history
    /// ring, so later deltas baseline on what the client actually holds.
    /// The Data packet doubles as the server's heartbeat.
    pub fn send_all_updates(&mut self) {
        if self.io.is_none() {
            return;
        }
        self.current_tick = self.current_tick.wrapping_add(1);
        let tick = self.current_tick;

        let user_keys: Vec<UserKey> = self.users.keys().copied().collect();
        for user_key in user_keys {
            if let Err(error) = self.send_connection_updates(user_key, tick) {
                self.pending_errors.push(error);
            }
        }
    }

    fn send_connection_updates(
        &mut self,
        user_key: UserKey,
        tick: Tick,
    ) -> Result<(), WraithServerError> {
        let Some(conn) = self.users.get_mut(&user_key) else {
            return Ok(());
        };
        if !conn.is_connected() {
            return Ok(());
        }

        let mut writer = BitWriter::new();
        PacketType::Data.ser(&mut writer);
        tick.ser(&mut writer);

        let history_capacity = self.config.history_capacity;
        let mut scoped: Vec<GhostId> = conn.scope.iter().copied().collect();
        scoped.sort();
        for ghost_id in scoped {
            let Some(record) = self.ghosts.get(&ghost_id) else {
                continue; // despawned; handled below
            };
            let ghost_type = self.registry.ghost_type(record.type_id)?;
            let ctx = SendContext {
                is_owner: record.owner == Some(user_key),
                prediction: conn.prediction_of(ghost_id),
            };

            let status = conn.channels.get(&ghost_id).map(|channel| channel.status);
            let spawning = match status {
                None | Some(GhostChannelStatus::Despawning) => {
                    conn.channels
                        .insert(ghost_id, GhostChannel::spawning(tick, history_capacity));
                    true
                }
                Some(GhostChannelStatus::Spawning) => true,
                Some(GhostChannelStatus::Spawned) => false,
            };

            if spawning {
                GhostActionTag::Spawn.ser(&mut writer);
                SpawnPrefix {
                    ghost_id,
                    type_id: record.type_id,
                }
                .ser(&mut writer);
                let mask = full_mask(ghost_type.mask_bit_count());
                let sent =
                    write_update(ghost_type, &record.current, None, &mask, &ctx, &mut writer)?;
                let applied = overlay_masked(
                    ghost_type,
                    &ghost_type.default_state(),
                    &record.current,
                    &sent.mask,
                );
                for error in sent.capacity_errors {
                    self.pending_capacity.push((user_key, error));
                }
                if let Some(channel) = conn.channels.get_mut(&ghost_id) {
                    if let Err(error) = channel.history.insert(tick, applied, sent.mask) {
                        self.pending_errors.push(WraithServerError::Ghost(error.into()));
                    }
                }
                continue;
            }

            let acked = conn.last_acked;
            let Some(channel) = conn.channels.get_mut(&ghost_id) else {
                continue;
            };

            // a static ghost goes quiet while nothing sendable has changed;
            // its ring sees no per-tick entries, so a later change rebases
            // onto a full update
            if replicates_statically(ghost_type, self.groups.is_member(ghost_id)) {
                let unchanged = channel
                    .history
                    .newest_tick()
                    .and_then(|newest| channel.history.get(newest))
                    .is_some_and(|entry| {
                        sendable_diff(ghost_type, &record.current, &entry.state, &ctx).is_clear()
                    });
                if unchanged {
                    continue;
                }
            }

            let baseline = acked
                .and_then(|acked_tick| channel.history.get(acked_tick))
                .map(|entry| (entry.tick, entry.state.clone()));
            match baseline {
                Some((baseline_tick, baseline_state)) => {
                    let mask = sendable_diff(ghost_type, &record.current, &baseline_state, &ctx);
                    if mask.is_clear() {
                        // carry the baseline forward so this tick can serve
                        // as one once the client acks it
                        if let Err(error) = channel.history.insert(tick, baseline_state, mask) {
                            self.pending_errors.push(WraithServerError::Ghost(error.into()));
                        }
                        continue;
                    }
                    GhostActionTag::Update.ser(&mut writer);
                    ghost_id.ser(&mut writer);
                    let sent = write_update(
                        ghost_type,
                        &record.current,
                        Some((baseline_tick, &baseline_state)),
                        &mask,
                        &ctx,
                        &mut writer,
                    )?;
                    let applied =
                        overlay_masked(ghost_type, &baseline_state, &record.current, &sent.mask);
                    for error in sent.capacity_errors {
                        self.pending_capacity.push((user_key, error));
                    }
                    if let Err(error) = channel.history.insert(tick, applied, sent.mask) {
                        self.pending_errors.push(WraithServerError::Ghost(error.into()));
                    }
                }
                None => {
                    // acked baseline evicted from the ring; full resend
                    GhostActionTag::Update.ser(&mut writer);
                    ghost_id.ser(&mut writer);
                    let mask = full_mask(ghost_type.mask_bit_count());
                    let sent =
                        write_update(ghost_type, &record.current, None, &mask, &ctx, &mut writer)?;
                    let applied = overlay_masked(
                        ghost_type,
                        &ghost_type.default_state(),
                        &record.current,
                        &sent.mask,
                    );
                    for error in sent.capacity_errors {
                        self.pending_capacity.push((user_key, error));
                    }
                    if let Err(error) = channel.history.insert(tick, applied, sent.mask) {
                        self.pending_errors.push(WraithServerError::Ghost(error.into()));
                    }
                }
            }
        }

        // despawn actions for channels whose ghost left scope or the world
        let mut stale: Vec<GhostId> = conn
            .channels
            .keys()
            .filter(|ghost_id| {
                !self.ghosts.contains_key(ghost_id) || !conn.scope.contains(ghost_id)
            })
            .copied()
            .collect();
        stale.sort();
        for ghost_id in stale {
            if let Some(channel) = conn.channels.get_mut(&ghost_id) {
                if channel.status != GhostChannelStatus::Despawning {
                    channel.status = GhostChannelStatus::Despawning;
                    channel.status_tick = tick;
                }
            }
            GhostActionTag::Despawn.ser(&mut writer);
            ghost_id.ser(&mut writer);
        }

        GhostActionTag::End.ser(&mut writer);

        let address = conn.address;
        if let Some(io) = &self.io {
            io.sender.send(&address, &writer.to_bytes())?;
        }
        Ok(())
    }

    // Incoming

    fn process_packet(&mut self, address: SocketAddr, payload: &[u8], events: &mut Events) {
        let mut reader = BitReader::new(payload);
        let Ok(packet_type) = PacketType::de(&mut reader) else {
            warn!("Dropping malformed packet from {}", address);
            return;
        };

        match packet_type {
            PacketType::ClientHandshake => self.receive_handshake(address, &mut reader),
            PacketType::ApprovalResponse => self.receive_approval_response(address, &mut reader),
            PacketType::Ack => self.receive_ack(address, &mut reader),
            PacketType::Nack => self.receive_nack(address, &mut reader, events),
            PacketType::Heartbeat => self.touch(address),
            PacketType::Disconnect => self.receive_disconnect(address),
            PacketType::Data
            | PacketType::VersionReject
            | PacketType::ApprovalRequest
            | PacketType::ServerAccept => {
                warn!(
                    "Dropping unexpected {:?} packet from {}",
                    packet_type, address
                );
            }
        }
    }

    fn receive_handshake(&mut self, address: SocketAddr, reader: &mut BitReader) {
        let Ok(message) = ClientHandshakeMessage::de(reader) else {
            warn!("Dropping malformed handshake from {}", address);
            return;
        };

        if let Some(user_key) = self.address_index.get(&address).copied() {
            // handshake resend; answer according to where the connection is
            let tick = self.current_tick;
            let state = match self.users.get_mut(&user_key) {
                Some(conn) => {
                    conn.last_heard = tick;
                    conn.state
                }
                None => return,
            };
            match state {
                ConnectionState::Handshake => self.send_approval_request(address),
                ConnectionState::Connected => self.resend_accept(user_key),
                ConnectionState::Approval | ConnectionState::Disconnected(_) => {}
            }
            return;
        }

        // version validation gates connection creation entirely
        let local = self.registry.version_payload();
        if let Err(mismatch) = VersionMismatch::validate(&local.info, &message.version.info) {
            warn!("Rejecting connection from {}: {}", address, mismatch);
            if mismatch.component_schema_hash.is_some() {
                wraith_shared::log_collection_mismatch(
                    "Component",
                    &local.component_items,
                    &message.version.component_items,
                );
            }
            if mismatch.rpc_schema_hash.is_some() {
                wraith_shared::log_collection_mismatch(
                    "RPC",
                    &local.rpc_items,
                    &message.version.rpc_items,
                );
            }
            let mut writer = BitWriter::new();
            PacketType::VersionReject.ser(&mut writer);
            local.ser(&mut writer);
            self.send_to(address, writer);
            return;
        }

        let user_key = UserKey::from_u64(self.next_user_key);
        self.next_user_key += 1;
        let conn = Connection::new(address, user_key, message.unique_id, self.current_tick);
        self.users.insert(user_key, conn);
        self.address_index.insert(address, user_key);

        if self.config.require_approval {
            self.send_approval_request(address);
        } else {
            self.finalize_accept(user_key);
        }
    }

    fn receive_approval_response(&mut self, address: SocketAddr, reader: &mut BitReader) {
        let Ok(message) = ApprovalResponseMessage::de(reader) else {
            warn!("Dropping malformed approval response from {}", address);
            return;
        };
        let Some(user_key) = self.address_index.get(&address).copied() else {
            return;
        };
        let tick = self.current_tick;
        let Some(conn) = self.users.get_mut(&user_key) else {
            return;
        };
        conn.last_heard = tick;
        match conn.state {
            ConnectionState::Handshake => {
                conn.state = ConnectionState::Approval;
                conn.approval_started = tick;
                conn.lifecycle
                    .push(LifecycleEvent::Approval(message.payload));
            }
            ConnectionState::Connected => self.resend_accept(user_key),
            // already surfaced; the application decides once
            ConnectionState::Approval | ConnectionState::Disconnected(_) => {}
        }
    }

    fn receive_ack(&mut self, address: SocketAddr, reader: &mut BitReader) {
        let Ok(tick) = Tick::de(reader) else {
            return;
        };
        let Some(user_key) = self.address_index.get(&address).copied() else {
            return;
        };
        let Some(conn) = self.users.get_mut(&user_key) else {
            return;
        };
        if !conn.is_connected() {
            return;
        }
        conn.last_heard = self.current_tick;
        let confirmed = conn.process_ack(tick);
        for ghost_id in confirmed {
            self.confirm_despawn(ghost_id, user_key);
        }
    }

    fn receive_nack(&mut self, address: SocketAddr, reader: &mut BitReader, events: &mut Events) {
        let Ok(tick) = Tick::de(reader) else {
            return;
        };
        let Some(user_key) = self.address_index.get(&address).copied() else {
            return;
        };
        let Some(conn) = self.users.get_mut(&user_key) else {
            return;
        };
        if !conn.is_connected() {
            return;
        }
        conn.last_heard = self.current_tick;
        conn.process_nack();
        events.push_nack(user_key, tick);
    }

    fn receive_disconnect(&mut self, address: SocketAddr) {
        let Some(user_key) = self.address_index.get(&address).copied() else {
            return;
        };
        if let Some(conn) = self.users.get_mut(&user_key) {
            conn.disconnect(DisconnectReason::ClosedByRemote);
        }
    }

    fn touch(&mut self, address: SocketAddr) {
        if let Some(user_key) = self.address_index.get(&address) {
            if let Some(conn) = self.users.get_mut(user_key) {
                conn.last_heard = self.current_tick;
            }
        }
    }

    // Internals

    fn finalize_accept(&mut self, user_key: UserKey) {
        let unique_id = match self.users.get(&user_key) {
            Some(conn) => conn.unique_id,
            None => return,
        };

        let identity_live_elsewhere = self.users.iter().any(|(key, other)| {
            *key != user_key && other.unique_id == unique_id && !other.is_disconnected()
        });

        let existing = self.identities.get(&unique_id).copied();
        let (network_id, reconnected) = match existing {
            // a second live session under the same unique id is a new
            // lineage, never a resume of the one still running
            Some(_) if identity_live_elsewhere => (self.mint_network_id(), false),
            Some(existing) => (existing, true),
            None => (self.mint_network_id(), false),
        };
        self.identities.insert(unique_id, network_id);

        let Some(conn) = self.users.get_mut(&user_key) else {
            return;
        };
        conn.network_id = Some(network_id);
        conn.reconnected = reconnected;
        conn.state = ConnectionState::Connected;
        conn.lifecycle.push(LifecycleEvent::Connect);
        self.resend_accept(user_key);
    }

    fn resend_accept(&mut self, user_key: UserKey) {
        let (address, network_id, reconnected) = match self.users.get(&user_key) {
            Some(conn) => match conn.network_id {
                Some(network_id) => (conn.address, network_id, conn.reconnected),
                None => return,
            },
            None => return,
        };
        let mut writer = BitWriter::new();
        PacketType::ServerAccept.ser(&mut writer);
        ServerAcceptMessage {
            network_id,
            reconnected,
        }
        .ser(&mut writer);
        self.send_to(address, writer);
    }

    fn send_approval_request(&mut self, address: SocketAddr) {
        let mut writer = BitWriter::new();
        PacketType::ApprovalRequest.ser(&mut writer);
        self.send_to(address, writer);
    }

    fn send_disconnect(&mut self, address: SocketAddr, reason: DisconnectReason) {
        let mut writer = BitWriter::new();
        PacketType::Disconnect.ser(&mut writer);
        DisconnectMessage { reason }.ser(&mut writer);
        self.send_to(address, writer);
    }

    fn send_to(&mut self, address: SocketAddr, writer: BitWriter) {
        if let Some(io) = &self.io {
            if io.sender.send(&address, &writer.to_bytes()).is_err() {
                self.pending_errors
                    .push(WraithServerError::Send(wraith_shared::SendError));
            }
        }
    }

    fn mint_network_id(&mut self) -> NetworkId {
        loop {
            let candidate = NetworkId::new(fastrand::u32(..));
            if !self.identities.values().any(|id| *id == candidate) {
                return candidate;
            }
        }
    }

    fn confirm_despawn(&mut self, ghost_id: GhostId, user_key: UserKey) {
        let Some(holders) = self.despawning.get_mut(&ghost_id) else {
            return;
        };
        holders.remove(&user_key);
        if holders.is_empty() {
            self.despawning.remove(&ghost_id);
            self.ghost_keys.recycle(ghost_id);
        }
    }

    fn check_timeouts(&mut self) {
        let tick = self.current_tick;
        let approval_timeout = self.config.approval_timeout_ticks;
        let connection_timeout = self.config.connection_timeout_ticks;

        let mut timed_out: Vec<(SocketAddr, DisconnectReason)> = Vec::new();
        for conn in self.users.values_mut() {
            if conn.is_disconnected() {
                continue;
            }
            if conn.state == ConnectionState::Approval {
                let waited = wrapping_diff(conn.approval_started, tick);
                if waited > 0 && waited as u16 > approval_timeout {
                    conn.disconnect(DisconnectReason::ApprovalTimeout);
                    timed_out.push((conn.address, DisconnectReason::ApprovalTimeout));
                    continue;
                }
            }
            let silent = wrapping_diff(conn.last_heard, tick);
            if silent > 0 && silent as u16 > connection_timeout {
                conn.disconnect(DisconnectReason::Timeout);
            }
        }
        for (address, reason) in timed_out {
            self.send_disconnect(address, reason);
        }
    }

    fn drain_lifecycle(&mut self, events: &mut Events) {
        let user_keys: Vec<UserKey> = self.users.keys().copied().collect();
        for user_key in user_keys {
            let Some(conn) = self.users.get_mut(&user_key) else {
                continue;
            };
            let Some(event) = conn.lifecycle.pop() else {
                continue;
            };
            let finished = matches!(event, LifecycleEvent::Disconnect(_)) && conn.lifecycle.is_empty();
            events.push_lifecycle(user_key, event);
            if finished {
                self.remove_user(user_key);
            }
        }
    }

    /// Final teardown, after the Disconnect event has been delivered.
    fn remove_user(&mut self, user_key: UserKey) {
        let Some(conn) = self.users.remove(&user_key) else {
            return;
        };
        self.address_index.remove(&conn.address);

        // a gone connection can no longer confirm despawns
        let held: Vec<GhostId> = self.despawning.keys().copied().collect();
        for ghost_id in held {
            self.confirm_despawn(ghost_id, user_key);
        }

        for record in self.ghosts.values_mut() {
            if record.owner == Some(user_key) {
                record.owner = None;
            }
        }
    }
}

fn full_mask(bit_count: usize) -> ChangeMask {
    let mut mask = ChangeMask::new(bit_count);
    for bit in 0..bit_count {
        mask.set_bit(bit, true);
    }
    mask
}

/// A diff mask narrowed to the fields this connection may actually receive.
/// Keeps filtered fields from holding a connection hot forever: their bits
/// would otherwise stay set on every tick.
fn sendable_diff(
    ghost_type: &GhostType,
    current: &GhostState,
    baseline: &GhostState,
    ctx: &SendContext,
) -> ChangeMask {
    let mut mask = diff_states(ghost_type, current, baseline);
    for bit in 0..mask.bit_count() {
        if mask.bit(bit) != Some(true) {
            continue;
        }
        let sendable = match ghost_type.descriptor_at(bit) {
            Some((descriptor, path)) => {
                should_send_field(descriptor, matches!(path, FieldPath::Root(_)), ctx)
            }
            None => false,
        };
        if !sendable {
            mask.set_bit(bit, false);
        }
    }
    mask
}
