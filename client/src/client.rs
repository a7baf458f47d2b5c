use std::collections::HashMap;
use std::net::SocketAddr;

use log::{debug, warn};

use wraith_shared::{
    log_collection_mismatch, read_snapshot, read_update_header, sequence_greater_than,
    skip_update_payload, ApprovalResponseMessage, BitReader, BitWriter, ChangeMask,
    ClientHandshakeMessage, DisconnectMessage, DisconnectReason, GhostActionTag, GhostId,
    GhostState, GhostTypeId, NetworkId, PacketReceiver, PacketSender, PacketType, SchemaRegistry,
    Serde, SerdeErr, ServerAcceptMessage, SnapshotHistory, SpawnPrefix, Tick, VersionMismatch,
    VersionPayload,
};

use crate::{
    client_config::ClientConfig, error::WraithClientError, events::Events,
};

struct Io {
    sender: Box<dyn PacketSender>,
    receiver: Box<dyn PacketReceiver>,
}

/// Client-side connection state machine. Disconnected is terminal for the
/// session; a fresh `connect()` starts a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClientState {
    Disconnected,
    /// ClientHandshake sent, awaiting the server's verdict.
    Handshake,
    /// ApprovalRequest received; approval payload sent, awaiting accept.
    Approval,
    Connected,
}

/// One replicated ghost as this client sees it.
struct ClientGhost {
    type_id: GhostTypeId,
    state: GhostState,
    /// Ring of states this client actually applied and acked, by tick.
    /// Server deltas are always diffed against one of these.
    history: SnapshotHistory,
}

/// The replica peer. The host drives it with `receive()` then `send()`,
/// once per tick, from a single thread.
pub struct Client {
    config: ClientConfig,
    registry: SchemaRegistry,
    io: Option<Io>,
    server_address: Option<SocketAddr>,
    unique_id: u64,
    approval_payload: Vec<u8>,
    state: ClientState,
    network_id: Option<NetworkId>,
    reconnected: bool,
    ticks_since_heard: u16,
    ticks_since_send: u16,
    ghosts: HashMap<GhostId, ClientGhost>,
    /// Newest data tick fully or partially applied. Older ticks are stale
    /// and dropped outright.
    last_applied: Option<Tick>,
    /// Set when the timeout fires inside `send()`; surfaced by the next
    /// `receive()`.
    pending_disconnect: Option<DisconnectReason>,
}

impl Client {
    pub fn new(config: ClientConfig, registry: SchemaRegistry) -> Self {
        Self {
            config,
            registry,
            io: None,
            server_address: None,
            unique_id: 0,
            approval_payload: Vec::new(),
            state: ClientState::Disconnected,
            network_id: None,
            reconnected: false,
            ticks_since_heard: 0,
            ticks_since_send: 0,
            ghosts: HashMap::new(),
            last_applied: None,
            pending_disconnect: None,
        }
    }

    /// Starts connecting. `unique_id` identifies this client across
    /// sessions; reconnecting with the same id resumes the same NetworkId.
    /// The approval payload is handed to the server application verbatim.
    pub fn connect(
        &mut self,
        server_address: SocketAddr,
        unique_id: u64,
        approval_payload: Vec<u8>,
        sender: Box<dyn PacketSender>,
        receiver: Box<dyn PacketReceiver>,
    ) {
        self.io = Some(Io { sender, receiver });
        self.server_address = Some(server_address);
        self.unique_id = unique_id;
        self.approval_payload = approval_payload;
        self.state = ClientState::Handshake;
        self.network_id = None;
        self.reconnected = false;
        self.ticks_since_heard = 0;
        self.ticks_since_send = 0;
        self.ghosts.clear();
        self.last_applied = None;
        self.pending_disconnect = None;
        self.send_handshake();
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, ClientState::Handshake | ClientState::Approval)
    }

    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == ClientState::Disconnected
    }

    pub fn network_id(&self) -> Option<NetworkId> {
        self.network_id
    }

    /// True when the current session resumed a previous one.
    pub fn reconnected(&self) -> bool {
        self.reconnected
    }

    /// The newest server tick this client has applied.
    pub fn server_tick(&self) -> Option<Tick> {
        self.last_applied
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    // Replica pool

    pub fn ghost_ids(&self) -> Vec<GhostId> {
        self.ghosts.keys().copied().collect()
    }

    pub fn ghost_state(&self, ghost_id: GhostId) -> Option<&GhostState> {
        self.ghosts.get(&ghost_id).map(|ghost| &ghost.state)
    }

    pub fn ghost_type_id(&self, ghost_id: GhostId) -> Option<GhostTypeId> {
        self.ghosts.get(&ghost_id).map(|ghost| ghost.type_id)
    }

    // Tick driver

    /// Drains the transport and returns what happened.
    pub fn receive(&mut self) -> Events {
        let mut events = Events::new();

        if let Some(reason) = self.pending_disconnect.take() {
            self.close(reason, &mut events);
            return events;
        }
        if self.io.is_none() || self.state == ClientState::Disconnected {
            return events;
        }

        loop {
            let result = match &mut self.io {
                Some(io) => io.receiver.receive(),
                None => break,
            };
            match result {
                Ok(Some((_address, payload))) => {
                    self.ticks_since_heard = 0;
                    self.process_packet(&payload, &mut events);
                    if self.state == ClientState::Disconnected {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    events.push_error(error.into());
                    break;
                }
            }
        }

        events
    }

    /// Advances the client's side of the tick: handshake resends while
    /// connecting, heartbeats while connected, and the silence timeout.
    pub fn send(&mut self) {
        if self.state == ClientState::Disconnected || self.io.is_none() {
            return;
        }

        self.ticks_since_heard = self.ticks_since_heard.saturating_add(1);
        if self.ticks_since_heard > self.config.connection_timeout_ticks {
            self.pending_disconnect = Some(DisconnectReason::Timeout);
            return;
        }

        self.ticks_since_send = self.ticks_since_send.saturating_add(1);
        match self.state {
            ClientState::Handshake => {
                if self.ticks_since_send >= self.config.handshake_resend_ticks {
                    self.send_handshake();
                }
            }
            ClientState::Approval => {
                if self.ticks_since_send >= self.config.handshake_resend_ticks {
                    self.send_approval_response();
                }
            }
            ClientState::Connected => {
                if self.ticks_since_send >= self.config.heartbeat_interval_ticks {
                    self.ticks_since_send = 0;
                    let mut writer = BitWriter::new();
                    PacketType::Heartbeat.ser(&mut writer);
                    self.send_packet(writer);
                }
            }
            ClientState::Disconnected => {}
        }
    }

    /// Orderly close. The Disconnect event surfaces on the next `receive()`.
    pub fn disconnect(&mut self) {
        if self.state == ClientState::Disconnected {
            return;
        }
        let mut writer = BitWriter::new();
        PacketType::Disconnect.ser(&mut writer);
        DisconnectMessage {
            reason: DisconnectReason::ConnectionClose,
        }
        .ser(&mut writer);
        self.send_packet(writer);
        self.pending_disconnect = Some(DisconnectReason::ConnectionClose);
    }

    // Incoming

    fn process_packet(&mut self, payload: &[u8], events: &mut Events) {
        let mut reader = BitReader::new(payload);
        let Ok(packet_type) = PacketType::de(&mut reader) else {
            warn!("Dropping malformed packet from server");
            return;
        };

        match packet_type {
            PacketType::ApprovalRequest => {
                if self.state == ClientState::Handshake {
                    self.state = ClientState::Approval;
                }
                if self.state == ClientState::Approval {
                    self.send_approval_response();
                }
            }
            PacketType::VersionReject => self.receive_version_reject(&mut reader, events),
            PacketType::ServerAccept => self.receive_accept(&mut reader, events),
            PacketType::Data => {
                if self.state == ClientState::Connected {
                    if let Err(error) = self.receive_data(&mut reader, events) {
                        events.push_error(error);
                    }
                }
            }
            PacketType::Disconnect => self.receive_disconnect(&mut reader, events),
            PacketType::Heartbeat => {}
            PacketType::Ack
            | PacketType::Nack
            | PacketType::ClientHandshake
            | PacketType::ApprovalResponse => {
                warn!("Dropping unexpected {:?} packet from server", packet_type);
            }
        }
    }

    fn receive_version_reject(&mut self, reader: &mut BitReader, events: &mut Events) {
        if !self.is_connecting() {
            return;
        }
        let Ok(remote) = VersionPayload::de(reader) else {
            warn!("Dropping malformed version reject");
            return;
        };
        let local = self.registry.version_payload();
        // itemize on this end too; the server has already logged its own
        if let Err(mismatch) = VersionMismatch::validate(&local.info, &remote.info) {
            warn!("Connection rejected: {}", mismatch);
            if mismatch.component_schema_hash.is_some() {
                log_collection_mismatch(
                    "Component",
                    &local.component_items,
                    &remote.component_items,
                );
            }
            if mismatch.rpc_schema_hash.is_some() {
                log_collection_mismatch("RPC", &local.rpc_items, &remote.rpc_items);
            }
            events.push_error(WraithClientError::VersionRejected(mismatch));
        }
        self.close(DisconnectReason::ProtocolMismatch, events);
    }

    fn receive_accept(&mut self, reader: &mut BitReader, events: &mut Events) {
        if !self.is_connecting() {
            return;
        }
        let Ok(message) = ServerAcceptMessage::de(reader) else {
            warn!("Dropping malformed accept");
            return;
        };
        self.state = ClientState::Connected;
        self.network_id = Some(message.network_id);
        self.reconnected = message.reconnected;
        self.ticks_since_send = 0;
        events.push_connection(message.network_id, message.reconnected);
    }

    fn receive_disconnect(&mut self, reader: &mut BitReader, events: &mut Events) {
        let reason = match DisconnectMessage::de(reader) {
            // the remote's "I closed on purpose" is our "closed by remote"
            Ok(message) if message.reason == DisconnectReason::ConnectionClose => {
                DisconnectReason::ClosedByRemote
            }
            Ok(message) => message.reason,
            Err(_) => DisconnectReason::ClosedByRemote,
        };
        self.close(reason, events);
    }

    fn receive_data(
        &mut self,
        reader: &mut BitReader,
        events: &mut Events,
    ) -> Result<(), WraithClientError> {
        let tick = Tick::de(reader)?;
        if let Some(last) = self.last_applied {
            if !sequence_greater_than(tick, last) {
                debug!("Dropping stale data packet for tick {}", tick);
                return Ok(());
            }
        }

        let mut stale_baseline = false;
        loop {
            match GhostActionTag::de(reader)? {
                GhostActionTag::End => break,
                GhostActionTag::Spawn => {
                    let prefix = SpawnPrefix::de(reader)?;
                    let ghost_type = self.registry.ghost_type(prefix.type_id)?;
                    let header = read_update_header(ghost_type, reader)?;
                    // spawn bodies are always full snapshots
                    let state = read_snapshot(ghost_type, &header, None, reader)?;
                    let replaced = self
                        .ghosts
                        .insert(
                            prefix.ghost_id,
                            ClientGhost {
                                type_id: prefix.type_id,
                                state,
                                history: SnapshotHistory::new(self.config.history_capacity),
                            },
                        )
                        .is_some();
                    if replaced {
                        // a re-spawn of a known ghost is a full state reset
                        events.push_update(tick, prefix.ghost_id);
                    } else {
                        events.push_spawn(prefix.ghost_id);
                    }
                }
                GhostActionTag::Update => {
                    let ghost_id = GhostId::de(reader)?;
                    let Some(ghost) = self.ghosts.get_mut(&ghost_id) else {
                        // without the type we cannot even size the mask;
                        // the rest of the packet is unreadable
                        self.send_nack(tick);
                        return Err(SerdeErr.into());
                    };
                    let ghost_type = self.registry.ghost_type(ghost.type_id)?;
                    let header = read_update_header(ghost_type, reader)?;
                    match header.baseline_tick {
                        None => {
                            let state = read_snapshot(ghost_type, &header, None, reader)?;
                            ghost.state = state;
                            events.push_update(tick, ghost_id);
                        }
                        Some(baseline_tick) => match ghost.history.get(baseline_tick) {
                            Some(entry) => {
                                let state = read_snapshot(
                                    ghost_type,
                                    &header,
                                    Some(&entry.state),
                                    reader,
                                )?;
                                ghost.state = state;
                                events.push_update(tick, ghost_id);
                            }
                            None => {
                                // baseline evicted; keep the old state and
                                // ask the server to rebase
                                debug!(
                                    "Missing baseline tick {} for ghost {:?}",
                                    baseline_tick, ghost_id
                                );
                                skip_update_payload(&header, reader)?;
                                stale_baseline = true;
                            }
                        },
                    }
                }
                GhostActionTag::Despawn => {
                    let ghost_id = GhostId::de(reader)?;
                    if self.ghosts.remove(&ghost_id).is_some() {
                        events.push_despawn(ghost_id);
                    }
                }
            }
        }

        self.last_applied = Some(tick);

        if stale_baseline {
            self.send_nack(tick);
            return Ok(());
        }

        // remember what was applied this tick, then ack it; the server may
        // baseline any future delta on any tick we have acked
        for ghost in self.ghosts.values_mut() {
            let Ok(ghost_type) = self.registry.ghost_type(ghost.type_id) else {
                continue;
            };
            let mask = ChangeMask::new(ghost_type.mask_bit_count());
            if let Err(error) = ghost
                .history
                .insert(tick, ghost.state.clone(), mask)
            {
                events.push_error(wraith_shared::GhostError::from(error).into());
            }
        }
        self.send_ack(tick);
        Ok(())
    }

    // Outgoing

    fn send_handshake(&mut self) {
        self.ticks_since_send = 0;
        let mut writer = BitWriter::new();
        PacketType::ClientHandshake.ser(&mut writer);
        ClientHandshakeMessage {
            unique_id: self.unique_id,
            version: self.registry.version_payload(),
        }
        .ser(&mut writer);
        self.send_packet(writer);
    }

    fn send_approval_response(&mut self) {
        self.ticks_since_send = 0;
        let mut writer = BitWriter::new();
        PacketType::ApprovalResponse.ser(&mut writer);
        ApprovalResponseMessage {
            payload: self.approval_payload.clone(),
        }
        .ser(&mut writer);
        self.send_packet(writer);
    }

    fn send_ack(&mut self, tick: Tick) {
        let mut writer = BitWriter::new();
        PacketType::Ack.ser(&mut writer);
        tick.ser(&mut writer);
        self.send_packet(writer);
    }

    fn send_nack(&mut self, tick: Tick) {
        let mut writer = BitWriter::new();
        PacketType::Nack.ser(&mut writer);
        tick.ser(&mut writer);
        self.send_packet(writer);
    }

    fn send_packet(&mut self, writer: BitWriter) {
        let Some(address) = self.server_address else {
            return;
        };
        if let Some(io) = &self.io {
            if io.sender.send(&address, &writer.to_bytes()).is_err() {
                warn!("Transport refused outgoing packet");
            }
        }
    }

    fn close(&mut self, reason: DisconnectReason, events: &mut Events) {
        if self.state == ClientState::Disconnected {
            return;
        }
        self.state = ClientState::Disconnected;
        events.push_disconnection(reason);
    }
}
