use std::mem;

use wraith_shared::{DisconnectReason, GhostId, NetworkId, Tick};

use crate::error::WraithClientError;

/// Everything that happened during one `receive()` call.
pub struct Events {
    connections: Vec<(NetworkId, bool)>,
    disconnections: Vec<DisconnectReason>,
    spawns: Vec<GhostId>,
    despawns: Vec<GhostId>,
    updates: Vec<(Tick, GhostId)>,
    errors: Vec<WraithClientError>,
    empty: bool,
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

impl Events {
    pub(crate) fn new() -> Self {
        Self {
            connections: Vec::new(),
            disconnections: Vec::new(),
            spawns: Vec::new(),
            despawns: Vec::new(),
            updates: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// `(network id, reconnected)` for a connection that just went live.
    pub fn read_connections(&mut self) -> Vec<(NetworkId, bool)> {
        mem::take(&mut self.connections)
    }

    pub fn read_disconnections(&mut self) -> Vec<DisconnectReason> {
        mem::take(&mut self.disconnections)
    }

    pub fn read_spawns(&mut self) -> Vec<GhostId> {
        mem::take(&mut self.spawns)
    }

    pub fn read_despawns(&mut self) -> Vec<GhostId> {
        mem::take(&mut self.despawns)
    }

    /// `(server tick, ghost)` for every replica whose state changed.
    pub fn read_updates(&mut self) -> Vec<(Tick, GhostId)> {
        mem::take(&mut self.updates)
    }

    pub fn read_errors(&mut self) -> Vec<WraithClientError> {
        mem::take(&mut self.errors)
    }

    // Crate-internal push methods

    pub(crate) fn push_connection(&mut self, network_id: NetworkId, reconnected: bool) {
        self.empty = false;
        self.connections.push((network_id, reconnected));
    }

    pub(crate) fn push_disconnection(&mut self, reason: DisconnectReason) {
        self.empty = false;
        self.disconnections.push(reason);
    }

    pub(crate) fn push_spawn(&mut self, ghost_id: GhostId) {
        self.empty = false;
        self.spawns.push(ghost_id);
    }

    pub(crate) fn push_despawn(&mut self, ghost_id: GhostId) {
        self.empty = false;
        self.despawns.push(ghost_id);
    }

    pub(crate) fn push_update(&mut self, tick: Tick, ghost_id: GhostId) {
        self.empty = false;
        self.updates.push((tick, ghost_id));
    }

    pub(crate) fn push_error(&mut self, error: WraithClientError) {
        self.empty = false;
        self.errors.push(error);
    }
}
