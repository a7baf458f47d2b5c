use std::{collections::VecDeque, mem};

use wraith_shared::{CapacityError, DisconnectReason, Tick};

use crate::{error::WraithServerError, user::UserKey};

/// A connection lifecycle transition, surfaced to the application at most
/// once per connection per `receive()` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A validated connection is waiting for application approval. Carries
    /// the client's opaque approval payload.
    Approval(Vec<u8>),
    Connect,
    Disconnect(DisconnectReason),
}

pub struct Events {
    approvals: Vec<(UserKey, Vec<u8>)>,
    connections: Vec<UserKey>,
    disconnections: Vec<(UserKey, DisconnectReason)>,
    nacks: Vec<(UserKey, Tick)>,
    capacity_drops: Vec<(UserKey, CapacityError)>,
    errors: Vec<WraithServerError>,
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
            approvals: Vec::new(),
            connections: Vec::new(),
            disconnections: Vec::new(),
            nacks: Vec::new(),
            capacity_drops: Vec::new(),
            errors: Vec::new(),
            empty: true,
        }
    }

    // Public

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Connections awaiting an `accept_connection` / `reject_connection`
    /// decision, with their approval payloads.
    pub fn read_approvals(&mut self) -> Vec<(UserKey, Vec<u8>)> {
        mem::take(&mut self.approvals)
    }

    pub fn read_connections(&mut self) -> Vec<UserKey> {
        mem::take(&mut self.connections)
    }

    pub fn read_disconnections(&mut self) -> Vec<(UserKey, DisconnectReason)> {
        mem::take(&mut self.disconnections)
    }

    /// Connections that reported a missing baseline this tick. The server
    /// has already rebased them to a full send; surfaced for diagnostics.
    pub fn read_nacks(&mut self) -> Vec<(UserKey, Tick)> {
        mem::take(&mut self.nacks)
    }

    /// Dynamic fields dropped from outgoing updates for exceeding their
    /// serializable cap. The field retries automatically next tick.
    pub fn read_capacity_drops(&mut self) -> Vec<(UserKey, CapacityError)> {
        mem::take(&mut self.capacity_drops)
    }

    pub fn read_errors(&mut self) -> Vec<WraithServerError> {
        mem::take(&mut self.errors)
    }

    // Crate-internal push methods

    pub(crate) fn push_lifecycle(&mut self, user_key: UserKey, event: LifecycleEvent) {
        self.empty = false;
        match event {
            LifecycleEvent::Approval(payload) => self.approvals.push((user_key, payload)),
            LifecycleEvent::Connect => self.connections.push(user_key),
            LifecycleEvent::Disconnect(reason) => self.disconnections.push((user_key, reason)),
        }
    }

    pub(crate) fn push_nack(&mut self, user_key: UserKey, tick: Tick) {
        self.empty = false;
        self.nacks.push((user_key, tick));
    }

    pub(crate) fn push_capacity_drop(&mut self, user_key: UserKey, error: CapacityError) {
        self.empty = false;
        self.capacity_drops.push((user_key, error));
    }

    pub(crate) fn push_error(&mut self, error: WraithServerError) {
        self.empty = false;
        self.errors.push(error);
    }
}

/// Per-connection queue of pending lifecycle transitions. `receive()` pops
/// at most one entry per call, so back-to-back transitions (connect then
/// immediate disconnect) surface on consecutive calls, never together.
#[derive(Default)]
pub(crate) struct LifecycleQueue {
    pending: VecDeque<LifecycleEvent>,
}

impl LifecycleQueue {
    pub(crate) fn push(&mut self, event: LifecycleEvent) {
        self.pending.push_back(event);
    }

    pub(crate) fn pop(&mut self) -> Option<LifecycleEvent> {
        self.pending.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
