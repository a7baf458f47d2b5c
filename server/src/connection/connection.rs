use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use wraith_shared::{
    sequence_greater_than, DisconnectReason, GhostId, NetworkId, PredictionMode, Tick,
};

use crate::{
    connection::ghost_channel::{GhostChannel, GhostChannelStatus},
    events::{LifecycleEvent, LifecycleQueue},
    user::UserKey,
};

/// Server-side connection state machine. A `Connection` exists from the
/// first version-valid handshake packet until its Disconnect event has been
/// drained by the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Version validated, waiting for the client's approval payload.
    Handshake,
    /// Approval payload surfaced to the application, awaiting its verdict.
    Approval,
    Connected,
    /// Terminal.
    Disconnected(DisconnectReason),
}

pub struct Connection {
    pub address: SocketAddr,
    pub user_key: UserKey,
    pub unique_id: u64,
    pub state: ConnectionState,
    pub network_id: Option<NetworkId>,
    pub reconnected: bool,
    /// Server tick a packet was last received at, for timeouts.
    pub last_heard: Tick,
    /// Tick the approval phase started at, for the approval timeout.
    pub approval_started: Tick,
    /// Cumulative: the newest data tick the client reported applying.
    pub last_acked: Option<Tick>,
    pub channels: HashMap<GhostId, GhostChannel>,
    pub scope: HashSet<GhostId>,
    predictions: HashMap<GhostId, PredictionMode>,
    pub lifecycle: LifecycleQueue,
}

impl Connection {
    pub fn new(address: SocketAddr, user_key: UserKey, unique_id: u64, tick: Tick) -> Self {
        Self {
            address,
            user_key,
            unique_id,
            state: ConnectionState::Handshake,
            network_id: None,
            reconnected: false,
            last_heard: tick,
            approval_started: tick,
            last_acked: None,
            channels: HashMap::new(),
            scope: HashSet::new(),
            predictions: HashMap::new(),
            lifecycle: LifecycleQueue::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self.state, ConnectionState::Disconnected(_))
    }

    /// Moves to the terminal state and queues the lifecycle event. A second
    /// call is a no-op; the first reason wins.
    pub fn disconnect(&mut self, reason: DisconnectReason) {
        if self.is_disconnected() {
            return;
        }
        self.state = ConnectionState::Disconnected(reason);
        self.lifecycle.push(LifecycleEvent::Disconnect(reason));
    }

    pub fn prediction_of(&self, ghost_id: GhostId) -> PredictionMode {
        self.predictions
            .get(&ghost_id)
            .copied()
            .unwrap_or(PredictionMode::Interpolated)
    }

    pub fn set_prediction(&mut self, ghost_id: GhostId, mode: PredictionMode) {
        if mode == PredictionMode::Interpolated {
            self.predictions.remove(&ghost_id);
        } else {
            self.predictions.insert(ghost_id, mode);
        }
    }

    /// Folds a cumulative ack into the connection and every ghost channel.
    /// Returns the ghosts whose despawn this ack confirmed.
    pub fn process_ack(&mut self, tick: Tick) -> Vec<GhostId> {
        match self.last_acked {
            Some(current) if !sequence_greater_than(tick, current) => return Vec::new(),
            _ => self.last_acked = Some(tick),
        }

        let mut confirmed = Vec::new();
        self.channels.retain(|ghost_id, channel| {
            if channel.process_ack(tick) {
                confirmed.push(*ghost_id);
                false
            } else {
                true
            }
        });
        confirmed
    }

    /// A client-side baseline went missing; everything rebases to a full
    /// send until the next ack lands.
    pub fn process_nack(&mut self) {
        self.last_acked = None;
        for channel in self.channels.values_mut() {
            if channel.status == GhostChannelStatus::Spawned {
                channel.status = GhostChannelStatus::Spawning;
            }
        }
    }

    /// Drops all per-ghost delta state so the next tick re-spawns the ghost
    /// on this connection. Used when ownership flips, because a new owner
    /// must receive fields the filter previously withheld.
    pub fn reset_ghost(&mut self, ghost_id: GhostId) {
        self.channels.remove(&ghost_id);
    }
}
