use std::default::Default;

use wraith_shared::SNAPSHOT_HISTORY_CAPACITY;

/// Contains Config properties which will be used by the Client
#[derive(Clone)]
pub struct ClientConfig {
    /// Ticks between handshake / approval resends while connecting.
    pub handshake_resend_ticks: u16,
    /// Ticks between heartbeats once connected. Acks already keep an
    /// active connection alive; this covers idle stretches.
    pub heartbeat_interval_ticks: u16,
    /// Ticks of server silence before the client gives up.
    pub connection_timeout_ticks: u16,
    /// Slots in each replica ghost's applied-snapshot ring.
    pub history_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            handshake_resend_ticks: 10,
            heartbeat_interval_ticks: 30,
            connection_timeout_ticks: 600,
            history_capacity: SNAPSHOT_HISTORY_CAPACITY,
        }
    }
}
