use std::default::Default;

use wraith_shared::SNAPSHOT_HISTORY_CAPACITY;

/// Contains Config properties which will be used by the Server
#[derive(Clone)]
pub struct ServerConfig {
    /// Determines whether the application must approve each connection
    /// before it reaches Connected. When false, connections are accepted
    /// as soon as version validation passes.
    pub require_approval: bool,
    /// Ticks a connection may sit in the Approval state before it is
    /// dropped with `DisconnectReason::ApprovalTimeout`.
    pub approval_timeout_ticks: u16,
    /// Ticks of silence before a connection is dropped with
    /// `DisconnectReason::Timeout`.
    pub connection_timeout_ticks: u16,
    /// Slots in each ghost's snapshot history ring. Bounds how far back an
    /// acked baseline may fall before the server rebases to a full send.
    pub history_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_approval: true,
            approval_timeout_ticks: 300,
            connection_timeout_ticks: 600,
            history_capacity: SNAPSHOT_HISTORY_CAPACITY,
        }
    }
}
