use std::net::SocketAddr;

use wraith_shared::NetworkId;

// UserKey
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct UserKey(u64);

impl UserKey {
    pub(crate) fn from_u64(value: u64) -> Self {
        UserKey(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

/// Host-visible record of one connected user.
#[derive(Clone, Debug)]
pub struct User {
    pub address: SocketAddr,
    /// The stable id assigned at accept time. Survives a reconnect from
    /// the same client identity.
    pub network_id: NetworkId,
    /// True when this connection resumed a previously dropped identity.
    pub reconnected: bool,
}
