//! # Wraith Server
//! The authoritative peer of the ghost replication protocol: validates each
//! client's protocol version during the handshake, runs the approval flow,
//! and streams delta-compressed ghost snapshots to every connection whose
//! scope contains them.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod transport;

pub mod shared {
    pub use wraith_shared::{
        BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SignedVariableInteger,
        UnsignedInteger, UnsignedVariableInteger,
    };
}

mod connection;
mod error;
mod events;
mod server;
mod server_config;
mod user;

pub use error::WraithServerError;
pub use events::{Events, LifecycleEvent};
pub use server::Server;
pub use server_config::ServerConfig;
pub use user::{User, UserKey};
