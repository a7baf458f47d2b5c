//! # Wraith Client
//! The replica peer of the ghost replication protocol: performs the
//! version-validated handshake, then maintains a pool of server-owned
//! ghosts by applying delta-compressed snapshots and acking each applied
//! tick back to the server.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod shared {
    pub use wraith_shared::{
        BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SignedVariableInteger,
        UnsignedInteger, UnsignedVariableInteger,
    };
}

mod client;
mod client_config;
mod error;
mod events;

pub use client::Client;
pub use client_config::ClientConfig;
pub use error::WraithClientError;
pub use events::Events;
