//! Seams for the underlying datagram transport. The transport itself (UDP,
//! QUIC datagrams, an in-process channel for tests) lives outside this
//! protocol; both peers talk to it through these traits only.

pub mod error;

use std::net::SocketAddr;

use error::{RecvError, SendError};

pub trait PacketSender: Send {
    fn send(&self, address: &SocketAddr, payload: &[u8]) -> Result<(), SendError>;
}

pub trait PacketReceiver: Send {
    /// Non-blocking receive; `Ok(None)` when no packet is waiting. The
    /// protocol never suspends inside encode/decode, only here at the
    /// transport boundary.
    fn receive(&mut self) -> Result<Option<(SocketAddr, Box<[u8]>)>, RecvError>;
}
