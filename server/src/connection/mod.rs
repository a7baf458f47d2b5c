pub mod connection;
pub mod ghost_channel;
