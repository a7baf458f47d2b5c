pub mod channel;

pub use channel::PacketChannel;
pub use wraith_shared::{PacketReceiver, PacketSender, RecvError, SendError};
