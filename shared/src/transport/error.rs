use std::fmt;

/// The transport could not accept an outgoing packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendError;

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Transport send error")
    }
}

impl std::error::Error for SendError {}

/// The transport failed while polling for incoming packets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecvError;

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Transport recv error")
    }
}

impl std::error::Error for RecvError {}
