use wraith_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

/// Why a connection reached its terminal Disconnected state. Surfaced in the
/// lifecycle event; never silently swallowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// This side closed the connection on purpose (kick or shutdown).
    ConnectionClose,
    /// The remote peer sent an orderly Disconnect packet.
    ClosedByRemote,
    /// Nothing heard from the peer within the timeout window.
    Timeout,
    /// Protocol/game version or schema hash mismatch. Always fatal,
    /// never retried.
    ProtocolMismatch,
    /// The application rejected the connection during the approval phase.
    ApprovalDenied,
    /// The approval phase did not complete within its tick budget.
    ApprovalTimeout,
}

impl Serde for DisconnectReason {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let index: u8 = match self {
            DisconnectReason::ConnectionClose => 0,
            DisconnectReason::ClosedByRemote => 1,
            DisconnectReason::Timeout => 2,
            DisconnectReason::ProtocolMismatch => 3,
            DisconnectReason::ApprovalDenied => 4,
            DisconnectReason::ApprovalTimeout => 5,
        };
        UnsignedInteger::<3>::new(index).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<3>::de(reader)?.get() {
            0 => Ok(DisconnectReason::ConnectionClose),
            1 => Ok(DisconnectReason::ClosedByRemote),
            2 => Ok(DisconnectReason::Timeout),
            3 => Ok(DisconnectReason::ProtocolMismatch),
            4 => Ok(DisconnectReason::ApprovalDenied),
            5 => Ok(DisconnectReason::ApprovalTimeout),
            _ => Err(SerdeErr),
        }
    }

    fn bit_length(&self) -> u32 {
        3
    }
}
