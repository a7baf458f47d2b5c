// An enum representing the different types of packets that can be
// sent/received

use thiserror::Error;
use wraith_serde::{BitReader, BitWrite, ConstBitLength, Serde, SerdeErr, UnsignedInteger};

#[derive(Copy, Debug, Clone, Eq, PartialEq)]
pub enum PacketType {
    // A packet containing ghost snapshot data for one tick
    Data,
    // Client -> server: the referenced tick's snapshot applied cleanly
    Ack,
    // Client -> server: a referenced baseline was missing, send full state
    Nack,
    // Client -> server: version tuple, schema hash items, unique id
    ClientHandshake,
    // Server -> client: version validation failed, carries the server's
    // hash items so the client can itemize the diff on its own end
    VersionReject,
    // Server -> client: application approval required before Connected
    ApprovalRequest,
    // Client -> server: application-defined approval payload
    ApprovalResponse,
    // Server -> client: connection accepted, carries the assigned NetworkId
    ServerAccept,
    // Either direction: orderly close, carries a DisconnectReason
    Disconnect,
    // A packet sent to maintain the connection by preventing a timeout
    Heartbeat,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketTypeError {
    /// A malformed or malicious packet carried an index outside the enum.
    #[error("Invalid packet type index {index} in incoming packet")]
    InvalidPacketTypeIndex { index: u8 },
}

// Most packets should be Data, so that case compresses to a single bit.
impl Serde for PacketType {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let is_data = *self == PacketType::Data;
        is_data.ser(writer);

        if is_data {
            return;
        }

        let index: u8 = match self {
            PacketType::Data => 0, // unreachable, handled above
            PacketType::Ack => 0,
            PacketType::Nack => 1,
            PacketType::ClientHandshake => 2,
            PacketType::VersionReject => 3,
            PacketType::ApprovalRequest => 4,
            PacketType::ApprovalResponse => 5,
            PacketType::ServerAccept => 6,
            PacketType::Disconnect => 7,
            PacketType::Heartbeat => 8,
        };

        UnsignedInteger::<4>::new(index).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let is_data = bool::de(reader)?;
        if is_data {
            return Ok(PacketType::Data);
        }

        match UnsignedInteger::<4>::de(reader)?.get() {
            0 => Ok(PacketType::Ack),
            1 => Ok(PacketType::Nack),
            2 => Ok(PacketType::ClientHandshake),
            3 => Ok(PacketType::VersionReject),
            4 => Ok(PacketType::ApprovalRequest),
            5 => Ok(PacketType::ApprovalResponse),
            6 => Ok(PacketType::ServerAccept),
            7 => Ok(PacketType::Disconnect),
            8 => Ok(PacketType::Heartbeat),
            _ => Err(SerdeErr),
        }
    }

    fn bit_length(&self) -> u32 {
        let mut output = 0;

        let is_data = *self == PacketType::Data;
        output += is_data.bit_length();

        if is_data {
            return output;
        }

        output + <UnsignedInteger<4> as ConstBitLength>::const_bit_length()
    }
}
