//! Bodies of the non-Data packets, shared by both peers so neither side
//! hand-rolls a layout. Each body follows its `PacketType` on the wire.

use wraith_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::{
    connection::disconnect_reason::DisconnectReason,
    handshake::version::VersionPayload,
    types::{GhostId, GhostTypeId, NetworkId},
};

/// Client -> server, resent until the server answers. The unique id is an
/// application-chosen identity that survives reconnects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientHandshakeMessage {
    pub unique_id: u64,
    pub version: VersionPayload,
}

impl Serde for ClientHandshakeMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.unique_id.ser(writer);
        self.version.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            unique_id: u64::de(reader)?,
            version: VersionPayload::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.unique_id.bit_length() + self.version.bit_length()
    }
}

/// Client -> server: the application's opaque approval payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalResponseMessage {
    pub payload: Vec<u8>,
}

impl Serde for ApprovalResponseMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.payload.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            payload: Vec::<u8>::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.payload.bit_length()
    }
}

/// Server -> client: the connection is live. `reconnected` tells the client
/// whether this resumed a prior session under the same unique id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerAcceptMessage {
    pub network_id: NetworkId,
    pub reconnected: bool,
}

impl Serde for ServerAcceptMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.network_id.ser(writer);
        self.reconnected.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            network_id: NetworkId::de(reader)?,
            reconnected: bool::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.network_id.bit_length() + 1
    }
}

/// Either direction: orderly close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisconnectMessage {
    pub reason: DisconnectReason,
}

impl Serde for DisconnectMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.reason.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            reason: DisconnectReason::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.reason.bit_length()
    }
}

/// Two-bit tag in front of each item in a Data packet's action list.
/// Spawn and Update are each followed by a ghost update body; the body of a
/// Spawn is always a full snapshot (no baseline).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GhostActionTag {
    End,
    Spawn,
    Update,
    Despawn,
}

impl Serde for GhostActionTag {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let index: u8 = match self {
            GhostActionTag::End => 0,
            GhostActionTag::Spawn => 1,
            GhostActionTag::Update => 2,
            GhostActionTag::Despawn => 3,
        };
        UnsignedInteger::<2>::new(index).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        match UnsignedInteger::<2>::de(reader)?.get() {
            0 => Ok(GhostActionTag::End),
            1 => Ok(GhostActionTag::Spawn),
            2 => Ok(GhostActionTag::Update),
            _ => Ok(GhostActionTag::Despawn),
        }
    }

    fn bit_length(&self) -> u32 {
        2
    }
}

/// The fixed prefix of a Spawn action: the update body follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPrefix {
    pub ghost_id: GhostId,
    pub type_id: GhostTypeId,
}

impl Serde for SpawnPrefix {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.ghost_id.ser(writer);
        self.type_id.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            ghost_id: GhostId::de(reader)?,
            type_id: GhostTypeId::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.ghost_id.bit_length() + self.type_id.bit_length()
    }
}
