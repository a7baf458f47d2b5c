//! # Wraith Shared
//! Common functionality shared between wraith-server & wraith-client crates:
//! the ghost schema registry, protocol version negotiation, snapshot
//! delta-compression, and the connection-level types both peers agree on.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use wraith_serde::{
    BitReader, BitWrite, BitWriter, ConstBitLength, Serde, SerdeErr, SignedVariableInteger,
    UnsignedInteger, UnsignedVariableInteger, MTU_SIZE_BITS, MTU_SIZE_BYTES,
};

mod connection;
mod constants;
mod ghost;
mod handshake;
mod key_generator;
mod schema;
mod transport;
mod types;
mod wrapping_number;

pub use connection::{
    disconnect_reason::DisconnectReason,
    messages::{
        ApprovalResponseMessage, ClientHandshakeMessage, DisconnectMessage, GhostActionTag,
        ServerAcceptMessage, SpawnPrefix,
    },
    packet_type::{PacketType, PacketTypeError},
};
pub use constants::{
    DEFAULT_DYNAMIC_BUFFER_CAPACITY, MAX_INLINE_LIST_CAPACITY, SNAPSHOT_HISTORY_CAPACITY,
};
pub use ghost::{
    change_mask::ChangeMask,
    delta::{
        diff_states, overlay_masked, read_snapshot, read_update_header, skip_update_payload,
        write_update, SentUpdate, UpdateHeader,
    },
    dynamic::CapacityError,
    error::GhostError,
    filter::{replicates_statically, should_send_field, PredictionMode, SendContext},
    group::{GhostGroup, GhostGroupError, GhostGroupId, GhostGroupManager},
    history::{HistoryEntry, HistoryError, SnapshotHistory},
    value::{dequantize, quantize, FieldValue, GhostState},
};
pub use handshake::version::{
    diff_hash_items, log_collection_mismatch, HashItem, HashItemDiff, ProtocolVersionInfo,
    VersionMismatch, VersionPayload,
};
pub use key_generator::KeyGenerator;
pub use schema::{
    error::SchemaError,
    field::{FieldDescriptor, FieldKind, FieldPath, OwnerSendType, ScalarKind, SendOptimization},
    ghost_type::{GhostType, GhostTypeBuilder},
    registry::{RpcDescriptor, SchemaRegistry, SchemaRegistryBuilder},
};
pub use transport::{
    error::{RecvError, SendError},
    PacketReceiver, PacketSender,
};
pub use types::{GhostId, GhostTypeId, NetworkId, Tick};
pub use wrapping_number::{sequence_greater_than, sequence_less_than, wrapping_diff};
