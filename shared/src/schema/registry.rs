use crate::{
    constants::MAX_INLINE_LIST_CAPACITY,
    handshake::version::{HashItem, ProtocolVersionInfo, VersionPayload},
    schema::{
        error::SchemaError,
        field::{FieldDescriptor, FieldKind, OwnerSendType, ScalarKind, SendOptimization},
        ghost_type::GhostType,
    },
    types::GhostTypeId,
};

/// Signature of one registered RPC: its name plus the ordered parameter
/// shapes. Only the signature participates in version negotiation; RPC
/// dispatch itself lives with the application.
#[derive(Clone, Debug, PartialEq)]
pub struct RpcDescriptor {
    pub name: &'static str,
    pub params: Vec<ScalarKind>,
}

impl RpcDescriptor {
    pub fn new(name: &'static str, params: Vec<ScalarKind>) -> Self {
        Self { name, params }
    }
}

/// The process-wide ghost schema: every registered ghost type and RPC
/// signature, plus the protocol/game versions. Immutable once built —
/// construct it at startup and pass it by reference; it is deliberately
/// not reachable through any global.
pub struct SchemaRegistry {
    protocol_version: u32,
    game_version: u32,
    ghost_types: Vec<GhostType>,
    rpcs: Vec<RpcDescriptor>,
    component_hash: u32,
    rpc_hash: u32,
}

impl SchemaRegistry {
    pub fn builder(protocol_version: u32, game_version: u32) -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            protocol_version,
            game_version,
            ghost_types: Vec::new(),
            rpcs: Vec::new(),
        }
    }

    pub fn ghost_type(&self, type_id: GhostTypeId) -> Result<&GhostType, SchemaError> {
        self.ghost_types
            .get(type_id.value() as usize)
            .ok_or(SchemaError::UnknownGhostType { type_id })
    }

    pub fn ghost_type_count(&self) -> usize {
        self.ghost_types.len()
    }

    /// The canonical id of a registered type. Ids are positions in name
    /// order, so both peers resolve the same name to the same id.
    pub fn type_id(&self, name: &str) -> Option<GhostTypeId> {
        self.ghost_types
            .iter()
            .position(|ghost_type| ghost_type.name() == name)
            .map(|index| GhostTypeId::new(index as u16))
    }

    pub fn component_hash(&self) -> u32 {
        self.component_hash
    }

    pub fn rpc_hash(&self) -> u32 {
        self.rpc_hash
    }

    /// The version tuple exchanged during the handshake.
    pub fn version_info(&self) -> ProtocolVersionInfo {
        ProtocolVersionInfo {
            protocol_version: self.protocol_version,
            game_version: self.game_version,
            rpc_schema_hash: self.rpc_hash,
            component_schema_hash: self.component_hash,
        }
    }

    /// Per-component `(name, hash)` pairs, for itemized mismatch diffs.
    pub fn component_hash_items(&self) -> Vec<HashItem> {
        self.ghost_types
            .iter()
            .map(|ghost_type| HashItem {
                name: ghost_type.name().to_string(),
                hash: hash_ghost_type(ghost_type),
            })
            .collect()
    }

    /// Everything this peer states about its protocol in the handshake.
    pub fn version_payload(&self) -> VersionPayload {
        VersionPayload {
            info: self.version_info(),
            component_items: self.component_hash_items(),
            rpc_items: self.rpc_hash_items(),
        }
    }

    /// Per-RPC `(name, hash)` pairs, for itemized mismatch diffs.
    pub fn rpc_hash_items(&self) -> Vec<HashItem> {
        self.rpcs
            .iter()
            .map(|rpc| HashItem {
                name: rpc.name.to_string(),
                hash: hash_rpc(rpc),
            })
            .collect()
    }
}

pub struct SchemaRegistryBuilder {
    protocol_version: u32,
    game_version: u32,
    ghost_types: Vec<GhostType>,
    rpcs: Vec<RpcDescriptor>,
}

impl SchemaRegistryBuilder {
    pub fn add_ghost_type(&mut self, ghost_type: GhostType) -> Result<(), SchemaError> {
        if self
            .ghost_types
            .iter()
            .any(|existing| existing.name() == ghost_type.name())
        {
            return Err(SchemaError::DuplicateGhostType {
                name: ghost_type.name(),
            });
        }
        for descriptor in ghost_type
            .fields()
            .iter()
            .chain(ghost_type.child_sets().iter().flatten())
        {
            if let FieldKind::List { capacity, .. } = &descriptor.kind {
                if *capacity > MAX_INLINE_LIST_CAPACITY {
                    return Err(SchemaError::ListCapacityExceedsCap {
                        field: descriptor.name,
                        capacity: *capacity,
                        max: MAX_INLINE_LIST_CAPACITY,
                    });
                }
            }
        }
        self.ghost_types.push(ghost_type);
        Ok(())
    }

    pub fn add_rpc(&mut self, rpc: RpcDescriptor) -> Result<(), SchemaError> {
        if self.rpcs.iter().any(|existing| existing.name == rpc.name) {
            return Err(SchemaError::DuplicateRpc { name: rpc.name });
        }
        self.rpcs.push(rpc);
        Ok(())
    }

    pub fn build(mut self) -> SchemaRegistry {
        // Type ids are positions in name order, never registration order:
        // two peers that pass version validation with the same hashes must
        // also agree on every id, and the hashes are order-insensitive.
        self.ghost_types
            .sort_by(|a, b| a.name().cmp(b.name()));
        self.rpcs.sort_by(|a, b| a.name.cmp(b.name));

        // Commutative combine over per-item hashes: registration order can
        // differ between peers without affecting the result.
        let component_hash = self
            .ghost_types
            .iter()
            .fold(0u32, |acc, ghost_type| acc.wrapping_add(hash_ghost_type(ghost_type)));
        let rpc_hash = self
            .rpcs
            .iter()
            .fold(0u32, |acc, rpc| acc.wrapping_add(hash_rpc(rpc)));

        SchemaRegistry {
            protocol_version: self.protocol_version,
            game_version: self.game_version,
            ghost_types: self.ghost_types,
            rpcs: self.rpcs,
            component_hash,
            rpc_hash,
        }
    }
}

// FNV-1a, taken field by field so that any layout change shifts the hash.

const FNV_OFFSET: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 16777619;

struct Fnv1a(u32);

impl Fnv1a {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn byte(&mut self, byte: u8) {
        self.0 ^= u32::from(byte);
        self.0 = self.0.wrapping_mul(FNV_PRIME);
    }

    fn bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.byte(*byte);
        }
    }

    fn u32(&mut self, value: u32) {
        self.bytes(&value.to_le_bytes());
    }
}

fn hash_field(hasher: &mut Fnv1a, descriptor: &FieldDescriptor) {
    hasher.bytes(descriptor.name.as_bytes());
    hasher.byte(descriptor.kind.hash_tag());
    if let Some(capacity) = descriptor.kind.capacity() {
        hasher.u32(capacity as u32);
    }
    if let FieldKind::List { elem, .. } = &descriptor.kind {
        hasher.byte(FieldKind::Scalar(*elem).hash_tag());
    }
    hasher.u32(descriptor.quantize.to_bits());
    hasher.byte(descriptor.interpolate as u8);
    hasher.byte(match descriptor.send_rule {
        SendOptimization::DontSend => 0,
        SendOptimization::OnlyInterpolated => 1,
        SendOptimization::OnlyPredicted => 2,
        SendOptimization::AllClients => 3,
    });
    hasher.byte(match descriptor.owner_rule {
        OwnerSendType::None => 0,
        OwnerSendType::SendToOwner => 1,
        OwnerSendType::SendToNonOwner => 2,
        OwnerSendType::All => 3,
    });
    hasher.byte(descriptor.send_for_children as u8);
}

fn hash_ghost_type(ghost_type: &GhostType) -> u32 {
    let mut hasher = Fnv1a::new();
    hasher.bytes(ghost_type.name().as_bytes());
    hasher.byte(ghost_type.is_static() as u8);
    for descriptor in ghost_type.fields() {
        hash_field(&mut hasher, descriptor);
    }
    for set in ghost_type.child_sets() {
        hasher.byte(0xFE); // child set separator
        for descriptor in set {
            hash_field(&mut hasher, descriptor);
        }
    }
    hasher.0
}

fn hash_rpc(rpc: &RpcDescriptor) -> u32 {
    let mut hasher = Fnv1a::new();
    hasher.bytes(rpc.name.as_bytes());
    for param in &rpc.params {
        hasher.byte(FieldKind::Scalar(*param).hash_tag());
    }
    hasher.0
}
