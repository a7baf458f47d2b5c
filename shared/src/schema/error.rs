use thiserror::Error;

use crate::schema::field::FieldPath;
use crate::types::{GhostId, GhostTypeId};

/// Errors raised while building or using the schema registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two ghost types were registered under the same name; per-item hashes
    /// would collide and the itemized mismatch diagnostics would be
    /// ambiguous.
    #[error("Ghost type '{name}' registered twice")]
    DuplicateGhostType { name: &'static str },

    /// Two RPCs were registered under the same name.
    #[error("RPC '{name}' registered twice")]
    DuplicateRpc { name: &'static str },

    /// A list field was declared with a capacity over the hard inline cap.
    #[error("Field '{field}' capacity {capacity} exceeds the inline list cap of {max}")]
    ListCapacityExceedsCap {
        field: &'static str,
        capacity: usize,
        max: usize,
    },

    /// A ghost type id that this registry never produced.
    #[error("Unknown ghost type id {type_id:?}")]
    UnknownGhostType { type_id: GhostTypeId },

    /// A field path outside the ghost type's layout.
    #[error("Ghost {ghost_id:?} has no field at {path:?}")]
    UnknownField { ghost_id: GhostId, path: FieldPath },

    /// A value whose shape doesn't match the field's declared kind.
    #[error("Value shape does not match field '{field}'")]
    ValueShapeMismatch { field: &'static str },
}
