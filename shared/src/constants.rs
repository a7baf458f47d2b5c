/// Hard cap on the element count of a fixed-capacity inline list field.
pub const MAX_INLINE_LIST_CAPACITY: usize = 1024;

/// Serializable cap applied to dynamic buffer fields that don't override it.
/// Deliberately small; oversized buffers don't belong in per-tick snapshots.
pub const DEFAULT_DYNAMIC_BUFFER_CAPACITY: usize = 64;

/// Slots in each per-(ghost, connection) snapshot history ring.
pub const SNAPSHOT_HISTORY_CAPACITY: usize = 32;
