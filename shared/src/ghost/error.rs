use thiserror::Error;

use crate::{
    ghost::{dynamic::CapacityError, group::GhostGroupError, history::HistoryError},
    schema::error::SchemaError,
};
use wraith_serde::SerdeErr;

/// Umbrella error for ghost replication. Every variant is connection- or
/// field-scoped; none of them poison the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GhostError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Group(#[from] GhostGroupError),
    #[error("Malformed ghost payload")]
    Serde(#[from] SerdeErr),
}
