use thiserror::Error;

use wraith_shared::{GhostError, RecvError, SchemaError, SendError, SerdeErr};

use crate::user::UserKey;

/// An Error type specifically related to the Wraith Server
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WraithServerError {
    /// An operation that needs a transport was called before `listen()`.
    #[error("Server is not listening")]
    NotListening,
    #[error("Unknown user key {0:?}")]
    UnknownUser(UserKey),
    #[error("Unknown ghost id")]
    UnknownGhost,
    /// Every 16-bit ghost id is live or awaiting despawn confirmation.
    #[error("Ghost id space exhausted")]
    GhostIdsExhausted,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Ghost(#[from] GhostError),
    #[error(transparent)]
    Serde(#[from] SerdeErr),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error(transparent)]
    Recv(#[from] RecvError),
}
