use thiserror::Error;

use wraith_shared::{GhostError, RecvError, SchemaError, SendError, SerdeErr, VersionMismatch};

/// An Error type specifically related to the Wraith Client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WraithClientError {
    /// An operation that needs a connection was called before `connect()`.
    #[error("Client is not connected")]
    NotConnected,
    /// The server rejected the handshake. Itemized diffs have already been
    /// logged; this is fatal for the session.
    #[error(transparent)]
    VersionRejected(#[from] VersionMismatch),
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
