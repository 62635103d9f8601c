use thiserror::Error;

use crate::store::StoreError;

/// Failure taxonomy for request/response operations (clans, missions, admin
/// queries). Real-time session events never surface these: invalid actions
/// are dropped silently at the handler.
#[derive(Debug, Error)]
pub enum GameError {
    /// Referenced clan, mission or player does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate clan id, duplicate membership or duplicate mission claim.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or out-of-range request.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Durable store failure bubbling out of a request/response call.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
