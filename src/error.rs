use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum Error {
    // Bad local input; surfaced before any network call is made.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] ApiError),

    // Duplicate request/like/edge, or an RPC that resolved to a logical `false`.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("media upload failed: {0}")]
    Upload(String),

    // Serialization guard: one like mutation per memory in flight at a time.
    #[error("a like update for memory {0} is still in flight")]
    LikeInFlight(String),

    // One of the two directed rows survived the delete; the edge is still
    // (partially) present and must be retried.
    #[error("friend edge with {0} was only partially removed")]
    PartialRemoval(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    // Collapse duplicate-row upstream rejections into the Conflict bucket so
    // callers don't match on transport details.
    pub(crate) fn from_api(err: ApiError, conflict_context: &str) -> Self {
        if err.is_duplicate() {
            Error::Conflict(conflict_context.to_string())
        } else {
            Error::Transport(err)
        }
    }
}
