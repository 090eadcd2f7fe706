//! Error taxonomy shared by every domain service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoyaltyError {
    /// A code, story, ledger entry or referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Code is expired, already consumed or scoped to something else
    #[error("Invalid code: {0}")]
    InvalidCode(String),

    /// Code belongs to another organization or to a goal of another organization
    #[error("Code belongs to other organization or goal")]
    ScopeMismatch,

    /// Caller lacks the role or ownership required, or a prerequisite code is missing
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Organization discount policy is missing fields or inconsistent
    #[error("Invalid discount policy: {0}")]
    InvalidPolicy(String),

    /// Another request changed the same record first
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller identity could not be established
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type LoyaltyResult<T> = Result<T, LoyaltyError>;
