//! Error types for trato-core

use thiserror::Error;

/// Result type alias using trato-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in trato-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// A remote request exceeded its deadline
    #[error("Request timed out: {0}")]
    NetworkTimeout(String),

    /// A remote request failed in transit
    #[error("Network error: {0}")]
    NetworkFailure(String),

    /// Session missing or expired; the caller should reauthenticate
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Role-gated action attempted by the wrong party
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Action conflicts with the current negotiation state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected before any network request was issued
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Conversation, proposal, or exchange id unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote service returned a malformed or unexpected payload
    #[error("Bad API response: {0}")]
    Api(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error came from the transport layer rather than a
    /// rejected operation. Transport errors on background work are logged
    /// and swallowed; everything else surfaces to the caller.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkTimeout(_) | Self::NetworkFailure(_))
    }
}
