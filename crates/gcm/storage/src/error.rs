//! Storage error types.

use thiserror::Error;

/// Errors with a meaning beyond "the database failed".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another device already holds this registration token.
    #[error("registration token {token} is already registered to another device")]
    TokenConflict { token: String },

    /// A stored status column holds an unknown literal.
    #[error("message {id} has invalid status {status:?}")]
    InvalidStatus { id: String, status: String },
}
