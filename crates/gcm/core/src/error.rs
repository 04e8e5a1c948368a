//! Dispatch error types.

use thiserror::Error;

use crate::MessageStatus;

/// Errors raised by the dispatch core itself (as opposed to the gateway or store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The message left `NONE` already; a record is dispatched at most once.
    #[error("message {id} was already dispatched (status {status})")]
    AlreadyDispatched { id: uuid::Uuid, status: MessageStatus },

    /// The per-recipient result list does not line up with the recipients.
    #[error("malformed gateway response: {recipients} recipients but {results} results")]
    MalformedResponse { recipients: usize, results: usize },
}
