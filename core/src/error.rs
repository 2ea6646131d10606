//! Error types for store and auth operations.

use crate::types::TodoId;
use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure modes of the todo store.
///
/// Every mutation either fully applies and emits exactly one change event,
/// or fails with one of these and leaves the store untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A create presented an id that is already live.
    #[error("Todo with id {0} already exists")]
    AlreadyExists(TodoId),

    /// An update, delete or get referenced an id that is not live.
    #[error("Todo with id {0} not found")]
    NotFound(TodoId),
}

/// Failure modes of the auth gate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing or incorrect credentials on a protected operation.
    #[error("Invalid credentials")]
    InvalidCredentials,
}
