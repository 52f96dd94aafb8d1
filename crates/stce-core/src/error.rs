//! # Error Module
//!
//! The single error type returned by every service operation.
//!
//! Variants map one-to-one onto the HTTP status families the app layer
//! answers with, so the mapping there stays a plain `match`.

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T, E = StceError> = std::result::Result<T, E>;

/// Errors produced by the core services.
#[derive(Debug, Error)]
pub enum StceError {
    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness rule would be violated.
    #[error("{0}")]
    Conflict(String),

    /// The request is malformed or fails validation.
    #[error("{0}")]
    BadRequest(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// Credentials are missing, wrong or expired.
    #[error("{0}")]
    Unauthorized(String),

    /// The embedded database failed.
    #[error("storage error: {0}")]
    Storage(#[from] Box<redb::Error>),

    /// A stored row could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),

    /// Password hashing failed (never a user error).
    #[error("password hashing error: {0}")]
    Password(String),

    /// Anything else the client did not cause (token encoding, file I/O).
    #[error("internal error: {0}")]
    Internal(String),
}

impl StceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// True for failures the client did not cause.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Codec(_) | Self::Password(_) | Self::Internal(_)
        )
    }
}

// redb splits its failures across one type per phase; funnel them all
// through the umbrella `redb::Error`.
macro_rules! from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StceError {
                fn from(err: $ty) -> Self {
                    Self::Storage(Box::new(redb::Error::from(err)))
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<redb::Error> for StceError {
    fn from(err: redb::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_not_internal() {
        assert!(!StceError::not_found("x").is_internal());
        assert!(!StceError::conflict("x").is_internal());
        assert!(!StceError::bad_request("x").is_internal());
        assert!(StceError::Password("boom".into()).is_internal());
    }

    #[test]
    fn display_uses_message_verbatim() {
        let err = StceError::not_found("Team with id 9 not found");
        assert_eq!(err.to_string(), "Team with id 9 not found");
    }
}
