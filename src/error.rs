//! Error taxonomy for the referral-link dashboard core
//!
//! Three layers: `ValidationError` for input rejected before any backend
//! call, `BackendError` for persistence failures, and `Error` for everything
//! a session operation can hand back to the frontend.

use thiserror::Error;

/// Credential validation failure
///
/// Raised before any backend call is attempted. The frontend runs the same
/// checks up front; components do not trust it and re-check.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Username or password is empty after trimming
    #[error("username and password are both required")]
    MissingField,

    /// Password is not exactly four ASCII digits
    #[error("password must be a 4-digit number")]
    MalformedPassword,
}

/// Failure of a backend capability call
#[derive(Debug, Error)]
pub enum BackendError {
    /// A reachable backend rejected the username/password pair
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Network error, non-2xx status, unparseable body, or an explicit
    /// `error` payload. This variant is the local-fallback trigger.
    #[error("remote API unavailable: {0}")]
    RemoteUnavailable(String),

    /// The embedded store failed at the storage layer
    #[error("local store failure: {0}")]
    Store(#[from] redb::Error),

    /// A stored or received record could not be (de)serialized
    #[error("record serialization failure: {0}")]
    Codec(#[from] serde_json::Error),
}

// redb reports a distinct error type per operation; funnel them all into the
// umbrella `redb::Error` the way `init_db` already returns it.
impl From<redb::TransactionError> for BackendError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::TableError> for BackendError {
    fn from(err: redb::TableError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::StorageError> for BackendError {
    fn from(err: redb::StorageError) -> Self {
        Self::Store(err.into())
    }
}

impl From<redb::CommitError> for BackendError {
    fn from(err: redb::CommitError) -> Self {
        Self::Store(err.into())
    }
}

/// Top-level error for session and link operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A session operation was invoked while logged out
    #[error("no user is logged in")]
    NotLoggedIn,

    /// The in-flight gate refused a duplicate operation
    #[error("operation already in progress: {0}")]
    OperationInFlight(String),
}

impl Error {
    /// True when the failure is a credential rejection rather than an
    /// infrastructure problem.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, Self::Backend(BackendError::InvalidCredentials))
    }
}
