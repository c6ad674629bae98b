//! Backend capability interface and the remote-to-local fallback
//!
//! Everything the dashboard needs from persistence fits four capabilities:
//! authenticate a user, fetch a user's link, store a new link, change a
//! link's status. `RemoteBackend` and `LocalBackend` both implement the full
//! set; [`FallbackBackend`] composes them so "try remote, fall back to
//! local" is a named strategy instead of control flow scattered through the
//! callers.

use async_trait::async_trait;
use tracing::warn;

use crate::error::BackendError;
use crate::model::{Link, LinkStatus, User};

/// The four persistence capabilities of the dashboard
#[async_trait]
pub trait LinkBackend: Send + Sync {
    /// Authenticates a user. The local implementation creates the account on
    /// first use; the remote one only verifies.
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError>;

    /// Fetches the most recent link for a user, `None` when there is none.
    async fn get_link(&self, user_id: &str) -> Result<Option<Link>, BackendError>;

    /// Persists a draft link and returns the stored record.
    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError>;

    /// Transitions a link's status.
    async fn update_status(&self, link_id: &str, status: LinkStatus)
        -> Result<(), BackendError>;
}

/// Two-tier backend: remote first, local on [`BackendError::RemoteUnavailable`]
///
/// Only `RemoteUnavailable` triggers the second tier. A credential rejection
/// from a reachable remote passes straight through.
pub struct FallbackBackend<R, L> {
    remote: R,
    local: L,
}

impl<R: LinkBackend, L: LinkBackend> FallbackBackend<R, L> {
    pub fn new(remote: R, local: L) -> Self {
        Self { remote, local }
    }
}

#[async_trait]
impl<R: LinkBackend, L: LinkBackend> LinkBackend for FallbackBackend<R, L> {
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError> {
        match self.remote.auth(username, password).await {
            Err(BackendError::RemoteUnavailable(reason)) => {
                warn!(%reason, "auth falling back to local store");
                self.local.auth(username, password).await
            }
            other => other,
        }
    }

    async fn get_link(&self, user_id: &str) -> Result<Option<Link>, BackendError> {
        match self.remote.get_link(user_id).await {
            Err(BackendError::RemoteUnavailable(reason)) => {
                warn!(%reason, "link lookup falling back to local store");
                self.local.get_link(user_id).await
            }
            other => other,
        }
    }

    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError> {
        match self.remote.create_link(draft).await {
            Err(BackendError::RemoteUnavailable(reason)) => {
                warn!(%reason, "link creation falling back to local store");
                self.local.create_link(draft).await
            }
            other => other,
        }
    }

    async fn update_status(
        &self,
        link_id: &str,
        status: LinkStatus,
    ) -> Result<(), BackendError> {
        match self.remote.update_status(link_id, status).await {
            Err(BackendError::RemoteUnavailable(reason)) => {
                warn!(%reason, "status update falling back to local store");
                self.local.update_status(link_id, status).await
            }
            other => other,
        }
    }
}
