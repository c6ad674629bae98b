//! User authentication
//!
//! Thin component in front of the composed backend: re-validates credentials
//! (the frontend validates first, but is not trusted) and delegates the
//! lookup. Behind the fallback composition an unreachable remote degrades to
//! local authenticate-or-create instead of an error.

use std::sync::Arc;

use crate::backend::LinkBackend;
use crate::error::Error;
use crate::model::{Credentials, User};

/// Authenticates users against whichever backend composition it is given
pub struct IdentityStore {
    backend: Arc<dyn LinkBackend>,
}

impl IdentityStore {
    pub fn new(backend: Arc<dyn LinkBackend>) -> Self {
        Self { backend }
    }

    /// Validates the raw input, then authenticates.
    ///
    /// # Errors
    ///
    /// `Validation` before any backend call when the input is malformed;
    /// `InvalidCredentials` when a reachable backend rejects the pair.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, Error> {
        let creds = Credentials::parse(username, password)?;
        let user = self.backend.auth(&creds.username, &creds.password).await?;
        Ok(user)
    }
}
