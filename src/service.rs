//! Link lifecycle orchestration
//!
//! Owns referral-code generation and the create/load/delete flows. All
//! persistence goes through the backend capability interface, so the same
//! service runs against the remote API, the local store, or the fallback
//! composition of both.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::info;

use crate::backend::LinkBackend;
use crate::error::Error;
use crate::model::{tagged_id, Link, LinkStatus, User};
use crate::ui::{BusyGuard, Frontend};

/// Characters a referral code draws from
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a readable referral code: 12 random characters from `[A-Z0-9]`
/// grouped as `XXXX-XXXX-XXXX`.
///
/// Not cryptographically secure, and no uniqueness check is made against
/// existing codes. Collisions are unlikely (36^12 combinations) but possible.
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    let mut code = String::with_capacity(14);

    for i in 0..12 {
        if i > 0 && i % 4 == 0 {
            code.push('-');
        }
        code.push(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char);
    }

    code
}

/// Create/fetch/delete orchestration for referral links
pub struct LinkService {
    backend: Arc<dyn LinkBackend>,
    download_base: String,
}

impl LinkService {
    /// `download_base` is the URL prefix referral codes are appended to,
    /// e.g. "www.newservice.com/download".
    pub fn new(backend: Arc<dyn LinkBackend>, download_base: impl Into<String>) -> Self {
        Self {
            backend,
            download_base: download_base.into(),
        }
    }

    /// Builds the public download URL for a referral code.
    fn download_url(&self, referral_code: &str) -> String {
        format!("{}/{}", self.download_base.trim_end_matches('/'), referral_code)
    }

    /// Creates and persists a fresh link for `user`.
    ///
    /// The draft starts with zeroed counters and `Active` status. Whichever
    /// backend takes the write is responsible for retiring any prior active
    /// link, so one user never holds two active links.
    pub async fn create_link(&self, user: &User) -> Result<Link, Error> {
        let referral_code = generate_referral_code();
        let draft = Link {
            id: tagged_id("link"),
            user_id: user.id.clone(),
            referral_code: referral_code.clone(),
            download_url: self.download_url(&referral_code),
            status: LinkStatus::Active,
            download_count: 0,
            install_count: 0,
            reward_amount: 0.0,
            created_at: Utc::now(),
        };

        let stored = self.backend.create_link(&draft).await?;
        info!(user_id = %user.id, referral_code = %stored.referral_code, "created referral link");
        Ok(stored)
    }

    /// Fetches the user's current link.
    ///
    /// A soft-deleted record reads the same as no record: both mean the
    /// dashboard should offer to create one.
    pub async fn load_active_link(&self, user_id: &str) -> Result<Option<Link>, Error> {
        let link = self.backend.get_link(user_id).await?;
        Ok(link.filter(Link::is_active))
    }

    /// Soft-deletes `link` after asking the frontend for confirmation.
    ///
    /// Returns `Ok(false)` when the user declines; nothing changes then, and
    /// the busy indicator is never engaged.
    pub async fn delete_link(&self, link: &Link, frontend: &dyn Frontend) -> Result<bool, Error> {
        if !frontend.confirm("Really delete this referral link?") {
            return Ok(false);
        }

        let _busy = BusyGuard::engage(frontend);
        self.backend.update_status(&link.id, LinkStatus::Deleted).await?;
        info!(link_id = %link.id, "referral link soft-deleted");
        Ok(true)
    }
}
