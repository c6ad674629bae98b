//! Data models for the referral-link dashboard
//!
//! This module defines the records exchanged with the remote API and kept in
//! the local fallback store, the wire payloads for the single-endpoint action
//! protocol, and credential validation.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Characters a generated record id draws its random suffix from
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// An account that can own a referral link
///
/// Field names serialize in camelCase to match both the remote API payloads
/// and the JSON records in the local store.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (e.g., "user_1755912345678_k3j9x2m1q")
    /// Assigned at account creation and never changed
    pub id: String,

    /// Login name
    /// The local fallback store keeps at most one account per username
    pub username: String,

    /// 4-digit numeric PIN
    pub password: String,

    /// Timestamp when this account was created
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a referral link
///
/// Links are soft-deleted: a delete is a transition to `Deleted`, never a
/// physical removal, so counter history survives.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Active,
    Deleted,
}

/// A referral/download link record
///
/// At most one link per user is `Active` at any time. The three counters are
/// owned by the remote backend and treated as read-only here; records that
/// omit them deserialize with zeros.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Unique identifier (e.g., "link_1755912345678_p8d2w9f4n")
    pub id: String,

    /// Id of the owning user
    pub user_id: String,

    /// Display code in the shape XXXX-XXXX-XXXX
    pub referral_code: String,

    /// Public download URL carrying the referral code
    pub download_url: String,

    /// Soft-delete status
    pub status: LinkStatus,

    /// Number of downloads attributed to this link
    #[serde(default)]
    pub download_count: u64,

    /// Number of completed installs attributed to this link
    #[serde(default)]
    pub install_count: u64,

    /// Accumulated reward for this link
    #[serde(default)]
    pub reward_amount: f64,

    /// Timestamp when this link was created
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// True while the link has not been soft-deleted.
    pub fn is_active(&self) -> bool {
        self.status == LinkStatus::Active
    }
}

/// Validated login credentials
///
/// Construction goes through [`Credentials::parse`], so holding a value
/// proves the input already passed validation.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Trims and validates raw form input.
    ///
    /// Username and password must be non-empty after trimming, and the
    /// password must be exactly four ASCII digits.
    ///
    /// # Example
    /// ```
    /// use refdash::model::Credentials;
    ///
    /// assert!(Credentials::parse("alice", "1234").is_ok());
    /// assert!(Credentials::parse("alice", "12a4").is_err());
    /// ```
    pub fn parse(username: &str, password: &str) -> Result<Self, ValidationError> {
        let username = username.trim();
        let password = password.trim();

        if username.is_empty() || password.is_empty() {
            return Err(ValidationError::MissingField);
        }

        if password.len() != 4 || !password.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::MalformedPassword);
        }

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Generates a prefixed record id: `{prefix}_{unix millis}_{9 random base36
/// characters}`, e.g. `link_1755912345678_p8d2w9f4n`.
pub fn tagged_id(prefix: &str) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), suffix)
}

/// Payload for the `auth` action
///
/// # Example
/// ```json
/// {
///   "action": "auth",
///   "username": "alice",
///   "password": "1234"
/// }
/// ```
#[derive(Serialize)]
pub struct AuthRequest<'a> {
    pub action: &'static str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Payload for the `createLink` action
///
/// Only these three fields travel on the wire; the remote backend builds its
/// own canonical record around them.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest<'a> {
    pub action: &'static str,
    pub user_id: &'a str,
    pub referral_code: &'a str,
    pub download_url: &'a str,
}

/// Payload for the `updateLinkStatus` action
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest<'a> {
    pub action: &'static str,
    pub link_id: &'a str,
    pub status: LinkStatus,
}
