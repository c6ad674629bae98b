//! Embedded fallback store
//!
//! Implements the full backend capability set against the local redb tables
//! so the dashboard keeps working when the remote API is unreachable. Link
//! writes go to both the main table and the per-user chronological index;
//! the two must never disagree, so every mutation rewrites both inside one
//! transaction.

use async_trait::async_trait;
use chrono::Utc;
use redb::{ReadableDatabase, ReadableTable};
use tracing::{debug, warn};

use crate::backend::LinkBackend;
use crate::database::{link_index_key, SharedDb, TABLE_LINKS, TABLE_LINKS_BY_USER, TABLE_USERS};
use crate::error::BackendError;
use crate::model::{tagged_id, Link, LinkStatus, User};

/// Key-value fallback store; always reachable, never remote
pub struct LocalBackend {
    db: SharedDb,
}

impl LocalBackend {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Range bounds covering every index entry of one user.
    fn user_range(user_id: &str) -> (String, String) {
        // '{' is lexicographically after ':', so this upper bound closes the
        // range without a sentinel key
        (format!("{}:", user_id), format!("{}:{{", user_id))
    }
}

#[async_trait]
impl LinkBackend for LocalBackend {
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError> {
        {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(TABLE_USERS)?;

            if let Some(raw) = table.get(username)? {
                let user: User = serde_json::from_str(raw.value())?;
                if user.password == password {
                    return Ok(user);
                }
                // One account per username: a known name with the wrong PIN
                // is a rejection, not a second account
                return Err(BackendError::InvalidCredentials);
            }
        }

        // First use of this username: create and persist the account
        let user = User {
            id: tagged_id("user"),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        };
        let raw = serde_json::to_string(&user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_USERS)?;
            table.insert(username, raw.as_str())?;
        }
        write_txn.commit()?;

        debug!(username, user_id = %user.id, "created local account");
        Ok(user)
    }

    async fn get_link(&self, user_id: &str) -> Result<Option<Link>, BackendError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS_BY_USER)?;
        let (start, end) = Self::user_range(user_id);

        // Newest record wins, whatever its status; the caller decides what a
        // deleted record means
        let newest = table
            .range(start.as_str()..end.as_str())?
            .next_back()
            .transpose()?;

        match newest {
            Some((_, raw)) => Ok(Some(serde_json::from_str(raw.value())?)),
            None => Ok(None),
        }
    }

    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut main_table = write_txn.open_table(TABLE_LINKS)?;
            let mut index_table = write_txn.open_table(TABLE_LINKS_BY_USER)?;
            let (start, end) = Self::user_range(&draft.user_id);

            // Collect the user's still-active records first; the range
            // borrow must end before the tables are written
            let mut priors: Vec<(String, Link)> = Vec::new();
            for entry in index_table.range(start.as_str()..end.as_str())? {
                let (key, raw) = entry?;
                let record: Link = serde_json::from_str(raw.value())?;
                if record.is_active() {
                    priors.push((key.value().to_string(), record));
                }
            }

            // Soft-delete priors so the new link is the only active one
            for (index_key, mut record) in priors {
                record.status = LinkStatus::Deleted;
                let raw = serde_json::to_string(&record)?;
                main_table.insert(record.id.as_str(), raw.as_str())?;
                index_table.insert(index_key.as_str(), raw.as_str())?;
                debug!(link_id = %record.id, "soft-deleted prior active link");
            }

            // Append the new record to both tables
            let raw = serde_json::to_string(draft)?;
            main_table.insert(draft.id.as_str(), raw.as_str())?;
            let index_key = link_index_key(&draft.user_id, draft.created_at.timestamp_micros());
            index_table.insert(index_key.as_str(), raw.as_str())?;
        }
        write_txn.commit()?;

        debug!(link_id = %draft.id, user_id = %draft.user_id, "stored link locally");
        Ok(draft.clone())
    }

    async fn update_status(
        &self,
        link_id: &str,
        status: LinkStatus,
    ) -> Result<(), BackendError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut main_table = write_txn.open_table(TABLE_LINKS)?;

            let existing = match main_table.get(link_id)? {
                Some(raw) => Some(serde_json::from_str::<Link>(raw.value())?),
                None => None,
            };

            match existing {
                None => {
                    // The record may only exist remotely; nothing to do here
                    warn!(link_id, "status update for a link absent from the local store");
                }
                Some(mut record) => {
                    record.status = status;
                    let raw = serde_json::to_string(&record)?;
                    main_table.insert(link_id, raw.as_str())?;

                    let index_key =
                        link_index_key(&record.user_id, record.created_at.timestamp_micros());
                    let mut index_table = write_txn.open_table(TABLE_LINKS_BY_USER)?;
                    index_table.insert(index_key.as_str(), raw.as_str())?;
                }
            }
        }
        write_txn.commit()?;

        Ok(())
    }
}
