//! Session state machine and persistence
//!
//! [`SessionController`] is the single owner of "who is logged in and which
//! link do they hold". Two states only: logged out, or logged in with an
//! optional active link. The logged-in user is persisted through
//! [`SessionStore`] so a restart restores the session without asking for
//! credentials again. An in-flight gate keyed by user and operation refuses
//! duplicate concurrent operations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use redb::{ReadableDatabase, ReadableTable};
use tracing::{debug, warn};

use crate::database::{SharedDb, TABLE_SESSION};
use crate::error::{BackendError, Error};
use crate::identity::IdentityStore;
use crate::model::{Credentials, Link, User};
use crate::service::LinkService;
use crate::ui::{BusyGuard, Frontend};

/// Fixed key the session user is stored under
pub const SESSION_KEY: &str = "currentUser";

/// Persists the logged-in user across restarts
pub struct SessionStore {
    db: SharedDb,
}

impl SessionStore {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Reads the persisted session user, if any.
    pub fn load(&self) -> Result<Option<User>, BackendError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_SESSION)?;

        match table.get(SESSION_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(raw.value())?)),
            None => Ok(None),
        }
    }

    /// Persists `user` as the session user.
    pub fn save(&self, user: &User) -> Result<(), BackendError> {
        let raw = serde_json::to_string(user)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_SESSION)?;
            table.insert(SESSION_KEY, raw.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Removes the persisted session user.
    pub fn clear(&self) -> Result<(), BackendError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_SESSION)?;
            table.remove(SESSION_KEY)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// The two session states
///
/// "Explicitly logged out" and "never logged in" are deliberately the same
/// state.
#[derive(Debug, Clone)]
pub enum SessionState {
    LoggedOut,
    LoggedIn { user: User, link: Option<Link> },
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }
}

/// In-flight operation gate
///
/// One key per user and operation. Holding a permit makes a second identical
/// operation fail fast instead of letting rapid repeat triggers duplicate
/// work.
#[derive(Default)]
struct OperationGate {
    in_flight: Mutex<HashSet<String>>,
}

impl OperationGate {
    fn begin(&self, key: String) -> Result<OperationPermit<'_>, Error> {
        let mut set = self.in_flight.lock().expect("operation gate poisoned");
        if !set.insert(key.clone()) {
            return Err(Error::OperationInFlight(key));
        }
        Ok(OperationPermit { gate: self, key })
    }
}

/// Releases the gate key on drop, on every exit path
struct OperationPermit<'a> {
    gate: &'a OperationGate,
    key: String,
}

impl Drop for OperationPermit<'_> {
    fn drop(&mut self) {
        self.gate
            .in_flight
            .lock()
            .expect("operation gate poisoned")
            .remove(&self.key);
    }
}

/// Owns the current user and link for the running session
///
/// All methods take `&self`; state sits behind a mutex that is locked only
/// for short snapshot or swap operations, never across an await.
pub struct SessionController {
    identity: IdentityStore,
    links: LinkService,
    store: SessionStore,
    frontend: Arc<dyn Frontend>,
    gate: OperationGate,
    state: Mutex<SessionState>,
}

impl SessionController {
    pub fn new(
        identity: IdentityStore,
        links: LinkService,
        store: SessionStore,
        frontend: Arc<dyn Frontend>,
    ) -> Self {
        Self {
            identity,
            links,
            store,
            frontend,
            gate: OperationGate::default(),
            state: Mutex::new(SessionState::LoggedOut),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.lock().expect("session state poisoned").clone()
    }

    /// The logged-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        match self.state() {
            SessionState::LoggedIn { user, .. } => Some(user),
            SessionState::LoggedOut => None,
        }
    }

    /// The link held by the session, if any.
    pub fn current_link(&self) -> Option<Link> {
        match self.state() {
            SessionState::LoggedIn { link, .. } => link,
            SessionState::LoggedOut => None,
        }
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().expect("session state poisoned") = next;
    }

    /// Replaces the held link, but only while the same user is still logged
    /// in. A logout or user switch during the operation discards the result.
    fn commit_link(&self, user_id: &str, link: Option<Link>) {
        let mut state = self.state.lock().expect("session state poisoned");
        if let SessionState::LoggedIn { user, link: held } = &mut *state {
            if user.id == user_id {
                *held = link;
            }
        }
    }

    /// Validates, authenticates, persists the session and enters `LoggedIn`.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, Error> {
        let creds = Credentials::parse(username, password)?;
        let _permit = self.gate.begin(format!("{}:login", creds.username))?;
        let _busy = BusyGuard::engage(self.frontend.as_ref());

        let user = self
            .identity
            .authenticate(&creds.username, &creds.password)
            .await?;
        self.store.save(&user)?;
        self.set_state(SessionState::LoggedIn {
            user: user.clone(),
            link: None,
        });

        debug!(user_id = %user.id, "session opened");
        Ok(user)
    }

    /// Restores a persisted session without re-authenticating, then loads
    /// the active link. Returns the restored user, if one was stored.
    pub async fn restore_session(&self) -> Result<Option<User>, Error> {
        let Some(user) = self.store.load()? else {
            self.set_state(SessionState::LoggedOut);
            return Ok(None);
        };

        self.set_state(SessionState::LoggedIn {
            user: user.clone(),
            link: None,
        });
        debug!(user_id = %user.id, "session restored");

        // Link loading is best-effort here; a failure leaves the session
        // restored with no link
        if let Err(err) = self.refresh_link().await {
            warn!(%err, "could not load link while restoring session");
        }

        Ok(Some(user))
    }

    /// Loads the active link for the logged-in user into the session.
    pub async fn refresh_link(&self) -> Result<Option<Link>, Error> {
        let user = self.current_user().ok_or(Error::NotLoggedIn)?;
        let _permit = self.gate.begin(format!("{}:getLink", user.id))?;
        let _busy = BusyGuard::engage(self.frontend.as_ref());

        let link = self.links.load_active_link(&user.id).await?;
        self.commit_link(&user.id, link.clone());
        Ok(link)
    }

    /// Creates a fresh link for the logged-in user and holds it.
    pub async fn create_link(&self) -> Result<Link, Error> {
        let user = self.current_user().ok_or(Error::NotLoggedIn)?;
        let _permit = self.gate.begin(format!("{}:createLink", user.id))?;
        let _busy = BusyGuard::engage(self.frontend.as_ref());

        let link = self.links.create_link(&user).await?;
        self.commit_link(&user.id, Some(link.clone()));
        Ok(link)
    }

    /// Soft-deletes the held link after confirmation.
    ///
    /// `Ok(false)` when there is nothing to delete or the user declines.
    pub async fn delete_link(&self) -> Result<bool, Error> {
        let user = self.current_user().ok_or(Error::NotLoggedIn)?;
        let Some(link) = self.current_link() else {
            return Ok(false);
        };
        let _permit = self.gate.begin(format!("{}:deleteLink", user.id))?;

        // Confirmation comes before the busy indicator; the service engages
        // it only around the actual write
        let deleted = self.links.delete_link(&link, self.frontend.as_ref()).await?;
        if deleted {
            self.commit_link(&user.id, None);
        }
        Ok(deleted)
    }

    /// Clears the persisted session and returns to `LoggedOut`.
    pub fn logout(&self) -> Result<(), Error> {
        self.store.clear()?;
        self.set_state(SessionState::LoggedOut);
        debug!("session closed");
        Ok(())
    }
}
