//! Unit tests for link orchestration
//!
//! Covers referral-code and id generation, download URL shaping, the
//! deleted-reads-as-none rule, the confirm-then-busy delete contract, and
//! the in-flight operation gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;

use refdash::backend::LinkBackend;
use refdash::database::init_db;
use refdash::error::{BackendError, Error};
use refdash::identity::IdentityStore;
use refdash::model::{tagged_id, Link, LinkStatus, User};
use refdash::service::{generate_referral_code, LinkService};
use refdash::session::{SessionController, SessionStore};
use refdash::ui::{Frontend, Notice};

#[test]
fn test_referral_code_shape() {
    for _ in 0..200 {
        let code = generate_referral_code();
        assert_eq!(code.len(), 14);

        let groups: Vec<&str> = code.split('-').collect();
        assert_eq!(groups.len(), 3);
        for group in groups {
            assert_eq!(group.len(), 4);
            assert!(group
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }
}

#[test]
fn test_tagged_id_shape() {
    let id = tagged_id("link");
    let parts: Vec<&str> = id.split('_').collect();

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "link");
    assert!(parts[1].parse::<i64>().is_ok());
    assert_eq!(parts[2].len(), 9);
    assert!(parts[2]
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

fn test_user() -> User {
    User {
        id: "user_test_1".to_string(),
        username: "alice".to_string(),
        password: "1234".to_string(),
        created_at: Utc::now(),
    }
}

/// Backend that stores drafts in memory and counts status updates
#[derive(Default)]
struct RecordingBackend {
    drafts: Mutex<Vec<Link>>,
    status_updates: AtomicUsize,
}

#[async_trait]
impl LinkBackend for RecordingBackend {
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError> {
        Ok(User {
            id: "user_test_1".to_string(),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn get_link(&self, _user_id: &str) -> Result<Option<Link>, BackendError> {
        Ok(self.drafts.lock().unwrap().last().cloned())
    }

    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError> {
        self.drafts.lock().unwrap().push(draft.clone());
        Ok(draft.clone())
    }

    async fn update_status(
        &self,
        _link_id: &str,
        _status: LinkStatus,
    ) -> Result<(), BackendError> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_created_link_carries_download_url() {
    let backend = Arc::new(RecordingBackend::default());
    let service = LinkService::new(backend.clone(), "www.newservice.com/download");

    let link = service.create_link(&test_user()).await.expect("create failed");
    assert_eq!(
        link.download_url,
        format!("www.newservice.com/download/{}", link.referral_code)
    );
    assert!(link.id.starts_with("link_"));
    assert!(link.is_active());
    assert_eq!(link.download_count, 0);
    assert_eq!(link.install_count, 0);
    assert_eq!(link.reward_amount, 0.0);

    // A trailing slash on the base changes nothing
    let service = LinkService::new(backend, "www.newservice.com/download/");
    let link = service.create_link(&test_user()).await.expect("create failed");
    assert_eq!(
        link.download_url,
        format!("www.newservice.com/download/{}", link.referral_code)
    );
}

/// Backend whose lookup always answers with a soft-deleted record
struct DeletedLinkBackend;

#[async_trait]
impl LinkBackend for DeletedLinkBackend {
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError> {
        Ok(User {
            id: "user_test_1".to_string(),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn get_link(&self, user_id: &str) -> Result<Option<Link>, BackendError> {
        Ok(Some(Link {
            id: "link_old".to_string(),
            user_id: user_id.to_string(),
            referral_code: "OLDD-OLDD-OLDD".to_string(),
            download_url: "www.newservice.com/download/OLDD-OLDD-OLDD".to_string(),
            status: LinkStatus::Deleted,
            download_count: 3,
            install_count: 1,
            reward_amount: 0.5,
            created_at: Utc::now(),
        }))
    }

    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError> {
        Ok(draft.clone())
    }

    async fn update_status(
        &self,
        _link_id: &str,
        _status: LinkStatus,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_deleted_record_reads_as_no_link() {
    let service = LinkService::new(Arc::new(DeletedLinkBackend), "www.newservice.com/download");

    let link = service
        .load_active_link("user_test_1")
        .await
        .expect("load failed");
    assert!(link.is_none());
}

/// Frontend that records busy transitions and answers confirm with a preset
struct RecordingFrontend {
    accept: bool,
    busy_calls: Mutex<Vec<bool>>,
    confirms: AtomicUsize,
}

impl RecordingFrontend {
    fn new(accept: bool) -> Self {
        Self {
            accept,
            busy_calls: Mutex::new(Vec::new()),
            confirms: AtomicUsize::new(0),
        }
    }
}

impl Frontend for RecordingFrontend {
    fn notify(&self, _notice: Notice, _message: &str) {}

    fn set_busy(&self, busy: bool) {
        self.busy_calls.lock().unwrap().push(busy);
    }

    fn confirm(&self, _question: &str) -> bool {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        self.accept
    }
}

#[tokio::test]
async fn test_declined_delete_changes_nothing() {
    let backend = Arc::new(RecordingBackend::default());
    let service = LinkService::new(backend.clone(), "www.newservice.com/download");
    let frontend = RecordingFrontend::new(false);

    let link = service.create_link(&test_user()).await.expect("create failed");
    let deleted = service
        .delete_link(&link, &frontend)
        .await
        .expect("delete failed");

    assert!(!deleted);
    assert_eq!(frontend.confirms.load(Ordering::SeqCst), 1);
    // No write happened and the busy indicator never engaged
    assert_eq!(backend.status_updates.load(Ordering::SeqCst), 0);
    assert!(frontend.busy_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_accepted_delete_pairs_busy_on_and_off() {
    let backend = Arc::new(RecordingBackend::default());
    let service = LinkService::new(backend.clone(), "www.newservice.com/download");
    let frontend = RecordingFrontend::new(true);

    let link = service.create_link(&test_user()).await.expect("create failed");
    let deleted = service
        .delete_link(&link, &frontend)
        .await
        .expect("delete failed");

    assert!(deleted);
    assert_eq!(backend.status_updates.load(Ordering::SeqCst), 1);
    assert_eq!(*frontend.busy_calls.lock().unwrap(), vec![true, false]);
}

/// Backend that fails every capability call
struct FailingBackend;

#[async_trait]
impl LinkBackend for FailingBackend {
    async fn auth(&self, _username: &str, _password: &str) -> Result<User, BackendError> {
        Err(BackendError::RemoteUnavailable("down".to_string()))
    }

    async fn get_link(&self, _user_id: &str) -> Result<Option<Link>, BackendError> {
        Err(BackendError::RemoteUnavailable("down".to_string()))
    }

    async fn create_link(&self, _draft: &Link) -> Result<Link, BackendError> {
        Err(BackendError::RemoteUnavailable("down".to_string()))
    }

    async fn update_status(
        &self,
        _link_id: &str,
        _status: LinkStatus,
    ) -> Result<(), BackendError> {
        Err(BackendError::RemoteUnavailable("down".to_string()))
    }
}

#[tokio::test]
async fn test_busy_indicator_released_on_failure() {
    let service = LinkService::new(Arc::new(FailingBackend), "www.newservice.com/download");
    let frontend = RecordingFrontend::new(true);

    let link = Link {
        id: "link_doomed".to_string(),
        user_id: "user_test_1".to_string(),
        referral_code: "AAAA-BBBB-CCCC".to_string(),
        download_url: "www.newservice.com/download/AAAA-BBBB-CCCC".to_string(),
        status: LinkStatus::Active,
        download_count: 0,
        install_count: 0,
        reward_amount: 0.0,
        created_at: Utc::now(),
    };

    let result = service.delete_link(&link, &frontend).await;
    assert!(result.is_err());

    // The indicator still came back off
    assert_eq!(*frontend.busy_calls.lock().unwrap(), vec![true, false]);
}

/// Backend that sleeps inside create so two calls can overlap
struct SlowBackend;

#[async_trait]
impl LinkBackend for SlowBackend {
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError> {
        Ok(User {
            id: "user_slow_1".to_string(),
            username: username.to_string(),
            password: password.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn get_link(&self, _user_id: &str) -> Result<Option<Link>, BackendError> {
        Ok(None)
    }

    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(draft.clone())
    }

    async fn update_status(
        &self,
        _link_id: &str,
        _status: LinkStatus,
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Helper function to wire a controller around an arbitrary backend
fn build_controller(backend: Arc<dyn LinkBackend>, temp_db: &NamedTempFile) -> SessionController {
    let db = Arc::new(
        init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database"),
    );

    SessionController::new(
        IdentityStore::new(backend.clone()),
        LinkService::new(backend, "www.newservice.com/download"),
        SessionStore::new(db),
        Arc::new(RecordingFrontend::new(true)),
    )
}

#[tokio::test]
async fn test_duplicate_create_is_refused_while_in_flight() {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let controller = build_controller(Arc::new(SlowBackend), &temp_db);

    controller.login("alice", "1234").await.expect("login failed");

    let (first, second) = tokio::join!(controller.create_link(), controller.create_link());

    // Exactly one of the two calls went through
    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let failure = if first.is_err() {
        first.unwrap_err()
    } else {
        second.unwrap_err()
    };
    assert!(matches!(failure, Error::OperationInFlight(_)));

    // Once the first completes, the gate is open again
    controller.create_link().await.expect("follow-up create failed");
}

#[tokio::test]
async fn test_operations_require_login() {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let controller = build_controller(Arc::new(SlowBackend), &temp_db);

    let err = controller.create_link().await.unwrap_err();
    assert!(matches!(err, Error::NotLoggedIn));

    let err = controller.refresh_link().await.unwrap_err();
    assert!(matches!(err, Error::NotLoggedIn));

    let err = controller.delete_link().await.unwrap_err();
    assert!(matches!(err, Error::NotLoggedIn));
}
