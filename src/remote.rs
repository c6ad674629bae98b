//! HTTP adapter for the remote persistence API
//!
//! The remote side is a single endpoint multiplexing on an `action` field:
//! `auth`, `createLink` and `updateLinkStatus` travel as JSON POST bodies,
//! `getLink` as a GET query string. Any network error, non-2xx status or
//! unparseable body maps to [`BackendError::RemoteUnavailable`], the
//! fallback trigger. A 2xx payload carrying a truthy `error` field is an
//! explicit API rejection: invalid credentials for `auth`, unavailability
//! for the link actions.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::backend::LinkBackend;
use crate::error::BackendError;
use crate::model::{
    AuthRequest, CreateLinkRequest, Link, LinkStatus, UpdateStatusRequest, User,
};

/// Client for the single-endpoint remote API
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RemoteBackend {
    /// Builds a client for the endpoint at `base_url`.
    ///
    /// When `api_key` is set it travels as the `Authorization` header on
    /// every call.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("Authorization", key),
            None => request,
        }
    }

    /// Issues one POST action and returns the parsed JSON body.
    async fn post_action<T: Serialize>(&self, payload: &T) -> Result<Value, BackendError> {
        let request = self.apply_auth(self.client.post(&self.base_url).json(payload));
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::RemoteUnavailable(format!(
                "unexpected status {}",
                status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::RemoteUnavailable(format!("unparseable body: {}", e)))
    }
}

/// Extracts a truthy `error` field from an API payload, if present.
///
/// The API reports failures as `{"error": ...}`. A `null`, `false`, empty
/// string or zero value does not count as an error.
fn error_field(value: &Value) -> Option<String> {
    let error = value.get("error")?;
    match error {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl LinkBackend for RemoteBackend {
    async fn auth(&self, username: &str, password: &str) -> Result<User, BackendError> {
        let payload = AuthRequest {
            action: "auth",
            username,
            password,
        };
        let body = self.post_action(&payload).await?;

        // An error payload on a 2xx auth response is a credential verdict
        // from a reachable remote, not unavailability
        if let Some(reason) = error_field(&body) {
            debug!(%reason, "remote rejected credentials");
            return Err(BackendError::InvalidCredentials);
        }

        serde_json::from_value(body)
            .map_err(|e| BackendError::RemoteUnavailable(format!("malformed user record: {}", e)))
    }

    async fn get_link(&self, user_id: &str) -> Result<Option<Link>, BackendError> {
        let request = self.apply_auth(
            self.client
                .get(&self.base_url)
                .query(&[("action", "getLink"), ("userId", user_id)]),
        );
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::RemoteUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::RemoteUnavailable(format!(
                "unexpected status {}",
                status
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| BackendError::RemoteUnavailable(format!("unparseable body: {}", e)))?;

        // A JSON null body is the "no link yet" answer, not a failure
        if body.is_null() {
            return Ok(None);
        }

        if let Some(reason) = error_field(&body) {
            return Err(BackendError::RemoteUnavailable(format!("API error: {}", reason)));
        }

        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| BackendError::RemoteUnavailable(format!("malformed link record: {}", e)))
    }

    async fn create_link(&self, draft: &Link) -> Result<Link, BackendError> {
        let payload = CreateLinkRequest {
            action: "createLink",
            user_id: &draft.user_id,
            referral_code: &draft.referral_code,
            download_url: &draft.download_url,
        };
        let body = self.post_action(&payload).await?;

        if let Some(reason) = error_field(&body) {
            return Err(BackendError::RemoteUnavailable(format!("API error: {}", reason)));
        }

        // The endpoint may answer with the canonical record or merely echo
        // the request; without a full record the draft stands
        match serde_json::from_value::<Link>(body) {
            Ok(stored) => Ok(stored),
            Err(_) => Ok(draft.clone()),
        }
    }

    async fn update_status(
        &self,
        link_id: &str,
        status: LinkStatus,
    ) -> Result<(), BackendError> {
        let payload = UpdateStatusRequest {
            action: "updateLinkStatus",
            link_id,
            status,
        };
        let body = self.post_action(&payload).await?;

        if let Some(reason) = error_field(&body) {
            return Err(BackendError::RemoteUnavailable(format!("API error: {}", reason)));
        }

        Ok(())
    }
}
