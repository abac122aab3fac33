//! Session state shared explicitly between views.
//!
//! A [`SessionContext`] is a cloneable handle: every clone observes the same
//! session, and subscribers are woken on each sign-in or sign-out. Views that
//! need credentials are handed a context instead of reading ambient state.

use crate::catalog::Role;
use crate::error::{CatalogError, Result};
use crate::remote::body_message;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub const LOGIN_PATH: &str = "/api/auth/login";

const SIGN_IN_FAILED: &str = "Sign-in failed. Please try again.";
const INVALID_ROLE: &str = "Invalid role. Please contact support.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// An authenticated session as returned by the login endpoint.
pub struct Session {
    pub session_id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
/// Shared, observable session slot.
pub struct SessionContext {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, session: Session) {
        info!(email = %session.email, role = session.role.as_str(), "signed in");
        self.tx.send_replace(Some(session));
    }

    /// Clear the session, returning the one that was active.
    pub fn sign_out(&self) -> Option<Session> {
        let previous = self.tx.send_replace(None);
        if let Some(session) = &previous {
            info!(email = %session.email, "signed out");
        }
        previous
    }

    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|s| s.session_id.clone())
    }

    /// Receiver that observes every later sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    role: String,
    email: String,
    session_id: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the session login endpoint.
#[derive(Clone)]
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn login_url(&self) -> String {
        format!("{}{LOGIN_PATH}", self.base_url.trim_end_matches('/'))
    }

    /// Authenticate and, on success, sign `context` in.
    ///
    /// Backend error text (`error`, then `message`) is surfaced verbatim. A
    /// successful response naming an unknown role is rejected without touching
    /// the context.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        context: &SessionContext,
    ) -> Result<Session> {
        let url = self.login_url();
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| CatalogError::transport(format!("login request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CatalogError::transport(format!("failed reading login response: {e}")))?;

        if !status.is_success() {
            debug!(%status, "login rejected");
            return Err(CatalogError::RemoteRejection {
                status: status.as_u16(),
                message: body_message(&body, &["error", "message"])
                    .unwrap_or_else(|| SIGN_IN_FAILED.to_string()),
            });
        }

        let parsed: LoginResponse = serde_json::from_slice(&body)
            .map_err(|e| CatalogError::transport(format!("invalid login response: {e}")))?;
        let role = Role::try_from(parsed.role.as_str()).map_err(|_| CatalogError::RemoteRejection {
            status: status.as_u16(),
            message: INVALID_ROLE.to_string(),
        })?;

        let session = Session {
            session_id: parsed.session_id,
            email: parsed.email,
            role,
        };
        context.sign_in(session.clone());
        Ok(session)
    }
}
