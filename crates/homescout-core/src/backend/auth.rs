// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Hosted auth client
//
// Password sign-in against the backend's auth API. The current session is
// kept in memory and, when enabled, in session.json so the next run can
// resume it. Every change is broadcast as an AuthEvent.

use super::{http_client, send};
use crate::identity::{AuthChange, AuthEvent, IdentityProvider};
use crate::settings::config_dir;
use crate::types::{AppError, AppSettings, Session};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of the auth event channel
const AUTH_CHANNEL_CAPACITY: usize = 16;

/// Refresh this many seconds before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 10;

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct TokenPayload {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserPayload,
}

impl TokenPayload {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| {
                self.expires_in
                    .map(|secs| chrono::Utc::now().timestamp() + secs)
            })
            .unwrap_or(0);

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            email: self.user.email.unwrap_or_default(),
            expires_at,
        }
    }
}

fn is_expired(session: &Session) -> bool {
    session.expires_at > 0
        && chrono::Utc::now().timestamp() >= session.expires_at - EXPIRY_MARGIN_SECS
}

/// Map auth endpoint rejections to `AppError::Auth`
fn auth_error(err: AppError) -> AppError {
    match err {
        AppError::Backend { status, message } if (400..500).contains(&status) => {
            AppError::Auth(message)
        }
        other => other,
    }
}

/// Identity provider backed by the hosted auth API
pub struct AuthClient {
    http: Client,
    auth_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    session_file: Option<PathBuf>,
}

impl AuthClient {
    /// Create a client, resuming the saved session if enabled in settings
    pub fn new(settings: &AppSettings) -> Result<Self, AppError> {
        let session_file = if settings.persist_session {
            Some(config_dir()?.join("session.json"))
        } else {
            None
        };
        Self::with_session_file(settings, session_file)
    }

    /// Create a client that keeps its session in `session_file` (or only in memory)
    pub fn with_session_file(
        settings: &AppSettings,
        session_file: Option<PathBuf>,
    ) -> Result<Self, AppError> {
        settings.validate()?;

        let session: Option<Session> = match &session_file {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(path)
                    .map_err(|e| AppError::FileIo(format!("Failed to read session: {}", e)))?;
                serde_json::from_str(&content)
                    .map_err(|e| tracing::warn!("Ignoring unreadable session file: {}", e))
                    .ok()
            }
            _ => None,
        };

        let (events, _) = broadcast::channel(AUTH_CHANNEL_CAPACITY);

        Ok(Self {
            http: http_client(settings)?,
            auth_url: format!("{}/auth/v1", settings.base_url()),
            anon_key: settings.anon_key.clone(),
            session: RwLock::new(session),
            events,
            session_file,
        })
    }

    fn stored_session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the session, persist it and notify subscribers
    fn set_session(&self, session: Option<Session>, kind: AuthChange) {
        // A panic elsewhere must not leave memory behind the file and subscribers
        *self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = session.clone();

        if let Err(e) = self.persist(session.as_ref()) {
            tracing::warn!("Failed to persist session: {}", e);
        }

        let _ = self.events.send(AuthEvent { kind, session });
    }

    fn persist(&self, session: Option<&Session>) -> Result<(), AppError> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };

        match session {
            Some(session) => {
                let content = serde_json::to_string_pretty(session).map_err(|e| {
                    AppError::Serialization(format!("Failed to serialize session: {}", e))
                })?;
                fs::write(path, content)
                    .map_err(|e| AppError::FileIo(format!("Failed to write session: {}", e)))?;
            }
            None if path.exists() => {
                fs::remove_file(path)
                    .map_err(|e| AppError::FileIo(format!("Failed to remove session: {}", e)))?;
            }
            None => {}
        }
        Ok(())
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AppError> {
        let response = send(
            self.http
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", grant_type)])
                .header("apikey", &self.anon_key)
                .json(&body),
        )
        .await
        .map_err(auth_error)?;

        let payload: TokenPayload = response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("Failed to parse session: {}", e)))?;
        Ok(payload.into_session())
    }

    /// Sign in with email and password
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let session = self
            .token_request(
                "password",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        tracing::info!("Signed in as {}", session.user_id);
        self.set_session(Some(session.clone()), AuthChange::SignedIn);
        Ok(session)
    }

    /// Register a new account
    ///
    /// Returns `None` when the backend requires email confirmation before
    /// the first sign-in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AppError> {
        let response = send(
            self.http
                .post(format!("{}/signup", self.auth_url))
                .header("apikey", &self.anon_key)
                .json(&serde_json::json!({ "email": email, "password": password })),
        )
        .await
        .map_err(auth_error)?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Serialization(format!("Failed to parse sign-up: {}", e)))?;

        if value.get("access_token").is_none() {
            tracing::info!("Sign-up for {} awaits email confirmation", email);
            return Ok(None);
        }

        let session = serde_json::from_value::<TokenPayload>(value)?.into_session();
        self.set_session(Some(session.clone()), AuthChange::SignedIn);
        Ok(Some(session))
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh_session(&self) -> Result<Session, AppError> {
        let refresh_token = self
            .stored_session()
            .map(|s| s.refresh_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Auth("No refresh token available".to_string()))?;

        let session = self
            .token_request(
                "refresh_token",
                serde_json::json!({ "refresh_token": refresh_token }),
            )
            .await?;

        tracing::debug!("Refreshed session for {}", session.user_id);
        self.set_session(Some(session.clone()), AuthChange::TokenRefreshed);
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for AuthClient {
    async fn current_session(&self) -> Result<Option<Session>, AppError> {
        match self.stored_session() {
            Some(session) if is_expired(&session) => {
                tracing::info!("Session expired, refreshing");
                self.refresh_session().await.map(Some)
            }
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let result = match self.stored_session() {
            Some(session) => send(
                self.http
                    .post(format!("{}/logout", self.auth_url))
                    .header("apikey", &self.anon_key)
                    .bearer_auth(&session.access_token),
            )
            .await
            .map(|_| ()),
            None => Ok(()),
        };

        // The local session goes away even if the server call failed
        self.set_session(None, AuthChange::SignedOut);
        result
    }
}
