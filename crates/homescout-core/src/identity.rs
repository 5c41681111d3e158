// SPDX-License-Identifier: AGPL-3.0
// Homescout Core - Identity provider seam

use crate::types::{AppError, Session};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Kind of authentication state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Notification delivered whenever the provider's session changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthChange,
    /// The new session, or `None` after sign-out
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            kind: AuthChange::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthChange::SignedOut,
            session: None,
        }
    }
}

/// Supplies sign-in state and session change notifications
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The session the provider currently holds, if any
    async fn current_session(&self) -> Result<Option<Session>, AppError>;

    /// Subscribe to session changes, delivered in the order they occur
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), AppError>;
}
