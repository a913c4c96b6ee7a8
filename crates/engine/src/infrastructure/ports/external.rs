//! Auth service port.

use async_trait::async_trait;
use tokio::sync::watch;

use super::error::AuthError;
use super::types::AuthSession;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthPort: Send + Sync {
    /// Session restored from a previous sign-in, if any.
    async fn current_session(&self) -> Result<Option<AuthSession>, AuthError>;

    /// `Ok(None)` means the account was created but must be confirmed
    /// before a session is issued.
    async fn sign_up(&self, email: &str, password: &str)
        -> Result<Option<AuthSession>, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Session-change notifications. The current value is the live session.
    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>>;
}
