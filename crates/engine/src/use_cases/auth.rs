//! Login flow.
//!
//! Turns a submitted login form into an auth call and a message the view can
//! show inline. Auth failures never escape as errors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::infrastructure::ports::{AuthError, AuthPort, AuthSession};

pub const CONFIRMATION_SENT: &str = "Check your email for the confirmation link!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

/// Form contents. `confirm_password` only matters when signing up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub mode: AuthMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    SignedIn(AuthSession),
    /// Sign-up accepted; the account must be confirmed before signing in.
    ConfirmationSent { message: String },
    Failed { message: String },
}

impl LoginOutcome {
    fn failed(error: &AuthError) -> Self {
        Self::Failed {
            message: error.to_string(),
        }
    }
}

pub struct AuthUseCases {
    auth: Arc<dyn AuthPort>,
}

impl AuthUseCases {
    pub fn new(auth: Arc<dyn AuthPort>) -> Self {
        Self { auth }
    }

    pub async fn submit(&self, form: &LoginForm) -> LoginOutcome {
        match form.mode {
            AuthMode::SignIn => match self.auth.sign_in(&form.email, &form.password).await {
                Ok(session) => {
                    tracing::info!(user_id = %session.user_id, "Signed in");
                    LoginOutcome::SignedIn(session)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Sign-in failed");
                    LoginOutcome::failed(&e)
                }
            },
            AuthMode::SignUp => self.sign_up(form).await,
        }
    }

    async fn sign_up(&self, form: &LoginForm) -> LoginOutcome {
        if form.password != form.confirm_password {
            return LoginOutcome::failed(&AuthError::PasswordMismatch);
        }
        match self.auth.sign_up(&form.email, &form.password).await {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user_id, "Signed up");
                LoginOutcome::SignedIn(session)
            }
            Ok(None) => {
                tracing::info!("Sign-up awaiting email confirmation");
                LoginOutcome::ConfirmationSent {
                    message: CONFIRMATION_SENT.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sign-up failed");
                LoginOutcome::failed(&e)
            }
        }
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// The session the auth service already holds, if any.
    pub async fn restore_session(&self) -> Option<AuthSession> {
        match self.auth.current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Could not restore session");
                None
            }
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.auth.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryAuth;
    use crate::infrastructure::ports::MockAuthPort;

    fn form(mode: AuthMode, password: &str, confirm: &str) -> LoginForm {
        LoginForm {
            email: "ilvara@example.com".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
            mode,
        }
    }

    #[tokio::test]
    async fn mismatched_passwords_fail_before_any_auth_call() {
        let mut auth = MockAuthPort::new();
        auth.expect_sign_up().never();

        let outcome = AuthUseCases::new(Arc::new(auth))
            .submit(&form(AuthMode::SignUp, "secret1", "secret2"))
            .await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed {
                message: "Passwords do not match".to_string()
            }
        );
    }

    #[tokio::test]
    async fn sign_up_without_session_asks_for_confirmation() {
        let auth = Arc::new(InMemoryAuth::new(true));
        let login = AuthUseCases::new(auth.clone());

        let outcome = login
            .submit(&form(AuthMode::SignUp, "secret1", "secret1"))
            .await;
        assert_eq!(
            outcome,
            LoginOutcome::ConfirmationSent {
                message: CONFIRMATION_SENT.to_string()
            }
        );
        assert!(login.restore_session().await.is_none());

        let outcome = login
            .submit(&form(AuthMode::SignIn, "secret1", ""))
            .await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed {
                message: "Email not confirmed".to_string()
            }
        );

        auth.confirm("ilvara@example.com").await;
        let outcome = login
            .submit(&form(AuthMode::SignIn, "secret1", ""))
            .await;
        assert!(matches!(outcome, LoginOutcome::SignedIn(_)));
    }

    #[tokio::test]
    async fn wrong_password_shows_service_message() {
        let mut auth = MockAuthPort::new();
        auth.expect_sign_in()
            .returning(|_, _| Err(AuthError::InvalidCredentials));

        let outcome = AuthUseCases::new(Arc::new(auth))
            .submit(&form(AuthMode::SignIn, "nope", ""))
            .await;
        assert_eq!(
            outcome,
            LoginOutcome::Failed {
                message: "Invalid login credentials".to_string()
            }
        );
    }

    #[tokio::test]
    async fn sign_in_and_out_publish_session_changes() {
        let login = AuthUseCases::new(Arc::new(InMemoryAuth::new(false)));
        let mut sessions = login.subscribe();

        login
            .submit(&form(AuthMode::SignUp, "secret1", "secret1"))
            .await;
        sessions.changed().await.unwrap();
        let user_id = sessions.borrow_and_update().as_ref().map(|s| s.user_id);
        assert!(user_id.is_some());
        assert_eq!(login.restore_session().await.map(|s| s.user_id), user_id);

        login.sign_out().await.unwrap();
        sessions.changed().await.unwrap();
        assert!(sessions.borrow().is_none());
    }
}
