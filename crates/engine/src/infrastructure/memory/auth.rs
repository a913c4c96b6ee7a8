//! In-memory auth service.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use charsheet_domain::UserId;

use crate::infrastructure::ports::{AuthError, AuthPort, AuthSession};

struct Account {
    user_id: UserId,
    password: String,
    confirmed: bool,
}

/// Accounts keyed by email.
///
/// With `require_confirmation` set, sign-up issues no session and the
/// account cannot sign in until [`InMemoryAuth::confirm`] is called.
pub struct InMemoryAuth {
    accounts: RwLock<HashMap<String, Account>>,
    require_confirmation: bool,
    session: watch::Sender<Option<AuthSession>>,
}

impl InMemoryAuth {
    pub fn new(require_confirmation: bool) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: RwLock::new(HashMap::new()),
            require_confirmation,
            session,
        }
    }

    pub async fn confirm(&self, email: &str) -> bool {
        match self.accounts.write().await.get_mut(&normalize(email)) {
            Some(account) => {
                account.confirmed = true;
                true
            }
            None => false,
        }
    }

    fn open_session(&self, user_id: UserId, email: &str) -> AuthSession {
        let session = AuthSession {
            user_id,
            email: Some(email.to_string()),
            access_token: Uuid::new_v4().to_string(),
        };
        self.session.send_replace(Some(session.clone()));
        session
    }
}

impl Default for InMemoryAuth {
    fn default() -> Self {
        Self::new(false)
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthPort for InMemoryAuth {
    async fn current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(self.session.borrow().clone())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthError> {
        let email = normalize(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Rejected(
                "Email and password are required".to_string(),
            ));
        }

        let user_id = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&email) {
                return Err(AuthError::Rejected("User already registered".to_string()));
            }
            let user_id = UserId::new();
            accounts.insert(
                email.clone(),
                Account {
                    user_id,
                    password: password.to_string(),
                    confirmed: !self.require_confirmation,
                },
            );
            user_id
        };

        if self.require_confirmation {
            return Ok(None);
        }
        Ok(Some(self.open_session(user_id, &email)))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize(email);
        let user_id = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&email)
                .filter(|a| a.password == password)
                .ok_or(AuthError::InvalidCredentials)?;
            if !account.confirmed {
                return Err(AuthError::Rejected("Email not confirmed".to_string()));
            }
            account.user_id
        };
        Ok(self.open_session(user_id, &email))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.session.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}
