//! GoTrue-style password auth.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use charsheet_domain::UserId;

use super::RestEndpoint;
use crate::infrastructure::ports::{AuthError, AuthPort, AuthSession};

pub struct RestAuth {
    endpoint: RestEndpoint,
    session: watch::Sender<Option<AuthSession>>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionBody {
    access_token: Option<String>,
    user: Option<UserBody>,
}

#[derive(Deserialize)]
struct UserBody {
    id: Uuid,
    email: Option<String>,
}

/// The service has used several error shapes over time.
#[derive(Deserialize, Default)]
struct ErrorBody {
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_error(self, status: StatusCode) -> AuthError {
        if self.error_code.as_deref() == Some("invalid_credentials") {
            return AuthError::InvalidCredentials;
        }
        let text = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .unwrap_or_else(|| status.to_string());
        if text == "Invalid login credentials" {
            AuthError::InvalidCredentials
        } else {
            AuthError::Rejected(text)
        }
    }
}

impl SessionBody {
    /// `None` when the body carries no token (sign-up awaiting confirmation).
    fn into_session(self) -> Option<AuthSession> {
        let access_token = self.access_token?;
        let user = self.user?;
        Some(AuthSession {
            user_id: UserId::from_uuid(user.id),
            email: user.email,
            access_token,
        })
    }
}

impl RestAuth {
    pub fn new(endpoint: RestEndpoint) -> Self {
        let (session, _) = watch::channel(None);
        Self { endpoint, session }
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<SessionBody, AuthError> {
        let url = self
            .endpoint
            .url(path)
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let response = self
            .endpoint
            .authorize(self.endpoint.client.post(url), None)
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        read_body(response).await
    }
}

async fn read_body(response: Response) -> Result<SessionBody, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body: ErrorBody = response.json().await.unwrap_or_default();
        return Err(body.into_error(status));
    }
    response
        .json()
        .await
        .map_err(|e| AuthError::Transport(e.to_string()))
}

#[async_trait]
impl AuthPort for RestAuth {
    async fn current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(self.session.borrow().clone())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, AuthError> {
        let body = self.post_credentials("auth/v1/signup", email, password).await?;
        let session = body.into_session();
        if let Some(session) = &session {
            self.session.send_replace(Some(session.clone()));
        }
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = self
            .post_credentials("auth/v1/token?grant_type=password", email, password)
            .await?
            .into_session()
            .ok_or_else(|| AuthError::Transport("sign-in returned no session".to_string()))?;
        self.session.send_replace(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone());
        // local sign-out happens even if the service call fails
        self.session.send_replace(None);

        let Some(token) = token else {
            return Ok(());
        };
        let url = self
            .endpoint
            .url("auth/v1/logout")
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let response = self
            .endpoint
            .authorize(self.endpoint.client.post(url), Some(&token))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Remote sign-out failed");
        }
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthSession>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_body_without_token_means_confirmation() {
        let body: SessionBody = serde_json::from_value(json!({
            "id": "4f2c1d8e-9a5b-4c3d-8e7f-1a2b3c4d5e6f",
            "email": "a@b.c"
        }))
        .unwrap();
        assert!(body.into_session().is_none());
    }

    #[test]
    fn session_body_with_token_builds_session() {
        let body: SessionBody = serde_json::from_value(json!({
            "access_token": "jwt",
            "user": {"id": "4f2c1d8e-9a5b-4c3d-8e7f-1a2b3c4d5e6f", "email": "a@b.c"}
        }))
        .unwrap();
        let session = body.into_session().unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(
            session.user_id.to_string(),
            "4f2c1d8e-9a5b-4c3d-8e7f-1a2b3c4d5e6f"
        );
    }

    #[test]
    fn error_shapes_map_to_auth_errors() {
        let legacy: ErrorBody = serde_json::from_value(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        }))
        .unwrap();
        assert_eq!(
            legacy.into_error(StatusCode::BAD_REQUEST),
            AuthError::InvalidCredentials
        );

        let current: ErrorBody = serde_json::from_value(json!({
            "code": 422,
            "error_code": "user_already_exists",
            "msg": "User already registered"
        }))
        .unwrap();
        assert_eq!(
            current.into_error(StatusCode::UNPROCESSABLE_ENTITY),
            AuthError::Rejected("User already registered".into())
        );
    }
}
