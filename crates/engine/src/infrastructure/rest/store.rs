//! Character rows in a hosted PostgREST table.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::watch;
use url::Url;

use charsheet_domain::{CharacterId, UserId};

use super::RestEndpoint;
use crate::infrastructure::ports::{
    AuthSession, CharacterStore, CharacterUpdate, NewCharacterRecord, RepoError,
    StoredCharacterRow,
};

const ROW_COLUMNS: &str = "id,name,data";

pub struct RestCharacterStore {
    endpoint: RestEndpoint,
    table: String,
    session: watch::Receiver<Option<AuthSession>>,
}

#[derive(Deserialize)]
struct InsertedRow {
    id: CharacterId,
}

impl RestCharacterStore {
    /// `session` supplies the bearer token for each call.
    pub fn new(
        endpoint: RestEndpoint,
        table: impl Into<String>,
        session: watch::Receiver<Option<AuthSession>>,
    ) -> Self {
        Self {
            endpoint,
            table: table.into(),
            session,
        }
    }

    fn table_url(
        &self,
        operation: &'static str,
        filters: &[(&str, String)],
    ) -> Result<Url, RepoError> {
        let mut url = self
            .endpoint
            .url(&format!("rest/v1/{}", self.table))
            .map_err(|e| RepoError::database(operation, e))?;
        if !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in filters {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self
            .session
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone());
        self.endpoint
            .authorize(self.endpoint.client.request(method, url), token.as_deref())
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, RepoError> {
        let response = request
            .send()
            .await
            .map_err(|e| RepoError::database(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RepoError::constraint(format!(
                "{} rejected ({}): {}",
                operation, status, body
            )));
        }
        Err(RepoError::database(operation, format!("{}: {}", status, body)))
    }

    async fn fetch_rows(
        &self,
        operation: &'static str,
        filters: &[(&str, String)],
    ) -> Result<Vec<StoredCharacterRow>, RepoError> {
        let url = self.table_url(operation, filters)?;
        self.send(operation, self.request(Method::GET, url))
            .await?
            .json()
            .await
            .map_err(RepoError::serialization)
    }
}

#[async_trait]
impl CharacterStore for RestCharacterStore {
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<StoredCharacterRow>, RepoError> {
        self.fetch_rows(
            "list_by_owner",
            &[
                ("select", ROW_COLUMNS.to_string()),
                ("user_id", format!("eq.{}", owner)),
            ],
        )
        .await
    }

    async fn get(&self, id: CharacterId) -> Result<Option<StoredCharacterRow>, RepoError> {
        let rows = self
            .fetch_rows(
                "get",
                &[
                    ("select", ROW_COLUMNS.to_string()),
                    ("id", format!("eq.{}", id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, record: NewCharacterRecord) -> Result<CharacterId, RepoError> {
        let url = self.table_url("insert", &[("select", "id".to_string())])?;
        let inserted: Vec<InsertedRow> = self
            .send(
                "insert",
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(&record),
            )
            .await?
            .json()
            .await
            .map_err(RepoError::serialization)?;

        inserted
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| RepoError::database("insert", "store returned no row"))
    }

    async fn update(&self, id: CharacterId, update: CharacterUpdate) -> Result<(), RepoError> {
        let url = self.table_url("update", &[("id", format!("eq.{}", id))])?;
        self.send("update", self.request(Method::PATCH, url).json(&update))
            .await?;
        Ok(())
    }

    async fn delete(&self, id: CharacterId) -> Result<(), RepoError> {
        let url = self.table_url("delete", &[("id", format!("eq.{}", id))])?;
        self.send("delete", self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}
