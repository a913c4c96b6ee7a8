//! Adapters for a hosted PostgREST table and GoTrue-style auth service.
//!
//! Both talk JSON over HTTPS. Store calls are made with the signed-in user's
//! bearer token so row-level policies scope every query to its owner.

mod auth;
mod store;

pub use auth::RestAuth;
pub use store::RestCharacterStore;

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::infrastructure::settings::SyncConfig;

/// Timeout for every hosted call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection details shared by the store and auth adapters.
#[derive(Debug, Clone)]
pub struct RestEndpoint {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("No store URL configured")]
    MissingUrl,
    #[error("Invalid store URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl RestEndpoint {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, EndpointError> {
        // join() drops the last path segment unless the base ends with '/'
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|source| EndpointError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, EndpointError> {
        let url = config.store_url.as_deref().ok_or(EndpointError::MissingUrl)?;
        Self::new(url, config.store_key.as_deref().unwrap_or_default())
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    /// Attach the API key and bearer token. Falls back to the API key as the
    /// bearer when no user token is available.
    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(token.unwrap_or(&self.api_key))
    }
}
