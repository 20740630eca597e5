//! Object store reached over plain HTTP GET

use super::DocumentStore;
use crate::error::AgentError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

/// Public or pre-authorised bucket; keys are appended to `base_url`
#[derive(Clone)]
pub struct HttpDocumentStore {
    client: Client,
    base_url: String,
}

/// Client shared by the HTTP-backed stores
pub(super) fn pooled_client() -> Result<Client> {
    Ok(Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .timeout(Duration::from_secs(30))
        .build()?)
}

/// Turn a non-success status into a `DocumentError`
pub(super) async fn read_body(key: &str, response: reqwest::Response) -> Result<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        return Err(AgentError::DocumentError(format!(
            "GET {} returned {}",
            key, status
        )));
    }

    Ok(response.bytes().await?.to_vec())
}

impl HttpDocumentStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: pooled_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.url_for(key);
        debug!(%url, "Fetching document");

        let response = self.client.get(&url).send().await.map_err(|e| {
            error!(%url, "Document request failed: {}", e);
            AgentError::DocumentError(format!("request for {} failed: {}", key, e))
        })?;

        read_body(key, response).await
    }
}
