//! Data service client
//!
//! The data service owns durable storage and exposes two operations: fetch
//! the whole snapshot and replace it wholesale. [`HttpDataService`] talks to
//! the REST endpoint; `FileStore` in the server module implements the same
//! trait against a local file.

use crate::error::{Error, Result};
use crate::roster::types::Snapshot;
use async_trait::async_trait;
use std::time::Duration;

/// Fetch-all / replace-all storage backend
#[async_trait]
pub trait DataService: Send + Sync {
    /// Read the full snapshot; missing collections come back empty
    async fn fetch(&self) -> Result<Snapshot>;

    /// Overwrite durable state with `snapshot`
    async fn replace(&self, snapshot: &Snapshot) -> Result<()>;
}

/// REST client for the `/api/data` endpoint
pub struct HttpDataService {
    client: reqwest::Client,
    url: String,
}

impl HttpDataService {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn fetch(&self) -> Result<Snapshot> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Service(format!(
                "GET {} returned {}",
                self.url, status
            )));
        }

        response
            .json::<Snapshot>()
            .await
            .map_err(|e| Error::Service(format!("Failed to parse snapshot: {}", e)))
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<()> {
        let response = self.client.post(&self.url).json(snapshot).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Service(format!(
                "POST {} returned {}: {}",
                self.url, status, body
            )));
        }

        Ok(())
    }
}
