use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::error::{FeedFailure, FeedUnavailableError};
use crate::models::FeedDocument;
use crate::utils::backoff_delay;

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<FeedDocument, FeedUnavailableError>;
}

/// GeoJSON summary feed fetched over HTTP with bounded retries.
pub struct UsgsFeed {
    client: Client,
    url: String,
    timeout: Duration,
    retries: u32,
    retry_backoff: Duration,
}

impl UsgsFeed {
    pub fn new(client: Client, config: &FeedConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout(),
            retries: config.retries,
            retry_backoff: config.retry_backoff(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_once(&self) -> Result<FeedDocument, FeedFailure> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_failure(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FeedFailure::Status(status));
        }

        let body = resp.bytes().await.map_err(|e| self.transport_failure(e))?;
        let document: FeedDocument =
            serde_json::from_slice(&body).map_err(|e| FeedFailure::Decode(e.to_string()))?;
        if document.kind != "FeatureCollection" {
            return Err(FeedFailure::Decode(format!("unexpected type '{}'", document.kind)));
        }
        Ok(document)
    }

    fn transport_failure(&self, e: reqwest::Error) -> FeedFailure {
        if e.is_timeout() {
            FeedFailure::Timeout(self.timeout)
        } else {
            FeedFailure::Transport(e)
        }
    }
}

#[async_trait]
impl FeedSource for UsgsFeed {
    async fn fetch(&self) -> Result<FeedDocument, FeedUnavailableError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once().await {
                Ok(document) => {
                    let title = document.metadata.as_ref().and_then(|m| m.title.as_deref()).unwrap_or("untitled feed");
                    debug!("fetched {} features from {} ({})", document.features.len(), self.url, title);
                    return Ok(document);
                }
                Err(reason) if attempt >= self.retries => {
                    return Err(FeedUnavailableError {
                        url: self.url.clone(),
                        attempts: attempt + 1,
                        reason,
                    });
                }
                Err(reason) => {
                    let delay = backoff_delay(self.retry_backoff, attempt);
                    warn!("feed attempt {} failed ({}), retrying in {:?}", attempt + 1, reason, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
