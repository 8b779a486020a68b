// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use bytes::Bytes;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use thiserror::Error;

use crate::config::FeedConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e)
        }
    }
}

/// Source of raw feed bodies.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Bytes, FetchError>;
}

/// Fetches the daily rate document from the central bank.
#[derive(Debug, Clone)]
pub struct CbrClient {
    client: Client,
    url: String,
    user_agent: String,
}

impl CbrClient {
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            url: config.url.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl FeedSource for CbrClient {
    async fn fetch(&self) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .post(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        // The status is not checked; a non-feed body fails at parse time.
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!(%status, bytes = body.len(), url = %self.url, "Feed response received");
        Ok(body)
    }
}
