//! Link shortening for suggestion buttons.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Turns a long page URL into a short one.
///
/// Shortening never fails from the caller's point of view: any problem
/// yields the original URL.
#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> String;
}

/// Shortener backed by an HTTP endpoint answering `GET <endpoint>?url=<long>`
/// with the short URL as plain text
pub struct TinyUrlShortener {
    client: reqwest::Client,
    endpoint: String,
}

impl TinyUrlShortener {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn try_shorten(&self, long_url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", long_url)])
            .send()
            .await?
            .error_for_status()?;

        let short = response.text().await?.trim().to_string();
        if short.is_empty() {
            anyhow::bail!("Shortener returned an empty body");
        }
        Ok(short)
    }
}

#[async_trait]
impl LinkShortener for TinyUrlShortener {
    async fn shorten(&self, long_url: &str) -> String {
        match self.try_shorten(long_url).await {
            Ok(short) => short,
            Err(e) => {
                warn!(url = long_url, error = %e, "Link shortening failed, keeping long URL");
                long_url.to_string()
            }
        }
    }
}

/// Keeps links unchanged
pub struct NoopShortener;

#[async_trait]
impl LinkShortener for NoopShortener {
    async fn shorten(&self, long_url: &str) -> String {
        long_url.to_string()
    }
}
