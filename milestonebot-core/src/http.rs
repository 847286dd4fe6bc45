//! HTTP client abstraction for the upstream metrics API.
//!
//! The upstream client only ever needs "GET this URL with these query
//! parameters and give me the body". Keeping that behind a trait lets the
//! metrics code be tested against canned responses without a network.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::Error;

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GETs `url` and returns the body. Non-2xx statuses are errors.
    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(concat!("MilestoneBot/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Platform(format!("Failed to build reqwest client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, Error> {
        trace!("GET {url} {query:?}");
        let resp = self.client.get(url).query(query).send().await?;

        if !resp.status().is_success() {
            let st = resp.status();
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::FetchFailed(format!("GET {url} => HTTP {st}, {txt}")));
        }

        Ok(resp.text().await?)
    }
}
