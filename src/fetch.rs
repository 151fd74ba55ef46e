//! HTTP access to article pages and images.
//!
//! [`Fetcher`] is the seam the pipeline talks to; [`HttpFetcher`] implements
//! it on top of a shared `reqwest` client with a fixed User-Agent. A non-success
//! status is turned into [`FetchError::Status`] carrying the response body.
//! There is no retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, error, instrument};

use crate::error::FetchError;
use crate::utils::truncate_for_log;

/// Desktop Chrome, as the platform serves its full page to it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

const ERROR_BODY_LOG_BYTES: usize = 500;

/// Retrieves remote resources.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a page as text.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch a binary resource such as an image.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client sending `user_agent`. `timeout` bounds each request;
    /// `None` lets a request wait indefinitely.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "Response received");

        if !status.is_success() {
            let body = error_body(response.text().await);
            error!(
                %url,
                status = status.as_u16(),
                body = %truncate_for_log(&body, ERROR_BODY_LOG_BYTES),
                "Request failed"
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// Body of a failed response, or why it could not be read.
fn error_body(read: Result<String, reqwest::Error>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| FetchError::transport(url, e))
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        Ok(bytes.to_vec())
    }
}
