//! Fetching for requests outside the virtual namespace.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use stagefs_core::{Content, ContentType};
use url::Url;

use crate::error::RelayError;

/// Performs an ordinary network fetch for a non-virtual request.
///
/// Implementations can use a real HTTP client or canned responses.
#[async_trait]
pub trait Passthrough: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Content, RelayError>;
}

/// Passthrough using reqwest.
pub struct ReqwestPassthrough {
    client: Client,
}

impl ReqwestPassthrough {
    /// Create a fetcher with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Config(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, RelayError> {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl Passthrough for ReqwestPassthrough {
    async fn fetch(&self, url: &Url) -> Result<Content, RelayError> {
        let failed = |e: reqwest::Error| RelayError::Passthrough {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url.clone()).send().await.map_err(failed)?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ContentType::new)
            .unwrap_or(ContentType::OCTET_STREAM);
        let body = response.bytes().await.map_err(failed)?;

        Ok(Content {
            status,
            content_type,
            body,
        })
    }
}
