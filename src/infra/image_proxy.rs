//! Fetches thumbnails from CDNs that reject hot-linked requests.

use std::{collections::HashMap, time::Duration};

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, REFERER};
use thiserror::Error;
use url::Url;

use super::error::InfraError;
use super::upstream::USER_AGENT;

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ImageProxyError {
    #[error("image host `{0}` is not allowed")]
    Forbidden(String),
    #[error("image url is invalid: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("image upstream responded with status {0}")]
    Upstream(u16),
    #[error("image fetch failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct ProxiedImage {
    pub content_type: String,
    pub body: Bytes,
}

/// Allow-listed image fetcher; each host is requested with the `Referer` it expects.
pub struct ImageProxy {
    client: reqwest::Client,
    referers: HashMap<String, String>,
}

impl ImageProxy {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        Self::with_referers(timeout, default_referers())
    }

    pub fn with_referers(
        timeout: Duration,
        referers: HashMap<String, String>,
    ) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, referers })
    }

    /// Referer to present for `url`, or `Forbidden` when the host is not allow-listed.
    pub fn referer_for(&self, url: &Url) -> Result<&str, ImageProxyError> {
        let host = url.host_str().unwrap_or_default();
        self.referers
            .get(host)
            .map(String::as_str)
            .ok_or_else(|| ImageProxyError::Forbidden(host.to_string()))
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<ProxiedImage, ImageProxyError> {
        let url = Url::parse(raw_url)?;
        let referer = self.referer_for(&url)?;

        let response = self
            .client
            .get(url.clone())
            .header(REFERER, referer)
            .send()
            .await
            .map_err(|err| ImageProxyError::Transport(err.to_string()))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ImageProxyError::Upstream(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_string();
        let body = response
            .bytes()
            .await
            .map_err(|err| ImageProxyError::Transport(err.to_string()))?;

        Ok(ProxiedImage { content_type, body })
    }
}

fn default_referers() -> HashMap<String, String> {
    HashMap::from([(
        "simg.donga.com".to_string(),
        "https://mlbpark.donga.com/".to_string(),
    )])
}
