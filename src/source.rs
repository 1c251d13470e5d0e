//! Where the manifest comes from.
//!
//! Every fetch asks for a fresh copy; nothing is cached between loads.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use tracing::debug;
use url::Url;

use crate::error::{LoadError, Result};

/// Default manifest path, relative to the page.
pub const MANIFEST_PATH: &str = "manifest.json";

/// Produces the raw manifest body.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch the body. Any non-success outcome is a [`LoadError`].
    async fn fetch(&self) -> std::result::Result<Vec<u8>, LoadError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// HTTP settings for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: Url,
    pub manifest_path: String,
    /// No timeout unless set; a hung request leaves the status unset.
    pub timeout: Option<Duration>,
}

impl SourceConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            manifest_path: MANIFEST_PATH.to_string(),
            timeout: None,
        }
    }

    /// Resolve the manifest location against the base URL.
    pub fn manifest_url(&self) -> Result<Url> {
        Ok(self.base_url.join(&self.manifest_path)?)
    }
}

/// Fetch over HTTP with caching disabled.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: config.manifest_url()?,
        })
    }
}

#[async_trait]
impl ManifestSource for HttpSource {
    async fn fetch(&self) -> std::result::Result<Vec<u8>, LoadError> {
        debug!(url = %self.url, "fetching manifest");
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Read the manifest from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ManifestSource for FileSource {
    async fn fetch(&self) -> std::result::Result<Vec<u8>, LoadError> {
        debug!(path = %self.path.display(), "reading manifest");
        Ok(tokio::fs::read(&self.path).await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
