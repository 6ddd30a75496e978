//! GitHub-backed implementation of the transport traits.
//!
//! - Catalog: `GET <catalog_url>` with `Accept: application/vnd.github.raw`,
//!   so the contents API returns the file body instead of a base64 envelope.
//! - Releases: `GET <api>/repos/<locator>/releases/latest` and
//!   `GET <api>/repos/<locator>/releases/tags/<tag>`.
//! - Artifacts: streaming `GET` of the asset's `browser_download_url`.
//!
//! A `GITHUB_TOKEN` in the environment is sent as a bearer token to raise the
//! API rate limit.

use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ArtifactStream, ArtifactTransport, CatalogTransport, ReleaseTransport};
use crate::catalog::Catalog;
use crate::config::GlobalConfig;
use crate::constants::{API_REQUEST_TIMEOUT, CONNECT_TIMEOUT, TOKEN_ENV_VAR, USER_AGENT};
use crate::core::{CmamError, Result};
use crate::release::{AssetInfo, ReleaseDescriptor};

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    digest: Option<String>,
}

impl From<GitHubRelease> for ReleaseDescriptor {
    fn from(release: GitHubRelease) -> Self {
        Self {
            tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|asset| AssetInfo {
                    filename: asset.name,
                    download_url: asset.browser_download_url,
                    expected_checksum: asset.digest.filter(|d| !d.trim().is_empty()),
                })
                .collect(),
        }
    }
}

/// HTTP client for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubTransport {
    client: Client,
    catalog_url: String,
    api_base_url: String,
}

impl GitHubTransport {
    /// Build a transport for the given endpoints.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(catalog_url: impl Into<String>, api_base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR)
            && !token.trim().is_empty()
        {
            match HeaderValue::from_str(&format!("Bearer {}", token.trim())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Ignoring {} with invalid characters", TOKEN_ENV_VAR),
            }
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| CmamError::transport("building HTTP client", e))?;

        Ok(Self {
            client,
            catalog_url: catalog_url.into(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a transport from the user configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Self::new(config.catalog_url.clone(), config.api_base_url.clone())
    }

    async fn get_release(&self, url: String, locator: &str) -> Result<Option<ReleaseDescriptor>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json")
            .timeout(API_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| CmamError::transport(format!("fetching release of {locator}"), e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CmamError::transport(
                format!("fetching release of {locator}"),
                format!("server returned {}", response.status()),
            ));
        }

        let release: GitHubRelease = response
            .json()
            .await
            .map_err(|e| CmamError::transport(format!("reading release of {locator}"), e))?;
        Ok(Some(release.into()))
    }

    async fn ping(&self, url: &str) -> bool {
        match self.client.get(url).timeout(API_REQUEST_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("{} unreachable: {}", url, e);
                false
            }
        }
    }
}

impl CatalogTransport for GitHubTransport {
    async fn fetch_catalog(&self) -> Result<Catalog> {
        debug!("Fetching catalog from {}", self.catalog_url);
        let unavailable = |reason: String| CmamError::CatalogUnavailable { reason };

        let response = self
            .client
            .get(&self.catalog_url)
            .header(ACCEPT, "application/vnd.github.raw")
            .timeout(API_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!("server returned {}", response.status())));
        }

        let body = response.text().await.map_err(|e| unavailable(e.to_string()))?;
        Catalog::from_json(&body)
    }

    async fn catalog_reachable(&self) -> bool {
        self.ping(&self.catalog_url).await
    }
}

impl ReleaseTransport for GitHubTransport {
    async fn latest_release(&self, locator: &str) -> Result<Option<ReleaseDescriptor>> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base_url, locator);
        self.get_release(url, locator).await
    }

    async fn release_by_tag(&self, locator: &str, tag: &str) -> Result<Option<ReleaseDescriptor>> {
        let url = format!("{}/repos/{}/releases/tags/{}", self.api_base_url, locator, tag);
        self.get_release(url, locator).await
    }

    async fn remote_reachable(&self) -> bool {
        self.ping(&self.api_base_url).await
    }
}

impl ArtifactTransport for GitHubTransport {
    async fn open_artifact(&self, url: &str) -> Result<ArtifactStream> {
        debug!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| CmamError::transport("downloading artifact", e))?;

        if !response.status().is_success() {
            return Err(CmamError::transport(
                "downloading artifact",
                format!("server returned {}", response.status()),
            ));
        }

        let total_len = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| CmamError::transport("downloading artifact", e)))
            .boxed();

        Ok(ArtifactStream { total_len, chunks })
    }
}
