//! In-memory remote for lifecycle tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use futures::StreamExt;

use crate::catalog::{Catalog, CatalogEntry};
use crate::core::{CmamError, Result};
use crate::fetch::StreamingDigest;
use crate::release::{AssetInfo, ReleaseDescriptor};
use crate::transport::{ArtifactStream, ArtifactTransport, CatalogTransport, ReleaseTransport};

const CHUNK_SIZE: usize = 4;

/// How a published release advertises its checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumMode {
    /// The real digest of the bytes.
    Correct,
    /// No checksum.
    Missing,
    /// A fixed, usually wrong, checksum string.
    Fixed(String),
}

#[derive(Debug, Clone)]
enum CatalogState {
    Available,
    Unreachable,
    Malformed,
}

#[derive(Debug)]
struct State {
    catalog: BTreeMap<String, CatalogEntry>,
    catalog_state: CatalogState,
    releases: HashMap<String, Vec<ReleaseDescriptor>>,
    latest: HashMap<String, String>,
    artifacts: HashMap<String, Vec<u8>>,
    truncated: HashMap<String, usize>,
    r#unsized: HashSet<String>,
    redirected_tags: HashMap<(String, String), String>,
    failing_locators: HashSet<String>,
    offline: bool,
    downloads: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            catalog: BTreeMap::new(),
            catalog_state: CatalogState::Available,
            releases: HashMap::new(),
            latest: HashMap::new(),
            artifacts: HashMap::new(),
            truncated: HashMap::new(),
            r#unsized: HashSet::new(),
            redirected_tags: HashMap::new(),
            failing_locators: HashSet::new(),
            offline: false,
            downloads: Vec::new(),
        }
    }
}

/// Catalog, releases and artifacts held in memory.
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another and change the remote between operations.
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<State>>,
}

impl MockRemote {
    /// Empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Add a catalog entry.
    pub fn add_app(&self, name: &str, locator: &str) {
        self.add_app_with_description(name, locator, None);
    }

    /// Add a catalog entry with a description.
    pub fn add_app_with_description(&self, name: &str, locator: &str, description: Option<&str>) {
        self.state().catalog.insert(
            name.to_string(),
            CatalogEntry {
                name: name.to_string(),
                source_locator: locator.to_string(),
                description: description.map(str::to_string),
            },
        );
    }

    /// Drop a catalog entry.
    pub fn remove_app(&self, name: &str) {
        self.state().catalog.remove(name);
    }

    /// Publish `bytes` as release `v<version>` of `locator` with a correct
    /// checksum and make it the latest. Returns the tagged digest.
    pub fn publish(&self, locator: &str, version: &str, bytes: &[u8]) -> String {
        self.publish_with(locator, version, bytes, ChecksumMode::Correct)
    }

    /// Publish with explicit checksum behavior. Returns the real digest.
    pub fn publish_with(
        &self,
        locator: &str,
        version: &str,
        bytes: &[u8],
        checksum: ChecksumMode,
    ) -> String {
        let mut digest = StreamingDigest::new();
        digest.update(bytes);
        let digest = digest.finalize();

        let tag = format!("v{version}");
        let repo = locator.rsplit('/').next().unwrap_or(locator);
        let filename = format!("{repo}.exe");
        let url = Self::artifact_url(locator, version);

        let expected_checksum = match checksum {
            ChecksumMode::Correct => Some(digest.clone()),
            ChecksumMode::Missing => None,
            ChecksumMode::Fixed(value) => Some(value),
        };
        let release = ReleaseDescriptor {
            tag: tag.clone(),
            assets: vec![
                AssetInfo {
                    filename: "README.md".to_string(),
                    download_url: format!("{url}.readme"),
                    expected_checksum: None,
                },
                AssetInfo {
                    filename,
                    download_url: url.clone(),
                    expected_checksum,
                },
            ],
        };

        let mut state = self.state();
        let releases = state.releases.entry(locator.to_string()).or_default();
        releases.retain(|r| r.tag != tag);
        releases.push(release);
        state.latest.insert(locator.to_string(), tag);
        state.artifacts.insert(url, bytes.to_vec());
        digest
    }

    /// Publish a raw release descriptor without touching artifacts.
    pub fn publish_release(&self, locator: &str, release: ReleaseDescriptor, latest: bool) {
        let mut state = self.state();
        if latest {
            state.latest.insert(locator.to_string(), release.tag.clone());
        }
        let releases = state.releases.entry(locator.to_string()).or_default();
        releases.retain(|r| r.tag != release.tag);
        releases.push(release);
    }

    /// Serve `bytes` at `url`.
    pub fn serve(&self, url: &str, bytes: &[u8]) {
        self.state().artifacts.insert(url.to_string(), bytes.to_vec());
    }

    /// Point "latest" of `locator` at `v<version>`.
    pub fn set_latest(&self, locator: &str, version: &str) {
        self.state().latest.insert(locator.to_string(), format!("v{version}"));
    }

    /// Download URL used by [`publish`](Self::publish).
    #[must_use]
    pub fn artifact_url(locator: &str, version: &str) -> String {
        let repo = locator.rsplit('/').next().unwrap_or(locator);
        format!("https://mock.invalid/{locator}/releases/download/v{version}/{repo}.exe")
    }

    /// Cut the artifact of `locator` `v<version>` off after `keep` bytes while
    /// still advertising its full length.
    pub fn truncate_artifact(&self, locator: &str, version: &str, keep: usize) {
        self.state().truncated.insert(Self::artifact_url(locator, version), keep);
    }

    /// Serve `url` without advertising its length.
    pub fn hide_length(&self, url: &str) {
        self.state().r#unsized.insert(url.to_string());
    }

    /// Answer lookups of tag `v<requested>` with release `v<served>`.
    pub fn redirect_tag(&self, locator: &str, requested: &str, served: &str) {
        self.state().redirected_tags.insert(
            (locator.to_string(), format!("v{requested}")),
            format!("v{served}"),
        );
    }

    /// Make release lookups for `locator` fail with a transport error.
    pub fn fail_releases(&self, locator: &str) {
        self.state().failing_locators.insert(locator.to_string());
    }

    /// Make the catalog fetch fail as unreachable.
    pub fn make_catalog_unreachable(&self) {
        self.state().catalog_state = CatalogState::Unreachable;
    }

    /// Make the catalog payload unparsable.
    pub fn make_catalog_malformed(&self) {
        self.state().catalog_state = CatalogState::Malformed;
    }

    /// Toggle reachability checks.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// URLs downloaded so far, in order.
    #[must_use]
    pub fn downloads(&self) -> Vec<String> {
        self.state().downloads.clone()
    }
}

impl CatalogTransport for MockRemote {
    async fn fetch_catalog(&self) -> Result<Catalog> {
        let state = self.state();
        match state.catalog_state {
            CatalogState::Unreachable => Err(CmamError::CatalogUnavailable {
                reason: "connection refused".to_string(),
            }),
            CatalogState::Malformed => Catalog::from_json("{ not json"),
            CatalogState::Available => {
                Ok(Catalog::from_entries(state.catalog.values().cloned()))
            }
        }
    }

    async fn catalog_reachable(&self) -> bool {
        let state = self.state();
        !state.offline && !matches!(state.catalog_state, CatalogState::Unreachable)
    }
}

impl ReleaseTransport for MockRemote {
    async fn latest_release(&self, locator: &str) -> Result<Option<ReleaseDescriptor>> {
        let tag = {
            let state = self.state();
            if state.failing_locators.contains(locator) {
                return Err(CmamError::transport(
                    format!("fetching release of {locator}"),
                    "server returned 502 Bad Gateway",
                ));
            }
            match state.latest.get(locator) {
                Some(tag) => tag.clone(),
                None => return Ok(None),
            }
        };
        self.release_by_tag(locator, &tag).await
    }

    async fn release_by_tag(&self, locator: &str, tag: &str) -> Result<Option<ReleaseDescriptor>> {
        let state = self.state();
        if state.failing_locators.contains(locator) {
            return Err(CmamError::transport(
                format!("fetching release of {locator}"),
                "server returned 502 Bad Gateway",
            ));
        }
        let tag = state
            .redirected_tags
            .get(&(locator.to_string(), tag.to_string()))
            .map_or(tag, String::as_str);
        Ok(state
            .releases
            .get(locator)
            .and_then(|releases| releases.iter().find(|r| r.tag == tag).cloned()))
    }

    async fn remote_reachable(&self) -> bool {
        !self.state().offline
    }
}

impl ArtifactTransport for MockRemote {
    async fn open_artifact(&self, url: &str) -> Result<ArtifactStream> {
        let mut state = self.state();
        let bytes = state
            .artifacts
            .get(url)
            .cloned()
            .ok_or_else(|| CmamError::transport("downloading artifact", "server returned 404"))?;
        state.downloads.push(url.to_string());

        let total_len = (!state.r#unsized.contains(url)).then_some(bytes.len() as u64);
        let served = match state.truncated.get(url) {
            Some(keep) => bytes[..(*keep).min(bytes.len())].to_vec(),
            None => bytes,
        };

        let chunks: Vec<Result<Bytes>> =
            served.chunks(CHUNK_SIZE).map(|c| Ok(Bytes::copy_from_slice(c))).collect();
        Ok(ArtifactStream {
            total_len,
            chunks: futures::stream::iter(chunks).boxed(),
        })
    }
}
