//! Remote collaborators: catalog, release metadata and artifact bytes.
//!
//! The lifecycle engine only talks to the network through these traits, so
//! tests drive it with an in-memory remote and the CLI with
//! [`GitHubTransport`]. Implementations never retry; a failure surfaces to
//! the user, who decides whether to run the command again.
//!
//! Contracts:
//!
//! - [`CatalogTransport::fetch_catalog`] distinguishes an unreachable source
//!   ([`CmamError::CatalogUnavailable`](crate::core::CmamError::CatalogUnavailable))
//!   from a payload that cannot be parsed
//!   ([`CmamError::CatalogMalformed`](crate::core::CmamError::CatalogMalformed)).
//! - [`ReleaseTransport`] returns `Ok(None)` for a release the source does not
//!   have and `Err` for everything else.
//! - [`ArtifactTransport::open_artifact`] yields the body as a stream of
//!   chunks plus the advertised length, if any.

pub mod github;

use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::catalog::Catalog;
use crate::core::Result;
use crate::release::ReleaseDescriptor;

pub use github::GitHubTransport;

/// An artifact body being downloaded.
pub struct ArtifactStream {
    /// Advertised total length, when the source sends one
    pub total_len: Option<u64>,
    /// Body chunks in order
    pub chunks: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for ArtifactStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStream").field("total_len", &self.total_len).finish_non_exhaustive()
    }
}

/// Source of the application catalog.
pub trait CatalogTransport: Send + Sync {
    /// Fetch and parse the whole catalog.
    fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog>> + Send;

    /// Whether the catalog source answers at all.
    fn catalog_reachable(&self) -> impl Future<Output = bool> + Send;
}

/// Source of release metadata.
pub trait ReleaseTransport: Send + Sync {
    /// The latest release of `locator`, or `None` if it has none.
    fn latest_release(
        &self,
        locator: &str,
    ) -> impl Future<Output = Result<Option<ReleaseDescriptor>>> + Send;

    /// The release of `locator` tagged exactly `tag`, or `None`.
    fn release_by_tag(
        &self,
        locator: &str,
        tag: &str,
    ) -> impl Future<Output = Result<Option<ReleaseDescriptor>>> + Send;

    /// Whether the release API answers at all.
    fn remote_reachable(&self) -> impl Future<Output = bool> + Send;
}

/// Source of artifact bytes.
pub trait ArtifactTransport: Send + Sync {
    /// Start downloading `url`.
    fn open_artifact(&self, url: &str) -> impl Future<Output = Result<ArtifactStream>> + Send;
}

/// Everything the lifecycle engine needs from the outside world.
pub trait Remote: CatalogTransport + ReleaseTransport + ArtifactTransport {}

impl<T> Remote for T where T: CatalogTransport + ReleaseTransport + ArtifactTransport {}
