/// Canonical episode names from an external metadata service.
///
/// This module provides the provider trait used to validate the service
/// credential and look up episode names, the TMDB implementation, and a
/// run-scoped cache shared by all workers.
mod cached;
mod tmdb;
mod tmdb_types;

pub use cached::CachedMetadataProvider;
pub use tmdb::TmdbProvider;

use crate::fetcher::FetchError;
use thiserror::Error;

/// Name used when the service has no usable answer for an episode
pub const UNKNOWN_EPISODE: &str = "Unknown Episode";

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(#[from] FetchError),

    /// The run configuration asks for metadata but lacks a required value
    #[error("Metadata enrichment needs a {0}")]
    MissingSetting(&'static str),
}

/// Trait for metadata providers that can resolve episode names.
///
/// Implementors are shared between worker threads.
pub trait MetadataProvider: Send + Sync {
    /// Checks whether the configured credential is accepted.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if the service rejected the credential, an error if the
    /// service could not be asked at all.
    fn validate_credential(&self) -> Result<bool, MetadataRetrievalError>;

    /// Fetches the canonical name of one episode.
    ///
    /// # Arguments
    ///
    /// * `series_id` - The series identifier at the service
    /// * `season` - Season number
    /// * `episode` - Episode number within the season
    fn episode_name(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<String, MetadataRetrievalError>;
}
