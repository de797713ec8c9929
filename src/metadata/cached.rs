//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that
//! remembers episode names for the lifetime of one run.

use super::{MetadataProvider, MetadataRetrievalError, UNKNOWN_EPISODE};
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// A caching wrapper for metadata providers
///
/// Every worker asks the same instance. Names are keyed by
/// (season, episode); concurrent callers asking for the same key wait for a
/// single remote lookup instead of issuing their own.
pub struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    /// Resolved names, one cell per (season, episode)
    names: DashMap<(u32, u32), Arc<OnceCell<String>>>,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            names: DashMap::new(),
        }
    }

    /// Checks the credential of the underlying provider (never cached)
    pub fn validate_credential(&self) -> Result<bool, MetadataRetrievalError> {
        self.provider.validate_credential()
    }

    /// Returns the canonical name of an episode
    ///
    /// Failed lookups resolve to "Unknown Episode" and are remembered as
    /// such, so a key is sent to the service at most once per run.
    pub fn lookup(&self, series_id: &str, season: u32, episode: u32) -> String {
        // Clone the cell out so the map shard is not locked during the request
        let cell = self.names.entry((season, episode)).or_default().clone();

        cell.get_or_init(|| {
            match self.provider.episode_name(series_id, season, episode) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(
                        "Metadata lookup for S{:02}E{:02} failed: {}",
                        season,
                        episode,
                        e
                    );
                    UNKNOWN_EPISODE.to_string()
                }
            }
        })
        .clone()
    }
}
