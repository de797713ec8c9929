/// TMDB API response types for deserialization.
///
/// Only the fields the scraper reads are mirrored here.
use serde::Deserialize;

/// A single episode from the `/tv/{id}/season/{s}/episode/{e}` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbEpisode {
    /// Episode title (may be missing for unannounced episodes)
    pub name: Option<String>,
}
