/// TMDB metadata provider implementation.
use super::tmdb_types::TmdbEpisode;
use super::{MetadataProvider, MetadataRetrievalError, UNKNOWN_EPISODE};
use crate::fetcher::{FetchError, Fetcher, HttpRequest};
use url::Url;

/// Metadata provider for the TMDB v3 API.
///
/// Authenticates with a bearer token (the "API read access token") and
/// reads episode names in English.
pub struct TmdbProvider {
    fetcher: Fetcher,
    base_url: String,
    credential: String,
}

impl TmdbProvider {
    /// Creates a new TMDB provider using the given fetcher for all requests.
    pub fn new(fetcher: Fetcher, credential: impl Into<String>) -> Self {
        Self::with_base_url(fetcher, credential, "https://api.themoviedb.org/3")
    }

    /// Creates a provider talking to a different API root.
    pub fn with_base_url(
        fetcher: Fetcher,
        credential: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credential: credential.into(),
        }
    }

    /// Adds the authentication headers to a GET request.
    fn authorized_get(&self, url: &str) -> HttpRequest {
        HttpRequest::get(url)
            .header("Authorization", &format!("Bearer {}", self.credential))
            .header("accept", "application/json")
    }
}

/// True if the error is the service answering with a non-success status.
fn is_rejection(error: &FetchError) -> bool {
    match error {
        FetchError::Status { .. } => true,
        FetchError::RetriesExhausted { last, .. } => is_rejection(last),
        _ => false,
    }
}

impl MetadataProvider for TmdbProvider {
    fn validate_credential(&self) -> Result<bool, MetadataRetrievalError> {
        let request = self.authorized_get(&format!("{}/account", self.base_url));

        match self.fetcher.execute(&request) {
            Ok(_) => Ok(true),
            Err(e) if is_rejection(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn episode_name(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<String, MetadataRetrievalError> {
        let endpoint = format!(
            "{}/tv/{}/season/{}/episode/{}",
            self.base_url, series_id, season, episode
        );
        let url = Url::parse_with_params(&endpoint, &[("language", "en-US")]).map_err(|e| {
            FetchError::InvalidUrl {
                url: endpoint.clone(),
                message: e.to_string(),
            }
        })?;

        let tmdb_episode: TmdbEpisode = self.fetcher.execute_json(&self.authorized_get(url.as_str()))?;

        Ok(tmdb_episode
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_EPISODE.to_string()))
    }
}
