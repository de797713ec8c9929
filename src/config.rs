//! Run configuration
//!
//! The core receives everything it needs through a single [`ScrapeConfig`]
//! built by the caller before the run starts. Nothing in the core reads or
//! writes configuration files.

use crate::retry::RetryPolicy;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Season number → number of episodes in that season
pub type SeasonMap = BTreeMap<u32, u32>;

/// Worker count used when concurrency is enabled without an explicit value
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Upper bound for the worker pool
pub const MAX_WORKERS_LIMIT: usize = 20;

/// Errors in a run configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The first-episode URL is not an absolute http(s) URL
    #[error("Invalid episode URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// No seasons were requested
    #[error("At least one season with one or more episodes is required")]
    NoSeasons,

    /// A season number or episode count of zero
    #[error("Invalid season entry {season}: {episodes} episode(s)")]
    InvalidSeason { season: u32, episodes: u32 },
}

/// Which AniTown4u mirror receives the decoded embed paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorPolicy {
    /// Pick one of the mirrors at random for every link
    #[default]
    Random,
    /// Always use the first mirror
    Primary,
    /// Always use the second mirror
    Secondary,
}

/// Everything a scrape run needs
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// URL of the first episode page
    pub first_episode_url: String,
    /// Requested seasons and their episode counts
    pub seasons: SeasonMap,
    /// Whether canonical episode names are looked up
    pub metadata_enabled: bool,
    /// Bearer credential for the metadata service
    pub metadata_credential: Option<String>,
    /// Series identifier at the metadata service
    pub metadata_series_id: Option<String>,
    /// Run tasks on a worker pool instead of one after another
    pub concurrency_enabled: bool,
    /// Size of the worker pool, clamped to 1..=20
    pub max_workers: usize,
    /// Where the output document goes
    pub output_path: PathBuf,
    /// Mirror selection for the attribute-embed site
    pub mirror_policy: MirrorPolicy,
    /// Retry behaviour for every network call
    pub retry: RetryPolicy,
}

impl ScrapeConfig {
    /// Creates a sequential configuration without metadata enrichment
    pub fn new(first_episode_url: impl Into<String>, seasons: SeasonMap) -> Self {
        Self {
            first_episode_url: first_episode_url.into(),
            seasons,
            metadata_enabled: false,
            metadata_credential: None,
            metadata_series_id: None,
            concurrency_enabled: false,
            max_workers: DEFAULT_MAX_WORKERS,
            output_path: PathBuf::from("episodes.json"),
            mirror_policy: MirrorPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Total number of requested episodes
    pub fn total_episodes(&self) -> u32 {
        self.seasons.values().sum()
    }

    /// Worker count actually used for the pool
    pub fn effective_workers(&self) -> usize {
        self.max_workers.clamp(1, MAX_WORKERS_LIMIT)
    }

    /// Checks the configuration before any network activity
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUrl {
            url: self.first_episode_url.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(self.first_episode_url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https URLs are supported"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }

        if self.seasons.is_empty() {
            return Err(ConfigError::NoSeasons);
        }
        if let Some((&season, &episodes)) =
            self.seasons.iter().find(|&(&s, &e)| s == 0 || e == 0)
        {
            return Err(ConfigError::InvalidSeason { season, episodes });
        }

        Ok(())
    }
}
