//! linkhound - Collect stream provider links for every episode of a series
//!
//! This library provides the core functionality for generating the episode
//! pages of a series, extracting the embedded provider links from each page
//! with the strategy of the hosting site, optionally naming the episodes
//! through TMDB, and assembling everything into one ordered document.

mod config;
mod extract;
mod fetcher;
mod metadata;
mod output;
mod retry;
mod scheduler;
mod settings;
mod slug;
mod temp;
#[cfg(test)]
mod testing;

use chrono::Utc;
use extract::{Extractor, selector_for};
use metadata::{CachedMetadataProvider, TmdbProvider};
use scheduler::{ExecutionMode, TaskOutcome, run_tasks};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

// Re-export error types
pub use config::ConfigError;
pub use fetcher::{FetchError, TransportError};
pub use metadata::MetadataRetrievalError;
pub use output::OutputError;
pub use scheduler::SchedulerError;
pub use settings::SettingsError;
pub use slug::SlugError;

// Re-export the public data model
pub use config::{DEFAULT_MAX_WORKERS, MAX_WORKERS_LIMIT, MirrorPolicy, ScrapeConfig, SeasonMap};
pub use extract::{ExtractionResult, ProviderLink, Site, Strategy};
pub use fetcher::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
pub use metadata::UNKNOWN_EPISODE;
pub use output::{EpisodeRecord, RunMetadata, SeriesOutput};
pub use retry::RetryPolicy;
pub use settings::{Settings, SettingsStore};
pub use slug::{EpisodeTask, SlugPattern};

/// Progress event emitted during a scrape run
///
/// These events allow library users to track progress and provide feedback
/// while the episodes are processed.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Episode URLs were generated and the run is about to start
    Started {
        source: String,
        site: &'static str,
        total_episodes: u32,
        season_count: usize,
    },

    /// The metadata credential is being checked
    ValidatingCredential,

    /// Episode names will be looked up
    MetadataEnabled,

    /// The run continues without episode names
    MetadataDisabled { reason: String },

    /// One episode task finished; `link_count` is `None` if it was dropped
    EpisodeFinished {
        index: usize,
        total: usize,
        season: u32,
        episode: u32,
        link_count: Option<usize>,
    },

    /// All tasks finished
    Complete {
        episode_count: usize,
        total_episodes: u32,
    },
}

/// Top-level error type for linkhound operations
#[derive(Debug, Error)]
pub enum ScraperError {
    /// The run configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The episode URLs could not be generated
    #[error("URL generation error: {0}")]
    Slug(#[from] SlugError),

    /// The HTTP client could not be created
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] TransportError),

    /// The task batch was aborted
    #[error("{0}")]
    Scheduler(#[from] SchedulerError),

    /// The output document could not be written
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

impl ScraperError {
    /// True if the run ended because the user cancelled it
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScraperError::Scheduler(SchedulerError::Cancelled))
    }
}

/// Episode name lookups for the current run
struct Enrichment {
    cache: CachedMetadataProvider<TmdbProvider>,
    series_id: String,
}

/// Scrapes every requested episode of a series
///
/// This function generates the episode page URLs from the first-episode
/// URL, extracts the provider links of every page with the strategy of the
/// hosting site, optionally adds canonical episode names from TMDB, and
/// returns the assembled document. Episodes that fail or have no links are
/// left out of the document; only configuration errors and cancellation
/// abort the run.
///
/// Progress events are emitted through the provided callback, allowing
/// library users to track progress, display status, or remain silent.
///
/// # Arguments
///
/// * `config` - The run configuration
/// * `cancel` - Raised by the caller to stop the run; no document is returned then
/// * `progress_callback` - Closure called with progress events
///
/// # Examples
///
/// ```no_run
/// use linkhound::{scrape_series, ScrapeConfig};
/// use std::sync::atomic::AtomicBool;
///
/// let config = ScrapeConfig::new(
///     "https://toonstream.co/episode/some-show-1x1",
///     [(1, 12)].into_iter().collect(),
/// );
/// let cancel = AtomicBool::new(false);
///
/// let output = scrape_series(&config, &cancel, |_| {}).unwrap();
/// output.write_to(&config.output_path).unwrap();
/// ```
pub fn scrape_series<F>(
    config: &ScrapeConfig,
    cancel: &AtomicBool,
    progress_callback: F,
) -> Result<SeriesOutput, ScraperError>
where
    F: FnMut(ProgressEvent),
{
    // Fail on bad input before the HTTP client is even built
    config.validate()?;
    let transport = ReqwestTransport::new()?;
    scrape_series_with(config, Arc::new(transport), cancel, progress_callback)
}

/// Same as [`scrape_series`], over a caller-provided transport
pub fn scrape_series_with<F>(
    config: &ScrapeConfig,
    transport: Arc<dyn Transport>,
    cancel: &AtomicBool,
    mut progress_callback: F,
) -> Result<SeriesOutput, ScraperError>
where
    F: FnMut(ProgressEvent),
{
    config.validate()?;

    let site = Site::from_url(&config.first_episode_url);
    let tasks = slug::generate_episode_tasks(
        &config.first_episode_url,
        &config.seasons,
        site.slug_pattern(),
    )?;

    let source = config.first_episode_url.trim().trim_end_matches('/');
    let run_metadata = RunMetadata::new(source, &config.seasons, Utc::now());

    progress_callback(ProgressEvent::Started {
        source: source.to_string(),
        site: site.name(),
        total_episodes: run_metadata.total_episodes,
        season_count: config.seasons.len(),
    });

    let fetcher = fetcher::Fetcher::new(transport, config.retry);
    let enrichment = prepare_enrichment(config, &fetcher, &mut progress_callback);
    let extractor = Extractor::new(fetcher, selector_for(config.mirror_policy));

    let mode = if config.concurrency_enabled {
        ExecutionMode::Pool {
            workers: config.effective_workers(),
        }
    } else {
        ExecutionMode::Sequential
    };

    let total = tasks.len();
    let mut finished = 0;
    let records = run_tasks(
        &tasks,
        mode,
        cancel,
        |task| scrape_task(&extractor, enrichment.as_ref(), task),
        |outcome| {
            finished += 1;
            let (season, episode) = outcome.season_episode();
            progress_callback(ProgressEvent::EpisodeFinished {
                index: finished,
                total,
                season,
                episode,
                link_count: match outcome {
                    TaskOutcome::Completed(record) => Some(record.links.len()),
                    TaskOutcome::Dropped { .. } => None,
                },
            });
        },
    )?;

    let output = SeriesOutput::assemble(run_metadata, records);

    progress_callback(ProgressEvent::Complete {
        episode_count: output.episodes.len(),
        total_episodes: output.metadata.total_episodes,
    });

    Ok(output)
}

/// Validates the metadata credential; any problem disables enrichment
fn prepare_enrichment<F>(
    config: &ScrapeConfig,
    fetcher: &fetcher::Fetcher,
    progress_callback: &mut F,
) -> Option<Enrichment>
where
    F: FnMut(ProgressEvent),
{
    if !config.metadata_enabled {
        return None;
    }

    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let checked = non_empty(&config.metadata_credential)
        .ok_or(MetadataRetrievalError::MissingSetting("credential"))
        .and_then(|credential| {
            let series_id = non_empty(&config.metadata_series_id)
                .ok_or(MetadataRetrievalError::MissingSetting("series id"))?;
            Ok((credential, series_id))
        });

    let (credential, series_id) = match checked {
        Ok(values) => values,
        Err(e) => {
            progress_callback(ProgressEvent::MetadataDisabled {
                reason: e.to_string(),
            });
            return None;
        }
    };

    progress_callback(ProgressEvent::ValidatingCredential);
    let cache = CachedMetadataProvider::new(TmdbProvider::new(fetcher.clone(), credential));

    match cache.validate_credential() {
        Ok(true) => {
            progress_callback(ProgressEvent::MetadataEnabled);
            Some(Enrichment { cache, series_id })
        }
        Ok(false) => {
            progress_callback(ProgressEvent::MetadataDisabled {
                reason: "Invalid TMDB API key".to_string(),
            });
            None
        }
        Err(e) => {
            progress_callback(ProgressEvent::MetadataDisabled {
                reason: e.to_string(),
            });
            None
        }
    }
}

/// Scrapes one episode; every failure becomes a dropped outcome
fn scrape_task(
    extractor: &Extractor,
    enrichment: Option<&Enrichment>,
    task: &EpisodeTask,
) -> TaskOutcome {
    let dropped = TaskOutcome::Dropped {
        season: task.season,
        episode: task.episode,
    };

    let result = match extractor.scrape_episode(&task.url) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Scrape failed for {}: {}", task.url, e);
            return dropped;
        }
    };

    if result.links.is_empty() {
        tracing::info!(
            "No provider links for S{:02}E{:02} ({})",
            task.season,
            task.episode,
            task.url
        );
        return dropped;
    }

    let canonical_name =
        enrichment.map(|e| e.cache.lookup(&e.series_id, task.season, task.episode));

    TaskOutcome::Completed(EpisodeRecord {
        season: task.season,
        episode: task.episode,
        title: result.title,
        links: result.links,
        canonical_name,
    })
}
