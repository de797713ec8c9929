//! Result aggregation and the output document

use crate::config::SeasonMap;
use crate::extract::ProviderLink;
use crate::temp::create_sibling_temp_file;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp layout used in the document metadata
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Errors that can occur while writing the output document
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write output file {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// One successfully scraped episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeRecord {
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub links: Vec<ProviderLink>,
    /// Name from the metadata service, when enrichment is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
}

/// Facts about the run, captured before the first task starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMetadata {
    pub source: String,
    pub scraped_at: String,
    pub version: String,
    pub total_episodes: u32,
    pub seasons: SeasonMap,
}

impl RunMetadata {
    pub fn new(source: &str, seasons: &SeasonMap, started_at: DateTime<Utc>) -> Self {
        Self {
            source: source.to_string(),
            scraped_at: started_at.format(TIMESTAMP_FORMAT).to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            total_episodes: seasons.values().sum(),
            seasons: seasons.clone(),
        }
    }
}

/// The document produced by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesOutput {
    pub metadata: RunMetadata,
    pub episodes: Vec<EpisodeRecord>,
}

impl SeriesOutput {
    /// Builds the document, ordering episodes by (season, episode)
    pub fn assemble(metadata: RunMetadata, mut episodes: Vec<EpisodeRecord>) -> Self {
        episodes.sort_by_key(|record| (record.season, record.episode));
        Self { metadata, episodes }
    }

    /// Writes the document as pretty JSON
    ///
    /// The content goes to a temporary file first and is renamed onto
    /// `path` only once complete, so an interrupted write never leaves a
    /// truncated document behind.
    pub fn write_to(&self, path: &Path) -> Result<(), OutputError> {
        let content = serde_json::to_string_pretty(self)?;
        let write_failed = |source| OutputError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let temp = create_sibling_temp_file(path).map_err(write_failed)?;
        let mut file = fs::File::create(temp.path()).map_err(write_failed)?;
        file.write_all(content.as_bytes()).map_err(write_failed)?;
        file.sync_all().map_err(write_failed)?;
        drop(file);

        temp.persist(path).map_err(write_failed)
    }
}
