//! Episode URL generation
//!
//! Every supported site numbers its episode pages through a trailing slug.
//! Starting from the URL of the first episode, the slug is rewritten for
//! every (season, episode) pair requested by the caller.

use crate::config::SeasonMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static SEASON_EPISODE_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+-\d+x)\d+$").expect("valid regex"));

static EPISODE_NUMBER_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*-episode-)\d+$").expect("valid regex"));

/// Errors that can occur while generating episode URLs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    /// The first-episode URL does not end in a recognised slug
    #[error("Invalid episode URL format, expected a {expected} slug: {url}")]
    Unrecognized { url: String, expected: SlugPattern },

    /// Sites numbering episodes without seasons only accept one season
    #[error("{pattern} URLs only support a single season, got {count}")]
    SingleSeasonOnly { pattern: SlugPattern, count: usize },

    /// Sites numbering episodes without seasons only have season 1
    #[error("{pattern} URLs only have season 1, got season {season}")]
    SeasonNotSupported { pattern: SlugPattern, season: u32 },
}

/// Slug families used by the supported sites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugPattern {
    /// `...-<season>x<episode>`
    SeasonEpisode,
    /// `...-episode-<n>`, always season 1
    EpisodeNumber,
}

impl std::fmt::Display for SlugPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlugPattern::SeasonEpisode => write!(f, "'-<season>x<episode>'"),
            SlugPattern::EpisodeNumber => write!(f, "'-episode-<n>'"),
        }
    }
}

/// One unit of work: a single episode page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EpisodeTask {
    pub url: String,
    pub season: u32,
    pub episode: u32,
}

/// Generates the episode page URLs for every requested season and episode
///
/// Seasons are visited in ascending order, episodes from 1 up to the
/// requested count. A trailing `/` on the first-episode URL is ignored.
///
/// # Errors
///
/// Returns [`SlugError::Unrecognized`] when `first_episode_url` does not end
/// in a slug of the given pattern.
pub fn generate_episode_tasks(
    first_episode_url: &str,
    seasons: &SeasonMap,
    pattern: SlugPattern,
) -> Result<Vec<EpisodeTask>, SlugError> {
    let url = first_episode_url.trim().trim_end_matches('/');

    let unrecognized = || SlugError::Unrecognized {
        url: url.to_string(),
        expected: pattern,
    };

    match pattern {
        SlugPattern::SeasonEpisode => {
            if !SEASON_EPISODE_SLUG.is_match(url) {
                return Err(unrecognized());
            }
            // The regex guarantees at least one hyphen
            let (prefix, _) = url.rsplit_once('-').ok_or_else(unrecognized)?;

            Ok(seasons
                .iter()
                .flat_map(|(&season, &count)| {
                    (1..=count).map(move |episode| EpisodeTask {
                        url: format!("{}-{}x{}", prefix, season, episode),
                        season,
                        episode,
                    })
                })
                .collect())
        }
        SlugPattern::EpisodeNumber => {
            let captures = EPISODE_NUMBER_SLUG.captures(url).ok_or_else(unrecognized)?;
            let prefix = &captures[1];

            if seasons.len() > 1 {
                return Err(SlugError::SingleSeasonOnly {
                    pattern,
                    count: seasons.len(),
                });
            }
            let count = match seasons.iter().next() {
                Some((&1, &count)) => count,
                Some((&season, _)) => {
                    return Err(SlugError::SeasonNotSupported { pattern, season });
                }
                None => 0,
            };

            Ok((1..=count)
                .map(|episode| EpisodeTask {
                    url: format!("{}{}", prefix, episode),
                    season: 1,
                    episode,
                })
                .collect())
        }
    }
}
