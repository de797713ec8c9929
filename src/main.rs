use clap::{Parser, ValueEnum};
use dialoguer::{Confirm, Input, Password};
use linkhound::{
    DEFAULT_MAX_WORKERS, MirrorPolicy, ProgressEvent, ScrapeConfig, SeasonMap, SettingsStore,
    Site, SlugPattern, scrape_series,
};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Collect stream provider links for every episode of a series.
///
/// Supported sites: Toonstream, AnimeDekho, HindiAnimeVerse, AniTown4u and
/// HindiSubAnime. Values that are not given on the command line are asked
/// for interactively.
#[derive(Debug, Parser)]
#[command(name = "linkhound", version, about)]
struct Cli {
    /// URL of the first episode page
    url: Option<String>,

    /// Episodes per season, as SEASON=EPISODES (repeatable)
    #[arg(short, long = "season", value_name = "SEASON=EPISODES", value_parser = parse_season)]
    seasons: Vec<(u32, u32)>,

    /// Add canonical episode names from TMDB
    #[arg(long)]
    tmdb: bool,

    /// TMDB API read access token
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    tmdb_key: Option<String>,

    /// TMDB series id
    #[arg(long)]
    tmdb_series: Option<String>,

    /// Process episodes concurrently
    #[arg(short, long)]
    concurrent: bool,

    /// Number of concurrent workers (1-20), implies --concurrent
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Mirror used for AniTown4u embeds
    #[arg(long, value_enum, default_value_t = MirrorArg::Random)]
    mirror: MirrorArg,

    /// Output file (".json" is added when there is no extension)
    #[arg(short, long, default_value = "episodes.json")]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MirrorArg {
    Random,
    Primary,
    Secondary,
}

impl From<MirrorArg> for MirrorPolicy {
    fn from(arg: MirrorArg) -> Self {
        match arg {
            MirrorArg::Random => MirrorPolicy::Random,
            MirrorArg::Primary => MirrorPolicy::Primary,
            MirrorArg::Secondary => MirrorPolicy::Secondary,
        }
    }
}

fn parse_season(value: &str) -> Result<(u32, u32), String> {
    let (season, episodes) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SEASON=EPISODES, got '{}'", value))?;
    let season: u32 = season
        .trim()
        .parse()
        .map_err(|_| format!("invalid season number '{}'", season))?;
    let episodes: u32 = episodes
        .trim()
        .parse()
        .map_err(|_| format!("invalid episode count '{}'", episodes))?;

    if season == 0 || episodes == 0 {
        return Err("season and episode count must be at least 1".to_string());
    }
    Ok((season, episodes))
}

/// Sets up the tracing subscriber for diagnostics on stderr
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,linkhound=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started {
            source,
            site,
            total_episodes,
            season_count,
        } => {
            println!("Source: {} ({})", source, site);
            println!(
                "\nStarting scrape for {} episode(s) across {} season(s)",
                total_episodes, season_count
            );
        }
        ProgressEvent::ValidatingCredential => {
            println!("Validating TMDB API key...");
        }
        ProgressEvent::MetadataEnabled => {
            println!("TMDB integration enabled\n");
        }
        ProgressEvent::MetadataDisabled { reason } => {
            println!("TMDB integration disabled: {}\n", reason);
        }
        ProgressEvent::EpisodeFinished {
            index,
            total,
            season,
            episode,
            link_count,
        } => match link_count {
            Some(count) => println!(
                "[{}/{}] S{:02}E{:02}: {} link(s)",
                index, total, season, episode, count
            ),
            None => println!("[{}/{}] S{:02}E{:02}: no links", index, total, season, episode),
        },
        ProgressEvent::Complete {
            episode_count,
            total_episodes,
        } => {
            println!(
                "\nScrape complete! Found links for {} of {} episode(s).",
                episode_count, total_episodes
            );
        }
    }
}

/// Asks for the season map; the episode-numbered sites only have season 1
fn prompt_seasons(pattern: SlugPattern) -> Result<SeasonMap, dialoguer::Error> {
    let mut seasons = SeasonMap::new();

    if pattern == SlugPattern::EpisodeNumber {
        let episodes: u32 = Input::new()
            .with_prompt("Number of episodes")
            .validate_with(|n: &u32| if *n > 0 { Ok(()) } else { Err("must be at least 1") })
            .interact_text()?;
        seasons.insert(1, episodes);
        return Ok(seasons);
    }

    loop {
        let season: u32 = Input::new()
            .with_prompt("Enter season number")
            .validate_with(|n: &u32| if *n > 0 { Ok(()) } else { Err("must be at least 1") })
            .interact_text()?;
        let episodes: u32 = Input::new()
            .with_prompt(format!("Episodes in season {}", season))
            .validate_with(|n: &u32| if *n > 0 { Ok(()) } else { Err("must be at least 1") })
            .interact_text()?;
        seasons.insert(season, episodes);

        if !Confirm::new()
            .with_prompt("Add another season?")
            .default(false)
            .interact()?
        {
            return Ok(seasons);
        }
    }
}

fn with_json_extension(mut path: PathBuf) -> PathBuf {
    if path.extension().is_none() {
        path.set_extension("json");
    }
    path
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    println!("linkhound {}", env!("CARGO_PKG_VERSION"));

    let url = match cli.url {
        Some(url) => url,
        None => Input::<String>::new()
            .with_prompt("Enter episode 1 URL")
            .interact_text()
            .unwrap_or_else(|e| exit_with(e)),
    };
    let url = url.trim().trim_end_matches('/').to_string();
    let site = Site::from_url(&url);

    let seasons: SeasonMap = if cli.seasons.is_empty() {
        prompt_seasons(site.slug_pattern()).unwrap_or_else(|e| exit_with(e))
    } else {
        cli.seasons.iter().copied().collect()
    };

    let mut config = ScrapeConfig::new(url, seasons);
    config.concurrency_enabled = cli.concurrent || cli.workers.is_some();
    config.max_workers = cli.workers.unwrap_or(DEFAULT_MAX_WORKERS);
    config.mirror_policy = cli.mirror.into();
    config.output_path = with_json_extension(cli.output);

    // Settings are only needed for TMDB; a broken store just means prompting
    let store = if cli.tmdb {
        SettingsStore::open()
            .inspect_err(|e| tracing::warn!("Settings unavailable: {}", e))
            .ok()
    } else {
        None
    };
    let mut settings = store
        .as_ref()
        .and_then(|s| s.load().inspect_err(|e| tracing::warn!("{}", e)).ok())
        .unwrap_or_default();

    if cli.tmdb {
        let credential = match cli.tmdb_key.or_else(|| settings.tmdb_api_key.clone()) {
            Some(key) => key,
            None => Password::new()
                .with_prompt("TMDB API key")
                .interact()
                .unwrap_or_else(|e| exit_with(e)),
        };
        let series_id = match cli.tmdb_series.or_else(|| settings.tmdb_series_id.clone()) {
            Some(id) => id,
            None => Input::<String>::new()
                .with_prompt("TMDB Series ID")
                .interact_text()
                .unwrap_or_else(|e| exit_with(e)),
        };

        config.metadata_enabled = true;
        config.metadata_credential = Some(credential);
        config.metadata_series_id = Some(series_id);
    }

    // Never raised here: Ctrl-C ends the process before anything is written
    let cancel = AtomicBool::new(false);
    let mut metadata_enabled = false;

    let output = match scrape_series(&config, &cancel, |event| {
        if matches!(event, ProgressEvent::MetadataEnabled) {
            metadata_enabled = true;
        }
        handle_progress_event(event);
    }) {
        Ok(output) => output,
        Err(e) => exit_with(e),
    };

    if metadata_enabled {
        if let Some(store) = &store {
            settings.tmdb_api_key = config.metadata_credential.clone();
            settings.tmdb_series_id = config.metadata_series_id.clone();
            if let Err(e) = store.save(&settings) {
                tracing::warn!("Failed to remember TMDB settings: {}", e);
            }
        }
    }

    if let Err(e) = output.write_to(&config.output_path) {
        exit_with(e);
    }

    println!(
        "\nSuccessfully saved {} episode(s) to {}",
        output.episodes.len(),
        config.output_path.display()
    );
}
