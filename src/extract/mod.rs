//! Site routing and provider link extraction
//!
//! Every supported site hides its stream embeds behind a different
//! mechanism. The [`Site`] of an episode URL is resolved from its host and
//! selects one [`Strategy`]; the [`Extractor`] runs that strategy against
//! the fetched page.

mod ajax;
mod embed;
mod iframe;
mod probe;
mod title;

pub use embed::{MirrorSelector, selector_for};

use crate::fetcher::{FetchError, Fetcher};
use crate::slug::SlugPattern;
use scraper::Html;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// A discovered stream endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderLink {
    /// Authority of `url`
    pub host: String,
    pub url: String,
    /// Provider name announced by the page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ProviderLink {
    /// Builds a link from an absolute URL
    ///
    /// Returns `None` for empty, unparsable or host-less URLs.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Self::from_url(Url::parse(raw).ok()?, raw)
    }

    /// Builds a link from a possibly relative URL found on the page at `base`
    pub fn resolve(raw: &str, base: &Url) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let url = base.join(raw).ok()?;
        let serialized = url.to_string();
        Self::from_url(url, &serialized)
    }

    fn from_url(url: Url, raw: &str) -> Option<Self> {
        let host = url.host_str().filter(|h| !h.is_empty())?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Some(Self {
            host,
            url: raw.to_string(),
            label: None,
        })
    }

    /// Attaches a provider name
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }
}

/// What a single strategy run recovered from an episode page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    pub title: String,
    pub links: Vec<ProviderLink>,
}

/// The extraction mechanisms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Body class id probed through a dynamic iframe endpoint
    TermProbe { endpoint: &'static str },
    /// Base64 embed ids on player spans
    AttributeEmbed,
    /// Player options resolved through an admin-ajax POST
    AjaxPlayer,
    /// Lazily loaded iframes wrapping the real player iframe
    GenericIframe,
}

/// Known streaming sites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    AnimeDekho,
    HindiSubAnime,
    AniTown4u,
    HindiAnimeVerse,
    /// Toonstream and every unknown host
    Generic,
}

impl Site {
    /// Known sites in matching order; the first host match wins
    const ROUTES: [(&'static str, Site); 4] = [
        ("animedekho", Site::AnimeDekho),
        ("hindisubanime", Site::HindiSubAnime),
        ("anitown4u", Site::AniTown4u),
        ("hindianimeverse", Site::HindiAnimeVerse),
    ];

    /// Routes an episode URL to its site by looking at the host
    pub fn from_url(url: &str) -> Site {
        let host = match Url::parse(url.trim()) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_ascii_lowercase(),
            Err(_) => return Site::Generic,
        };

        Self::ROUTES
            .iter()
            .find(|(marker, _)| host.contains(marker))
            .map(|&(_, site)| site)
            .unwrap_or(Site::Generic)
    }

    pub fn strategy(self) -> Strategy {
        match self {
            Site::AnimeDekho => Strategy::TermProbe {
                endpoint: probe::ANIMEDEKHO_ENDPOINT,
            },
            Site::HindiSubAnime => Strategy::TermProbe {
                endpoint: probe::HINDISUBANIME_ENDPOINT,
            },
            Site::AniTown4u => Strategy::AttributeEmbed,
            Site::HindiAnimeVerse => Strategy::AjaxPlayer,
            Site::Generic => Strategy::GenericIframe,
        }
    }

    /// How the site numbers its episode pages
    pub fn slug_pattern(self) -> SlugPattern {
        match self {
            Site::AniTown4u => SlugPattern::EpisodeNumber,
            _ => SlugPattern::SeasonEpisode,
        }
    }

    /// Literal the site appends to its page titles
    pub fn title_suffix(self) -> &'static str {
        match self {
            Site::AnimeDekho => " - AnimeDekho",
            Site::HindiSubAnime => " - Hindi Sub Anime",
            Site::AniTown4u => " – AniTown4U",
            Site::HindiAnimeVerse => " | Hindi Anime Verse",
            Site::Generic => " - Toonstream",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Site::AnimeDekho => "AnimeDekho",
            Site::HindiSubAnime => "HindiSubAnime",
            Site::AniTown4u => "AniTown4u",
            Site::HindiAnimeVerse => "HindiAnimeVerse",
            Site::Generic => "Toonstream",
        }
    }
}

/// Runs the site strategies against episode pages
///
/// Shared by all workers; the fetcher's transport is the only network handle.
#[derive(Clone)]
pub struct Extractor {
    fetcher: Fetcher,
    mirrors: Arc<dyn MirrorSelector>,
}

impl Extractor {
    pub fn new(fetcher: Fetcher, mirrors: Arc<dyn MirrorSelector>) -> Self {
        Self { fetcher, mirrors }
    }

    /// Fetches an episode page and extracts its title and provider links
    ///
    /// Only a failure to load the episode page itself is reported as an
    /// error. Everything that goes wrong further down (missing markup,
    /// failed probes, broken embeds) just yields fewer links.
    pub fn scrape_episode(&self, url: &str) -> Result<ExtractionResult, FetchError> {
        let page_url = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let site = Site::from_url(url);
        let document = self.fetcher.fetch_document(url)?;

        let links = self.extract_links(site.strategy(), &document, &page_url);
        let title = title::episode_title(site, &document, url);

        Ok(ExtractionResult { title, links })
    }

    /// Runs one strategy against an already fetched document
    pub fn extract_links(
        &self,
        strategy: Strategy,
        document: &Html,
        page_url: &Url,
    ) -> Vec<ProviderLink> {
        match strategy {
            Strategy::TermProbe { endpoint } => probe::extract(&self.fetcher, document, endpoint),
            Strategy::AttributeEmbed => embed::extract(document, self.mirrors.as_ref()),
            Strategy::AjaxPlayer => ajax::extract(&self.fetcher, document, page_url),
            Strategy::GenericIframe => iframe::extract(&self.fetcher, document, page_url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::embed::FixedMirror;
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::testing::ScriptedTransport;

    #[test]
    fn test_routes_by_host() {
        assert_eq!(
            Site::from_url("https://animedekho.co/epi/show-1x1"),
            Site::AnimeDekho
        );
        assert_eq!(
            Site::from_url("https://www.hindisubanime.co/epi/show-1x1"),
            Site::HindiSubAnime
        );
        assert_eq!(
            Site::from_url("https://anitown4u.com/watch/show-episode-1"),
            Site::AniTown4u
        );
        assert_eq!(
            Site::from_url("https://hindianimeverse.org/episodes/show-1x1"),
            Site::HindiAnimeVerse
        );
        assert_eq!(
            Site::from_url("https://toonstream.co/episode/show-1x1"),
            Site::Generic
        );
    }

    #[test]
    fn test_routing_ignores_path() {
        assert_eq!(
            Site::from_url("https://toonstream.co/episode/animedekho-special-1x1"),
            Site::Generic
        );
        assert_eq!(Site::from_url("not a url"), Site::Generic);
    }

    #[test]
    fn test_strategy_per_site() {
        assert!(matches!(
            Site::AnimeDekho.strategy(),
            Strategy::TermProbe { endpoint } if endpoint.contains("animedekho")
        ));
        assert!(matches!(
            Site::HindiSubAnime.strategy(),
            Strategy::TermProbe { endpoint } if endpoint.contains("hindisubanime")
        ));
        assert_eq!(Site::AniTown4u.slug_pattern(), SlugPattern::EpisodeNumber);
        assert_eq!(Site::Generic.slug_pattern(), SlugPattern::SeasonEpisode);
    }

    #[test]
    fn test_provider_link_host_comes_from_url() {
        let link = ProviderLink::parse("https://streamtape.com/e/abc").unwrap();
        assert_eq!(link.host, "streamtape.com");

        let base = Url::parse("https://toonstream.co/episode/show-1x1").unwrap();
        let link = ProviderLink::resolve("//player.example.net:8443/v/1", &base).unwrap();
        assert_eq!(link.host, "player.example.net:8443");
        assert_eq!(link.url, "https://player.example.net:8443/v/1");

        assert!(ProviderLink::parse("").is_none());
        assert!(ProviderLink::parse("   ").is_none());
        assert!(ProviderLink::parse("/relative/only").is_none());
    }

    fn extractor(transport: Arc<ScriptedTransport>) -> Extractor {
        Extractor::new(
            Fetcher::new(transport, RetryPolicy::immediate(1)),
            Arc::new(FixedMirror(0)),
        )
    }

    #[test]
    fn test_scrape_hindisubanime_episode() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "https://hindisubanime.co/epi/show-1x1",
            200,
            r#"<html><head><title>Watch Online Show 1x1 - Hindi Sub Anime</title></head>
               <body class="single postid-318"></body></html>"#,
        );
        transport.respond(
            "https://hindisubanime.co/?trdekho=0&trid=318&trtype=2",
            200,
            r#"<iframe src="https://vidhide.com/embed/s1"></iframe>"#,
        );
        transport.respond(
            "https://hindisubanime.co/?trdekho=2&trid=318&trtype=2",
            200,
            r#"<iframe src="//filemoon.sx/e/s1"></iframe>"#,
        );

        let result = extractor(transport.clone())
            .scrape_episode("https://hindisubanime.co/epi/show-1x1")
            .unwrap();

        assert_eq!(result.title, "Show 1x1");
        let urls: Vec<_> = result.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://vidhide.com/embed/s1", "https://filemoon.sx/e/s1"]
        );
        // The other site's probe endpoint is never used
        assert_eq!(
            transport.calls("https://animedekho.co/?trdekho=0&trid=318&trtype=2"),
            0
        );
    }

    #[test]
    fn test_scrape_hindianimeverse_episode() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "https://hindianimeverse.org/episodes/show-1x3",
            200,
            r#"<html><head><title>Watch &amp; Download Show 1x3 Free | Hindi Anime Verse</title></head>
               <body><ul id="playeroptionsul">
                 <li class="dooplay_player_option" data-post="55" data-nume="1" data-type="tv">Server 1</li>
               </ul></body></html>"#,
        );
        transport.respond(
            &ScriptedTransport::post_key(
                ajax::AJAX_ENDPOINT,
                &[
                    ("action", "doo_player_ajax"),
                    ("post", "55"),
                    ("nume", "1"),
                    ("type", "tv"),
                ],
            ),
            200,
            r#"{"embed_url":"https://streamwish.to/e/v3","type":"iframe"}"#,
        );

        let result = extractor(transport)
            .scrape_episode("https://hindianimeverse.org/episodes/show-1x3")
            .unwrap();

        assert_eq!(result.title, "Show 1x3");
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].host, "streamwish.to");
    }

    #[test]
    fn test_scrape_episode_reports_page_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        let extractor = Extractor::new(
            Fetcher::new(transport, RetryPolicy::immediate(2)),
            Arc::new(FixedMirror(0)),
        );

        let result = extractor.scrape_episode("https://toonstream.co/episode/show-1x1");
        assert!(result.is_err());
    }
}
