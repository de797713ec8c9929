//! Episode title cleanup

use super::Site;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));

const WATCH_ONLINE_PREFIX: &str = "Watch Online ";
const WATCH_DOWNLOAD_PREFIX: &str = "Watch & Download ";
const FREE_SUFFIX: &str = " Free";

/// Display title of an episode page
///
/// Uses the document title with the site decorations removed, or the last
/// path segment of the URL when the page has no title.
pub(super) fn episode_title(site: Site, document: &Html, page_url: &str) -> String {
    let raw = document
        .select(&TITLE)
        .next()
        .map(|title| title.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| last_path_segment(page_url).to_string());

    let mut title = raw
        .replace(site.title_suffix(), "")
        .replace(WATCH_ONLINE_PREFIX, "")
        .trim()
        .to_string();

    if site == Site::HindiAnimeVerse {
        title = title
            .replace(WATCH_DOWNLOAD_PREFIX, "")
            .replace(FREE_SUFFIX, "")
            .trim()
            .to_string();
    }

    title
}

fn last_path_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><title>{}</title></head><body></body></html>",
            title
        ))
    }

    #[test]
    fn test_strips_site_suffix_and_prefix() {
        let title = episode_title(
            Site::AnimeDekho,
            &doc("Watch Online Naruto 1x1 - AnimeDekho"),
            "https://animedekho.co/epi/naruto-1x1",
        );
        assert_eq!(title, "Naruto 1x1");

        let title = episode_title(
            Site::Generic,
            &doc("Ben 10 1x4 - Toonstream"),
            "https://toonstream.co/episode/ben-10-1x4",
        );
        assert_eq!(title, "Ben 10 1x4");
    }

    #[test]
    fn test_hindianimeverse_decorations() {
        let title = episode_title(
            Site::HindiAnimeVerse,
            &doc("Watch &amp; Download Jujutsu Kaisen 1x3 Free | Hindi Anime Verse"),
            "https://hindianimeverse.org/episodes/jujutsu-kaisen-1x3",
        );
        assert_eq!(title, "Jujutsu Kaisen 1x3");
    }

    #[test]
    fn test_falls_back_to_url_segment() {
        let page = Html::parse_document("<html><body></body></html>");
        let title = episode_title(
            Site::AniTown4u,
            &page,
            "https://anitown4u.com/watch/show-episode-7/",
        );
        assert_eq!(title, "show-episode-7");
    }
}
