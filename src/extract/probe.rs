//! Term/post-id probe strategy
//!
//! The page body carries a `term-<id>` or `postid-<id>` class. The players
//! are served one at a time by the site root when called with
//! `?trdekho=<index>&trid=<id>&trtype=2`.

use super::ProviderLink;
use crate::fetcher::Fetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

pub(super) const ANIMEDEKHO_ENDPOINT: &str = "https://animedekho.co/";
pub(super) const HINDISUBANIME_ENDPOINT: &str = "https://hindisubanime.co/";

/// Number of player slots probed per episode
const PROBE_COUNT: usize = 5;

static BODY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:term|postid)-(\d+)").expect("valid regex"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));
static IFRAME_SRC: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe[src]").expect("valid selector"));

/// Reads the numeric term/post id from the body class list
fn body_id(document: &Html) -> Option<String> {
    let classes = document
        .select(&BODY)
        .next()?
        .value()
        .classes()
        .collect::<Vec<_>>()
        .join(" ");

    BODY_ID
        .captures(&classes)
        .map(|captures| captures[1].to_string())
}

pub(super) fn extract(fetcher: &Fetcher, document: &Html, endpoint: &str) -> Vec<ProviderLink> {
    let Some(id) = body_id(document) else {
        tracing::warn!("No term/postid found in body class");
        return Vec::new();
    };
    let Ok(base) = Url::parse(endpoint) else {
        tracing::warn!("Invalid probe endpoint {}", endpoint);
        return Vec::new();
    };

    let mut links = Vec::new();
    for index in 0..PROBE_COUNT {
        let index = index.to_string();
        let params = [("trdekho", index.as_str()), ("trid", id.as_str()), ("trtype", "2")];

        let probe = match fetcher.fetch_document_with_query(endpoint, &params) {
            Ok(probe) => probe,
            Err(e) => {
                tracing::debug!("Skipping probe {} for {}: {}", index, id, e);
                continue;
            }
        };

        let link = probe
            .select(&IFRAME_SRC)
            .next()
            .and_then(|iframe| iframe.value().attr("src"))
            .and_then(|src| ProviderLink::resolve(src, &base));

        match link {
            Some(link) => links.push(link),
            None => tracing::debug!("Probe {} for {} has no player iframe", index, id),
        }
    }

    links
}
