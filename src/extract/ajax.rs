//! AJAX player strategy
//!
//! Player options only carry a post id, a slot number and a type. The embed
//! URL is returned by the WordPress `admin-ajax.php` endpoint.

use super::ProviderLink;
use crate::fetcher::{Fetcher, HttpRequest};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

pub(super) const AJAX_ENDPOINT: &str = "https://hindianimeverse.org/wp-admin/admin-ajax.php";
const AJAX_ACTION: &str = "doo_player_ajax";

static PLAYER_OPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("li.dooplay_player_option[data-post][data-nume][data-type]")
        .expect("valid selector")
});

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    embed_url: Option<String>,
}

pub(super) fn extract(fetcher: &Fetcher, document: &Html, page_url: &Url) -> Vec<ProviderLink> {
    let mut links = Vec::new();

    for option in document.select(&PLAYER_OPTION) {
        let element = option.value();
        let (Some(post), Some(nume), Some(kind)) = (
            element.attr("data-post"),
            element.attr("data-nume"),
            element.attr("data-type"),
        ) else {
            continue;
        };

        let request = HttpRequest::post_form(
            AJAX_ENDPOINT,
            &[
                ("action", AJAX_ACTION),
                ("post", post),
                ("nume", nume),
                ("type", kind),
            ],
        );

        let response: PlayerResponse = match fetcher.execute_json(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Skipping player option {}/{}: {}", post, nume, e);
                continue;
            }
        };

        match response
            .embed_url
            .as_deref()
            .and_then(|embed| ProviderLink::resolve(embed, page_url))
        {
            Some(link) => links.push(link),
            None => tracing::debug!("Player option {}/{} returned no embed_url", post, nume),
        }
    }

    links
}
