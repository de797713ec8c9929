//! Generic lazy-iframe strategy
//!
//! The page holds iframes whose source sits in `data-src`. Each of them
//! loads a wrapper page with the actual player iframe.

use super::ProviderLink;
use crate::fetcher::Fetcher;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static LAZY_IFRAME: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe[data-src]").expect("valid selector"));
static IFRAME_SRC: Lazy<Selector> =
    Lazy::new(|| Selector::parse("iframe[src]").expect("valid selector"));

pub(super) fn extract(fetcher: &Fetcher, document: &Html, page_url: &Url) -> Vec<ProviderLink> {
    document
        .select(&LAZY_IFRAME)
        .filter_map(|iframe| iframe.value().attr("data-src"))
        .filter_map(|src| {
            let wrapper_url = match page_url.join(src.trim()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping iframe with bad data-src {:?}: {}", src, e);
                    return None;
                }
            };

            let wrapper = match fetcher.fetch_document(wrapper_url.as_str()) {
                Ok(wrapper) => wrapper,
                Err(e) => {
                    tracing::warn!("Skipping iframe: {}", e);
                    return None;
                }
            };

            wrapper
                .select(&IFRAME_SRC)
                .next()
                .and_then(|nested| nested.value().attr("src"))
                .and_then(|nested| ProviderLink::resolve(nested, &wrapper_url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::testing::ScriptedTransport;
    use std::sync::Arc;

    #[test]
    fn test_nested_player_iframes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            "https://toonstream.co/home/?trembed=0&trid=5&trtype=2",
            200,
            r#"<div class="Video"><iframe src="https://cloudy.upns.one/#abc"></iframe></div>"#,
        );
        transport.respond(
            "https://toonstream.co/home/?trembed=1&trid=5&trtype=2",
            200,
            "<p>empty wrapper</p>",
        );
        transport.respond("https://toonstream.co/home/?trembed=2&trid=5&trtype=2", 502, "");

        let doc = Html::parse_document(
            r#"<html><body>
                 <iframe data-src="https://toonstream.co/home/?trembed=0&amp;trid=5&amp;trtype=2"></iframe>
                 <iframe data-src="/home/?trembed=1&amp;trid=5&amp;trtype=2"></iframe>
                 <iframe data-src="https://toonstream.co/home/?trembed=2&amp;trid=5&amp;trtype=2"></iframe>
                 <iframe src="https://ads.example.com/banner"></iframe>
               </body></html>"#,
        );
        let fetcher = Fetcher::new(transport, RetryPolicy::immediate(1));
        let page = Url::parse("https://toonstream.co/episode/show-1x1/").unwrap();

        let links = extract(&fetcher, &doc, &page);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].host, "cloudy.upns.one");
        assert_eq!(links[0].url, "https://cloudy.upns.one/#abc");
    }

    #[test]
    fn test_page_without_lazy_iframes() {
        let transport = Arc::new(ScriptedTransport::new());
        let fetcher = Fetcher::new(transport, RetryPolicy::immediate(1));
        let doc = Html::parse_document(r#"<iframe src="https://ads.example.com/x"></iframe>"#);
        let page = Url::parse("https://toonstream.co/episode/show-1x1").unwrap();

        assert!(extract(&fetcher, &doc, &page).is_empty());
    }
}
