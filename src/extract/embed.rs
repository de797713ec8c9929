//! Attribute-embed strategy
//!
//! Player spans carry a provider name and an embed id of the form
//! `<tag>:<base64 path>`. The decoded path is served by either of two
//! mirrors.

use super::ProviderLink;
use crate::config::MirrorPolicy;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;

/// Mirrors serving the decoded embed paths
pub const MIRRORS: [&str; 2] = ["https://anitown4u.com", "https://app-123.anitown4u.com"];

static PLAYER_SPAN: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.player-selection span[data-dub-name][data-embed-id]")
        .expect("valid selector")
});

/// Chooses the mirror for each generated link
pub trait MirrorSelector: Send + Sync {
    fn select<'a>(&self, mirrors: &[&'a str]) -> Option<&'a str>;
}

/// Uniformly random mirror per link
pub struct RandomMirror;

impl MirrorSelector for RandomMirror {
    fn select<'a>(&self, mirrors: &[&'a str]) -> Option<&'a str> {
        if mirrors.is_empty() {
            return None;
        }
        mirrors.get(rand::random_range(0..mirrors.len())).copied()
    }
}

/// Always the mirror at the given index
pub struct FixedMirror(pub usize);

impl MirrorSelector for FixedMirror {
    fn select<'a>(&self, mirrors: &[&'a str]) -> Option<&'a str> {
        mirrors.get(self.0).copied()
    }
}

/// Builds the selector for a configured policy
pub fn selector_for(policy: MirrorPolicy) -> Arc<dyn MirrorSelector> {
    match policy {
        MirrorPolicy::Random => Arc::new(RandomMirror),
        MirrorPolicy::Primary => Arc::new(FixedMirror(0)),
        MirrorPolicy::Secondary => Arc::new(FixedMirror(1)),
    }
}

/// Decodes the path part of an embed id
fn decode_embed_id(embed_id: &str) -> Option<String> {
    let (_, encoded) = embed_id.split_once(':')?;
    let bytes = STANDARD.decode(encoded.trim()).ok()?;
    let path = String::from_utf8(bytes).ok()?;
    let path = path.trim();

    (!path.is_empty()).then(|| path.to_string())
}

pub(super) fn extract(document: &Html, mirrors: &dyn MirrorSelector) -> Vec<ProviderLink> {
    document
        .select(&PLAYER_SPAN)
        .filter_map(|span| {
            let element = span.value();
            let embed_id = element.attr("data-embed-id")?;
            let label = element
                .attr("data-dub-name")
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string);

            let Some(path) = decode_embed_id(embed_id) else {
                tracing::warn!("Skipping player span with malformed embed id {:?}", embed_id);
                return None;
            };
            let mirror = mirrors.select(&MIRRORS)?;

            ProviderLink::parse(&format!("{}{}", mirror, path)).map(|link| link.with_label(label))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(spans: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body><div class="player-selection">{}</div></body></html>"#,
            spans
        ))
    }

    #[test]
    fn test_decode_embed_id() {
        // "/embed/abc" in base64
        assert_eq!(
            decode_embed_id("hd:L2VtYmVkL2FiYw==").as_deref(),
            Some("/embed/abc")
        );
        assert_eq!(decode_embed_id("L2VtYmVkL2FiYw=="), None);
        assert_eq!(decode_embed_id("hd:%%%"), None);
        assert_eq!(decode_embed_id("hd:"), None);
    }

    #[test]
    fn test_links_use_selected_mirror() {
        let doc = page(
            r#"<span data-dub-name=" Hindi " data-embed-id="hd:L2VtYmVkL2FiYw==">Hindi</span>
               <span data-dub-name="English" data-embed-id="sd:L3YvMg==">English</span>"#,
        );

        let links = extract(&doc, &FixedMirror(1));

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://app-123.anitown4u.com/embed/abc");
        assert_eq!(links[0].host, "app-123.anitown4u.com");
        assert_eq!(links[0].label.as_deref(), Some("Hindi"));
        assert_eq!(links[1].url, "https://app-123.anitown4u.com/v/2");
    }

    #[test]
    fn test_malformed_embed_id_skips_only_that_span() {
        let doc = page(
            r#"<span data-dub-name="Broken" data-embed-id="no-colon-here">x</span>
               <span data-dub-name="Fine" data-embed-id="hd:L2VtYmVkL2FiYw==">y</span>"#,
        );

        let links = extract(&doc, &FixedMirror(0));

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://anitown4u.com/embed/abc");
    }

    #[test]
    fn test_random_mirror_picks_a_known_mirror() {
        for _ in 0..20 {
            let mirror = RandomMirror.select(&MIRRORS).unwrap();
            assert!(MIRRORS.contains(&mirror));
        }
        assert_eq!(RandomMirror.select(&[]), None);
    }

    #[test]
    fn test_page_without_player_spans() {
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        assert!(extract(&doc, &RandomMirror).is_empty());
    }
}
