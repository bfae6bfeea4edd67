//! Link enumerator
//!
//! Extracts listing links from fully revealed catalog markup and resolves
//! them against the catalog URL.

use crate::harvest::layout;
use crate::listing::{dedup_links, ListingLink};
use scraper::{Html, Selector};
use url::Url;

/// Links found in one catalog snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogLinks {
    /// Whether the listings container was present at all
    pub container_found: bool,
    /// Distinct hrefs in first-seen order, exactly as written in the markup
    pub links: Vec<ListingLink>,
}

impl CatalogLinks {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Extracts every listing link from the single listings container
///
/// Only anchors inside the first container count; duplicates are dropped.
///
/// # Example
///
/// ```
/// use listing_harvester::harvest::enumerate_links;
///
/// let html = r#"<div class="job_listings">
///     <a class="job_listing-clickbox" href="/a"></a>
///     <a class="job_listing-clickbox" href="/b"></a>
///     <a class="job_listing-clickbox" href="/a"></a>
/// </div>"#;
/// let found = enumerate_links(html);
/// assert_eq!(found.links, vec!["/a", "/b"]);
/// ```
pub fn enumerate_links(markup: &str) -> CatalogLinks {
    let document = Html::parse_document(markup);

    let (container_selector, anchor_selector) = match (
        Selector::parse(layout::LISTINGS_CONTAINER),
        Selector::parse(layout::LISTING_ANCHOR),
    ) {
        (Ok(container), Ok(anchor)) => (container, anchor),
        _ => return CatalogLinks::default(),
    };

    let container = match document.select(&container_selector).next() {
        Some(container) => container,
        None => return CatalogLinks::default(),
    };

    let hrefs = container
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(String::from);

    CatalogLinks {
        container_found: true,
        links: dedup_links(hrefs),
    }
}

/// Resolves hrefs against the catalog URL
///
/// Hrefs that do not resolve to an http(s) URL are dropped with a debug log.
pub fn resolve_links(links: &[ListingLink], base_url: &Url) -> Vec<ListingLink> {
    let resolved = links.iter().filter_map(|href| match base_url.join(href) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url.to_string()),
        Ok(url) => {
            tracing::debug!("Ignoring non-HTTP listing link {}", url);
            None
        }
        Err(e) => {
            tracing::debug!("Ignoring unparsable listing link {}: {}", href, e);
            None
        }
    });

    dedup_links(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(items: &str) -> String {
        format!(
            r##"<html><body>
            <section id="jobify_widget_jobs-1">
                <div class="job_listings">{}</div>
                <a href="#"><strong>Load more</strong></a>
            </section>
            </body></html>"##,
            items
        )
    }

    #[test]
    fn test_duplicate_hrefs_collapse() {
        let html = catalog(
            r#"<a class="job_listing-clickbox" href="/a"></a>
               <a class="job_listing-clickbox" href="/b"></a>
               <a class="job_listing-clickbox" href="/a"></a>"#,
        );

        let found = enumerate_links(&html);

        assert!(found.container_found);
        assert_eq!(found.links.len(), 2);
        assert!(found.links.contains(&"/a".to_string()));
        assert!(found.links.contains(&"/b".to_string()));
    }

    #[test]
    fn test_ignores_anchors_outside_container_and_other_classes() {
        let html = format!(
            r#"{}<a class="job_listing-clickbox" href="/outside"></a>"#,
            catalog(
                r#"<a class="job_listing-clickbox" href="/inside"></a>
                   <a class="share" href="/share"></a>"#
            )
        );

        let found = enumerate_links(&html);

        assert_eq!(found.links, vec!["/inside"]);
    }

    #[test]
    fn test_empty_container() {
        let found = enumerate_links(&catalog(""));
        assert!(found.container_found);
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_container() {
        let found = enumerate_links("<html><body><p>Maintenance</p></body></html>");
        assert!(!found.container_found);
        assert!(found.is_empty());
    }

    #[test]
    fn test_skips_anchors_without_href() {
        let html = catalog(
            r#"<a class="job_listing-clickbox"></a>
               <a class="job_listing-clickbox" href="  "></a>
               <a class="job_listing-clickbox" href="/real"></a>"#,
        );
        assert_eq!(enumerate_links(&html).links, vec!["/real"]);
    }

    #[test]
    fn test_resolve_links() {
        let base = Url::parse("http://www.ofertapune.net/").unwrap();
        let links = vec![
            "/job/developer/".to_string(),
            "http://www.ofertapune.net/job/developer/".to_string(),
            "https://other.example/job/1".to_string(),
            "mailto:hr@example.com".to_string(),
        ];

        let resolved = resolve_links(&links, &base);

        assert_eq!(
            resolved,
            vec![
                "http://www.ofertapune.net/job/developer/",
                "https://other.example/job/1",
            ]
        );
    }
}
