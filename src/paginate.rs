use std::fmt;

use anyhow::Context as _;
use url::Url;

use crate::extract::Extractor;
use crate::fetch::{FetchError, Fetcher};
use crate::formats::ListingEntry;
use crate::navigate::{Advance, Navigator};

const PAGE_PLACEHOLDER: &str = "{page}";

/// Listing URL pattern with a `{page}` placeholder for the 1-based page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> anyhow::Result<Self> {
        if !template.contains(PAGE_PLACEHOLDER) {
            anyhow::bail!("url template must contain {PAGE_PLACEHOLDER}: {template}");
        }
        let parsed = Self {
            template: template.to_owned(),
        };
        let first = parsed.page_url(1)?;
        if first.scheme() != "http" && first.scheme() != "https" {
            anyhow::bail!("url template must be http/https: {template}");
        }
        Ok(parsed)
    }

    pub fn page_url(&self, page: usize) -> anyhow::Result<Url> {
        let raw = self.template.replace(PAGE_PLACEHOLDER, &page.to_string());
        Url::parse(&raw).with_context(|| format!("parse listing url: {raw}"))
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// Why a listing traversal stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The configured page budget was used up.
    MaxPages,
    /// The loaded page has no "next" control.
    NoFurtherPage,
    /// A page contained zero entries.
    EmptyPage,
    /// A listing fetch answered with a non-success status.
    NonSuccessStatus(u16),
    /// Loading a page through the navigator failed.
    NavigationFailed(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxPages => f.write_str("page limit reached"),
            Self::NoFurtherPage => f.write_str("no further page"),
            Self::EmptyPage => f.write_str("empty page"),
            Self::NonSuccessStatus(status) => write!(f, "HTTP {status}"),
            Self::NavigationFailed(reason) => write!(f, "navigation failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedListing {
    pub entries: Vec<ListingEntry>,
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub termination: Termination,
}

impl CollectedListing {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            pages_fetched: 0,
            pages_skipped: 0,
            termination: Termination::MaxPages,
        }
    }

    fn finish(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }
}

/// Fetches page 1, 2, … of `template` until a page is empty, a page answers
/// with a non-success status, or `max_pages` fetches have been made. Pages
/// that fail in transport are logged and skipped.
pub async fn collect_templated(
    fetcher: &dyn Fetcher,
    extractor: &Extractor,
    template: &UrlTemplate,
    max_pages: usize,
) -> anyhow::Result<CollectedListing> {
    let mut collected = CollectedListing::new();

    for page in 1..=max_pages {
        let url = template.page_url(page)?;
        tracing::info!(page, url = %url, "fetching listing page");

        let fetched = match fetcher.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(FetchError::Status { status, .. }) => {
                tracing::info!(page, status, "listing page not available; stopping");
                return Ok(collected.finish(Termination::NonSuccessStatus(status)));
            }
            Err(err @ FetchError::Transport { .. }) => {
                tracing::warn!(page, error = %err, "listing page fetch failed; skipping");
                collected.pages_skipped += 1;
                continue;
            }
        };
        collected.pages_fetched += 1;

        let parsed = extractor.parse_listing(&fetched.body, &fetched.url);
        tracing::info!(page, entries = parsed.entries.len(), "parsed listing page");
        if parsed.entries.is_empty() {
            return Ok(collected.finish(Termination::EmptyPage));
        }
        collected.entries.extend(parsed.entries);
    }

    Ok(collected.finish(Termination::MaxPages))
}

/// Reads the navigator's current page, extracts it, then activates "next",
/// until there is no next control or `max_pages` pages have been read.
pub async fn collect_navigated(
    navigator: &mut dyn Navigator,
    extractor: &Extractor,
    max_pages: usize,
) -> CollectedListing {
    let mut collected = CollectedListing::new();

    for page in 1..=max_pages {
        let loaded = match navigator.current_page().await {
            Ok(loaded) => loaded,
            Err(err) => {
                tracing::warn!(page, error = %format!("{err:#}"), "could not read current page");
                return collected.finish(Termination::NavigationFailed(format!("{err:#}")));
            }
        };
        collected.pages_fetched += 1;

        let parsed = extractor.parse_listing(&loaded.body, &loaded.url);
        tracing::info!(
            page,
            url = %loaded.url,
            entries = parsed.entries.len(),
            "parsed listing page"
        );
        collected.entries.extend(parsed.entries);

        if page == max_pages {
            break;
        }

        match navigator.advance().await {
            Ok(Advance::Advanced) => {}
            Ok(Advance::NoNextControl) => {
                tracing::info!(page, "no next control; last page reached");
                return collected.finish(Termination::NoFurtherPage);
            }
            Err(err) => {
                tracing::warn!(page, error = %format!("{err:#}"), "navigation to next page failed");
                return collected.finish(Termination::NavigationFailed(format!("{err:#}")));
            }
        }
    }

    collected.finish(Termination::MaxPages)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::fetch::testing::StaticSite;
    use crate::fetch::FetchedPage;
    use crate::navigate::HttpNavigator;

    fn listing(titles: &[&str], next: Option<&str>) -> String {
        let mut html = String::from("<html><body><ol>");
        for title in titles {
            html.push_str(&format!(
                r#"<li><article class="product_pod"><h3><a href="{title}.html" title="{title}">{title}</a></h3></article></li>"#
            ));
        }
        html.push_str("</ol>");
        if let Some(next) = next {
            html.push_str(&format!(r#"<ul class="pager"><li class="next"><a href="{next}">next</a></li></ul>"#));
        }
        html.push_str("</body></html>");
        html
    }

    fn titles(collected: &CollectedListing) -> Vec<String> {
        collected
            .entries
            .iter()
            .filter_map(|entry| entry.title.clone())
            .collect()
    }

    const TEMPLATE: &str = "https://site.test/catalogue/page-{page}.html";

    #[test]
    fn template_requires_placeholder() {
        let err = UrlTemplate::parse("https://site.test/page.html")
            .unwrap_err()
            .to_string();
        assert!(err.contains("{page}"));
    }

    #[test]
    fn template_substitutes_page_number() -> anyhow::Result<()> {
        let template = UrlTemplate::parse(TEMPLATE)?;
        assert_eq!(
            template.page_url(12)?.as_str(),
            "https://site.test/catalogue/page-12.html"
        );
        Ok(())
    }

    #[tokio::test]
    async fn templated_stops_at_non_success_status() -> anyhow::Result<()> {
        let site = StaticSite::default()
            .page("https://site.test/catalogue/page-1.html", &listing(&["a", "b"], None))
            .page("https://site.test/catalogue/page-2.html", &listing(&["c"], None));
        let extractor = Extractor::new()?;

        let collected =
            collect_templated(&site, &extractor, &UrlTemplate::parse(TEMPLATE)?, 10).await?;

        assert_eq!(titles(&collected), vec!["a", "b", "c"]);
        assert_eq!(collected.pages_fetched, 2);
        assert_eq!(collected.termination, Termination::NonSuccessStatus(404));
        assert_eq!(site.requests().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn templated_never_exceeds_page_budget() -> anyhow::Result<()> {
        let mut site = StaticSite::default();
        for page in 1..=10 {
            site = site.page(
                &format!("https://site.test/catalogue/page-{page}.html"),
                &listing(&[format!("p{page}").as_str()], None),
            );
        }
        let extractor = Extractor::new()?;

        let collected =
            collect_templated(&site, &extractor, &UrlTemplate::parse(TEMPLATE)?, 3).await?;

        assert_eq!(titles(&collected), vec!["p1", "p2", "p3"]);
        assert_eq!(collected.termination, Termination::MaxPages);
        assert_eq!(site.requests().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn templated_stops_on_empty_page() -> anyhow::Result<()> {
        let site = StaticSite::default()
            .page("https://site.test/catalogue/page-1.html", &listing(&["a"], None))
            .page("https://site.test/catalogue/page-2.html", &listing(&[], None))
            .page("https://site.test/catalogue/page-3.html", &listing(&["never"], None));
        let extractor = Extractor::new()?;

        let collected =
            collect_templated(&site, &extractor, &UrlTemplate::parse(TEMPLATE)?, 5).await?;

        assert_eq!(titles(&collected), vec!["a"]);
        assert_eq!(collected.termination, Termination::EmptyPage);
        Ok(())
    }

    #[tokio::test]
    async fn templated_skips_pages_that_fail_in_transport() -> anyhow::Result<()> {
        let site = StaticSite::default()
            .page("https://site.test/catalogue/page-1.html", &listing(&["a"], None))
            .broken("https://site.test/catalogue/page-2.html")
            .page("https://site.test/catalogue/page-3.html", &listing(&["c"], None));
        let extractor = Extractor::new()?;

        let collected =
            collect_templated(&site, &extractor, &UrlTemplate::parse(TEMPLATE)?, 3).await?;

        assert_eq!(titles(&collected), vec!["a", "c"]);
        assert_eq!(collected.pages_fetched, 2);
        assert_eq!(collected.pages_skipped, 1);
        assert_eq!(collected.termination, Termination::MaxPages);
        Ok(())
    }

    #[tokio::test]
    async fn navigated_follows_next_until_last_page() -> anyhow::Result<()> {
        let site = Arc::new(
            StaticSite::default()
                .page(
                    "https://site.test/catalogue/page-1.html",
                    &listing(&["a"], Some("page-2.html")),
                )
                .page("https://site.test/catalogue/page-2.html", &listing(&["b"], None)),
        );
        let extractor = Arc::new(Extractor::new()?);
        let mut navigator = HttpNavigator::new(
            site.clone(),
            Arc::clone(&extractor),
            Url::parse("https://site.test/catalogue/page-1.html")?,
            Duration::ZERO,
        );

        let collected = collect_navigated(&mut navigator, &extractor, 5).await;

        assert_eq!(titles(&collected), vec!["a", "b"]);
        assert_eq!(collected.termination, Termination::NoFurtherPage);
        assert_eq!(site.requests().len(), 2);
        Ok(())
    }

    /// Scripted navigator: an endless catalogue that counts loads.
    struct Endless {
        page: usize,
        loads: usize,
    }

    #[async_trait::async_trait]
    impl Navigator for Endless {
        async fn current_page(&mut self) -> anyhow::Result<FetchedPage> {
            if self.loads == 0 {
                self.loads = 1;
            }
            Ok(FetchedPage {
                url: Url::parse(&format!("https://site.test/page-{}.html", self.page))?,
                body: listing(&[format!("p{}", self.page).as_str()], Some("next.html")),
            })
        }

        async fn advance(&mut self) -> anyhow::Result<Advance> {
            self.page += 1;
            self.loads += 1;
            Ok(Advance::Advanced)
        }
    }

    #[tokio::test]
    async fn navigated_never_exceeds_page_budget() -> anyhow::Result<()> {
        let extractor = Extractor::new()?;
        let mut navigator = Endless { page: 1, loads: 0 };

        let collected = collect_navigated(&mut navigator, &extractor, 3).await;

        assert_eq!(titles(&collected), vec!["p1", "p2", "p3"]);
        assert_eq!(collected.termination, Termination::MaxPages);
        assert_eq!(navigator.loads, 3);
        Ok(())
    }

    #[tokio::test]
    async fn navigated_reports_failed_navigation_by_name() -> anyhow::Result<()> {
        let site = Arc::new(
            StaticSite::default()
                .page(
                    "https://site.test/page-1.html",
                    &listing(&["a"], Some("page-2.html")),
                )
                .broken("https://site.test/page-2.html"),
        );
        let extractor = Arc::new(Extractor::new()?);
        let mut navigator = HttpNavigator::new(
            site,
            Arc::clone(&extractor),
            Url::parse("https://site.test/page-1.html")?,
            Duration::ZERO,
        );

        let collected = collect_navigated(&mut navigator, &extractor, 5).await;

        assert_eq!(titles(&collected), vec!["a"]);
        assert!(matches!(collected.termination, Termination::NavigationFailed(_)));
        Ok(())
    }
}
