use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use url::Url;

use crate::extract::Extractor;
use crate::fetch::{FetchedPage, Fetcher};

/// Result of asking a navigator to move to the next listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Advanced,
    NoNextControl,
}

/// A browser-like session that holds one loaded page at a time and can follow the
/// page's "next" control.
#[async_trait]
pub trait Navigator: Send {
    /// The currently loaded page, fully loaded.
    async fn current_page(&mut self) -> anyhow::Result<FetchedPage>;

    /// Activates the "next page" control and waits for the new page to load.
    async fn advance(&mut self) -> anyhow::Result<Advance>;
}

/// Navigator that drives plain HTTP: "clicking" next fetches the control's target.
/// A page counts as loaded once its whole response body has been read; an extra
/// settle delay can still be configured for sites that need one.
pub struct HttpNavigator {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    start_url: Url,
    settle: Duration,
    loaded: Option<FetchedPage>,
}

impl HttpNavigator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<Extractor>,
        start_url: Url,
        settle: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            start_url,
            settle,
            loaded: None,
        }
    }

    async fn load(&mut self, url: &Url) -> anyhow::Result<()> {
        let page = self
            .fetcher
            .fetch(url)
            .await
            .with_context(|| format!("load listing page: {url}"))?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
        tracing::debug!(url = %page.url, "page loaded");
        self.loaded = Some(page);
        Ok(())
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn current_page(&mut self) -> anyhow::Result<FetchedPage> {
        if self.loaded.is_none() {
            let start_url = self.start_url.clone();
            self.load(&start_url).await?;
        }
        self.loaded
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no page loaded"))
    }

    async fn advance(&mut self) -> anyhow::Result<Advance> {
        let page = self.current_page().await?;
        let next = {
            let document = scraper::Html::parse_document(&page.body);
            self.extractor.next_page_url(&document, &page.url)
        };
        let Some(next) = next else {
            return Ok(Advance::NoNextControl);
        };
        self.load(&next).await?;
        Ok(Advance::Advanced)
    }
}
