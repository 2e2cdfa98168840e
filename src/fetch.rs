use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use rand::Rng as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "shelfscrape/",
    env!("CARGO_PKG_VERSION"),
    " (+learning bot)"
);

const RETRY_BASE_DELAY: Duration = Duration::from_millis(300);

/// A page body together with the URL it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GET {url}: {message}")]
    Transport { url: Url, message: String },
    #[error("GET {url}: HTTP {status}")]
    Status { url: Url, status: u16 },
}

impl FetchError {
    pub fn url(&self) -> &Url {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } => url,
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub retries: usize,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 3,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(options: &HttpOptions) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            retries: options.retries,
            user_agent: options.user_agent.clone(),
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let transport = |err: reqwest::Error| FetchError::Transport {
            url: url.clone(),
            message: err.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(transport)?;
        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}

fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Transport { .. } => true,
        FetchError::Status { status, .. } => matches!(*status, 500 | 502 | 504),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let attempts = self.retries.saturating_add(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(err) if attempt < attempts && is_retryable(&err) => {
                    let backoff = RETRY_BASE_DELAY * 2u32.saturating_pow((attempt - 1) as u32);
                    tracing::debug!(
                        url = %url,
                        attempt,
                        attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "request failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Inclusive range the politeness delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoliteDelay {
    min: Duration,
    max: Duration,
}

impl PoliteDelay {
    pub fn new(min: Duration, max: Duration) -> anyhow::Result<Self> {
        if min > max {
            anyhow::bail!(
                "politeness delay minimum ({} ms) exceeds maximum ({} ms)",
                min.as_millis(),
                max.as_millis()
            );
        }
        Ok(Self { min, max })
    }

    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Spaces out every request made through the wrapped fetcher by a randomized
/// delay. The schedule is shared, so concurrent callers are paced as one.
///
/// Retries inside the wrapped fetcher belong to the same turn and are paced
/// only by its own backoff.
#[derive(Debug)]
pub struct PoliteFetcher<F> {
    inner: F,
    delay: PoliteDelay,
    next_allowed: Mutex<Option<Instant>>,
}

impl<F: Fetcher> PoliteFetcher<F> {
    pub fn new(inner: F, delay: PoliteDelay) -> Self {
        Self {
            inner,
            delay,
            next_allowed: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut next_allowed = self.next_allowed.lock().await;
        if let Some(at) = *next_allowed {
            tokio::time::sleep_until(at).await;
        }
        *next_allowed = Some(Instant::now() + self.delay.sample());
    }

    async fn finish_turn(&self) {
        let mut next_allowed = self.next_allowed.lock().await;
        let after_completion = Instant::now() + self.delay.sample();
        *next_allowed = Some(match *next_allowed {
            Some(at) if at > after_completion => at,
            _ => after_completion,
        });
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for PoliteFetcher<F> {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.wait_turn().await;
        let result = self.inner.fetch(url).await;
        self.finish_turn().await;
        result
    }
}
