use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use url::Url;

use crate::cli::ScrapeArgs;
use crate::fetch::{DEFAULT_USER_AGENT, HttpOptions, PoliteDelay};
use crate::paginate::UrlTemplate;

pub const DEFAULT_URL_TEMPLATE: &str = "https://books.toscrape.com/catalogue/page-{page}.html";
pub const DEFAULT_PAGES: usize = 3;
pub const DEFAULT_OUT: &str = "books.csv";
pub const DEFAULT_DELAY_MIN_MS: u64 = 500;
pub const DEFAULT_DELAY_MAX_MS: u64 = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Templated,
    Navigate,
}

impl Strategy {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "templated" | "template" => Ok(Self::Templated),
            "navigate" | "navigation" => Ok(Self::Navigate),
            other => anyhow::bail!("unsupported pagination strategy: {other}"),
        }
    }
}

/// Scrape settings as they may appear in a YAML config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub url_template: Option<String>,
    pub start_url: Option<String>,
    pub strategy: Option<String>,
    pub pages: Option<usize>,
    pub out: Option<String>,
    pub details: Option<bool>,
    pub detail_concurrency: Option<usize>,
    pub delay_min_ms: Option<u64>,
    pub delay_max_ms: Option<u64>,
    pub settle_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
    pub user_agent: Option<String>,
    pub raw: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        serde_yaml::from_str(&yaml).with_context(|| format!("parse config: {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub url_template: UrlTemplate,
    pub start_url: Url,
    pub strategy: Strategy,
    pub pages: usize,
    pub out: PathBuf,
    pub details: bool,
    pub detail_concurrency: usize,
    pub delay: PoliteDelay,
    pub settle: Duration,
    pub http: HttpOptions,
    pub raw: bool,
}

impl ScrapeOptions {
    /// Flags win over the config file, which wins over built-in defaults.
    pub fn resolve(args: &ScrapeArgs) -> anyhow::Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => FileConfig::load(Path::new(path))?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &ScrapeArgs, file: FileConfig) -> anyhow::Result<Self> {
        let template_raw = args
            .url_template
            .clone()
            .or(file.url_template)
            .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_owned());
        let url_template = UrlTemplate::parse(&template_raw).context("--url-template")?;

        let start_url = match args.start_url.clone().or(file.start_url) {
            Some(raw) => Url::parse(&raw).with_context(|| format!("parse --start-url: {raw}"))?,
            None => url_template.page_url(1)?,
        };
        if start_url.scheme() != "http" && start_url.scheme() != "https" {
            anyhow::bail!("--start-url must be http/https: {start_url}");
        }

        let strategy = match args.strategy.as_deref().or(file.strategy.as_deref()) {
            Some(raw) => Strategy::parse(raw).context("--strategy")?,
            None => Strategy::Templated,
        };

        let pages = args.pages.or(file.pages).unwrap_or(DEFAULT_PAGES);
        if pages == 0 {
            anyhow::bail!("--pages must be > 0");
        }

        let detail_concurrency = args
            .detail_concurrency
            .or(file.detail_concurrency)
            .unwrap_or(1);
        if detail_concurrency == 0 {
            anyhow::bail!("--detail-concurrency must be > 0");
        }

        let delay = PoliteDelay::new(
            Duration::from_millis(
                args.delay_min_ms
                    .or(file.delay_min_ms)
                    .unwrap_or(DEFAULT_DELAY_MIN_MS),
            ),
            Duration::from_millis(
                args.delay_max_ms
                    .or(file.delay_max_ms)
                    .unwrap_or(DEFAULT_DELAY_MAX_MS),
            ),
        )?;

        let timeout_secs = args
            .timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be > 0");
        }

        Ok(Self {
            url_template,
            start_url,
            strategy,
            pages,
            out: PathBuf::from(
                args.out
                    .clone()
                    .or(file.out)
                    .unwrap_or_else(|| DEFAULT_OUT.to_owned()),
            ),
            details: args.details.or(file.details).unwrap_or(false),
            detail_concurrency,
            delay,
            settle: Duration::from_millis(args.settle_ms.or(file.settle_ms).unwrap_or(0)),
            http: HttpOptions {
                timeout: Duration::from_secs(timeout_secs),
                retries: args.retries.or(file.retries).unwrap_or(DEFAULT_RETRIES),
                user_agent: args
                    .user_agent
                    .clone()
                    .or(file.user_agent)
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            },
            raw: args.raw.or(file.raw).unwrap_or(false),
        })
    }
}
