use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scrape listing pages into a CSV table.
    Scrape(ScrapeArgs),
    /// Re-parse price/rating text of a CSV table into typed values.
    Clean(CleanArgs),
    /// Compute price statistics and charts from a CSV table.
    Report(ReportArgs),
    /// Scrape, then report on the scraped table.
    Run(RunArgs),
}

// Unset flags fall back to `--config`, then to built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct ScrapeArgs {
    /// YAML file with scrape settings (same names as the flags, snake_case).
    #[arg(long)]
    pub config: Option<String>,

    /// Listing URL with a `{page}` placeholder [default: books.toscrape.com catalogue].
    #[arg(long)]
    pub url_template: Option<String>,

    /// First page for `--strategy navigate` [default: page 1 of the template].
    #[arg(long)]
    pub start_url: Option<String>,

    /// Pagination strategy: `templated` or `navigate` [default: templated].
    #[arg(long)]
    pub strategy: Option<String>,

    /// Maximum listing pages to fetch [default: 3].
    #[arg(long)]
    pub pages: Option<usize>,

    /// Output CSV path [default: books.csv].
    #[arg(long)]
    pub out: Option<String>,

    /// Fetch each detail page for the review count (`--details=false` overrides the config file).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub details: Option<bool>,

    /// Maximum detail pages in flight [default: 1].
    #[arg(long)]
    pub detail_concurrency: Option<usize>,

    /// Lower bound of the delay between requests (politeness) [default: 500].
    #[arg(long)]
    pub delay_min_ms: Option<u64>,

    /// Upper bound of the delay between requests (politeness) [default: 2000].
    #[arg(long)]
    pub delay_max_ms: Option<u64>,

    /// Extra wait after each navigation step [default: 0].
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Per-request timeout [default: 10].
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries on transport errors and HTTP 500/502/504 [default: 3].
    #[arg(long)]
    pub retries: Option<usize>,

    /// User-Agent header sent with every request.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Keep listing price/rating text as-is instead of typed values.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub raw: Option<bool>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Input CSV (raw or typed).
    #[arg(long)]
    pub input: String,

    /// Output CSV path for the typed table.
    #[arg(long)]
    pub out: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Input CSV (raw or typed).
    #[arg(long)]
    pub input: String,

    /// Output directory for charts and `summary.json`.
    #[arg(long)]
    pub out: String,

    /// Histogram bucket count.
    #[arg(long, default_value_t = crate::report::DEFAULT_BINS)]
    pub bins: usize,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub scrape: ScrapeArgs,

    /// Output directory for charts and `summary.json`.
    #[arg(long)]
    pub report_dir: String,

    /// Histogram bucket count.
    #[arg(long, default_value_t = crate::report::DEFAULT_BINS)]
    pub bins: usize,
}
