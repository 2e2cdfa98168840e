use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    shelfscrape::logging::init().context("init logging")?;

    let cli = shelfscrape::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        shelfscrape::cli::Command::Scrape(args) => {
            shelfscrape::scrape::run(args).await.context("scrape")?;
        }
        shelfscrape::cli::Command::Clean(args) => {
            shelfscrape::clean::run(args).context("clean")?;
        }
        shelfscrape::cli::Command::Report(args) => {
            shelfscrape::report::run(args).context("report")?;
        }
        shelfscrape::cli::Command::Run(args) => {
            shelfscrape::scrape::run_with_report(args)
                .await
                .context("run")?;
        }
    }

    Ok(())
}
