use std::fs;

use predicates::prelude::*;

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("in.csv");
    fs::write(
        &input,
        "title,detail_url,price,rating,review_count,availability\n",
    )?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscrape");
    cmd.env("RUST_LOG", "debug")
        .args([
            "clean",
            "--input",
            input.to_str().unwrap(),
            "--out",
            temp.path().join("out.csv").to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}

#[test]
fn zero_pages_is_rejected() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscrape");
    cmd.args(["scrape", "--pages", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--pages must be > 0"));
}

#[test]
fn unknown_strategy_is_rejected() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscrape");
    cmd.args(["scrape", "--strategy", "browser"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported pagination strategy"));
}

#[test]
fn config_file_supplies_defaults() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let config = temp.path().join("scrape.yaml");
    fs::write(&config, "pages: 0\n")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscrape");
    cmd.args(["scrape", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--pages must be > 0"));
    Ok(())
}

#[test]
fn missing_input_table_is_fatal() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfscrape");
    cmd.args(["report", "--input", "/nonexistent/books.csv", "--out", "/tmp/x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("open csv"));
}
