#![forbid(unsafe_code)]

pub mod clean;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod extract;
pub mod fetch;
pub mod fields;
pub mod formats;
pub mod logging;
pub mod navigate;
pub mod paginate;
pub mod report;
pub mod scrape;
pub mod store;
