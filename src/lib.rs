//! Scrape, normalize, and export campaign finance filings from the Virginia
//! State Board of Elections reporting portal.
//!
//! The crawl runs in three stages: build (or load) the committee roster, turn
//! each filing's XML into a canonical JSON tree, then write JSON and CSV
//! output for committees, reports, contributions, and expenses.

pub mod app;
pub mod common;
pub mod config;
pub mod infra;
pub mod observability;
pub mod pipeline;

pub use common::error::{FetchError, Result, ScraperError};
pub use config::Config;
pub use pipeline::{Pipeline, RunSummary};
