//! Multi-source academic paper search.
//!
//! A keyword is sent concurrently to Google Scholar, CrossRef, Semantic
//! Scholar, ScienceDirect and IEEE Xplore. Results are normalized into
//! [`Record`]s, deduplicated by case-folded title and ranked by fuzzy
//! similarity to the keyword.

pub mod client;
pub mod config;
pub mod error;
pub mod ranking;
pub mod tools;

pub use client::{MetaSearchClient, ProviderReport, ProviderStatus, Record, Source, Year};
pub use config::{Config, ConfigOverrides, Credentials};
pub use error::{Error, Result};
pub use tools::{ExportFormat, SearchOutput, SearchTool};

use std::sync::Arc;

/// Search every provider with the default configuration.
///
/// Returns at most `max_results` records ordered by descending relevance.
/// Provider failures never surface here; an empty list means nothing was
/// found.
pub async fn search(keyword: &str, max_results: u32, credentials: Credentials) -> Result<Vec<Record>> {
    let tool = SearchTool::new(Arc::new(Config::default()))?;
    tool.search(keyword, max_results, credentials).await
}
