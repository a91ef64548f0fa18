use crate::client::{Record, Source};
use crate::config::{Credentials, MAX_RESULTS_LIMIT};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maximum accepted keyword length
pub const MAX_KEYWORD_LEN: usize = 1000;

/// Timeout for provider reachability checks
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// A validated, immutable search request shared by every provider
#[derive(Debug, Clone)]
pub struct SearchQuery {
    keyword: String,
    max_results: u32,
    credentials: Credentials,
}

impl SearchQuery {
    /// Validate and build a query
    pub fn new(keyword: &str, max_results: u32, credentials: Credentials) -> Result<Self> {
        let keyword = keyword.trim();

        if keyword.is_empty() {
            return Err(Error::invalid_input("keyword", "Keyword cannot be empty"));
        }

        if keyword.len() > MAX_KEYWORD_LEN {
            return Err(Error::invalid_input(
                "keyword",
                format!("Keyword too long (max {MAX_KEYWORD_LEN} characters)"),
            ));
        }

        if keyword.contains('\0') || keyword.contains('\x1b') {
            return Err(Error::invalid_input(
                "keyword",
                "Keyword contains invalid characters",
            ));
        }

        if max_results == 0 || max_results > MAX_RESULTS_LIMIT {
            return Err(Error::invalid_input(
                "max_results",
                format!("Must be between 1 and {MAX_RESULTS_LIMIT}"),
            ));
        }

        Ok(Self {
            keyword: keyword.to_string(),
            max_results,
            credentials,
        })
    }

    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    #[must_use]
    pub const fn max_results(&self) -> u32 {
        self.max_results
    }

    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// Errors that can occur inside a provider adapter.
///
/// None of these leave the adapter: they are folded into a
/// [`ProviderOutcome::Failed`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Network-level unavailability, as opposed to a response we could not read
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::Status { .. } | Self::RateLimited
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    /// The request URL is stripped: some providers carry their API key in the query.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("Connection failed: {err}"))
        } else {
            Self::Network(format!("Request failed: {err}"))
        }
    }
}

/// What a single adapter invocation produced
#[derive(Debug)]
pub enum ProviderOutcome {
    /// The provider answered; the list may be empty
    Completed(Vec<Record>),
    /// The provider was not called, e.g. its API key is missing
    Skipped { reason: String },
    /// The provider failed; `partial` holds anything collected before the failure
    Failed {
        error: ProviderError,
        partial: Vec<Record>,
    },
}

impl ProviderOutcome {
    /// Fold an adapter result into an outcome, logging failures as warnings
    #[must_use]
    pub fn from_result(source: Source, result: std::result::Result<Vec<Record>, ProviderError>) -> Self {
        match result {
            Ok(records) => {
                info!("{} returned {} records", source, records.len());
                Self::Completed(records)
            }
            Err(error) => Self::failed(source, error, Vec::new()),
        }
    }

    #[must_use]
    pub fn failed(source: Source, error: ProviderError, partial: Vec<Record>) -> Self {
        warn!(
            provider = source.id(),
            partial = partial.len(),
            "{} search failed: {}",
            source,
            error
        );
        Self::Failed { error, partial }
    }

    #[must_use]
    pub fn skipped(source: Source, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!("{} skipped: {}", source, reason);
        Self::Skipped { reason }
    }

    /// Records contributed to the merged result
    #[must_use]
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Completed(records) | Self::Failed { partial: records, .. } => records,
            Self::Skipped { .. } => &[],
        }
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Completed(records) | Self::Failed { partial: records, .. } => records,
            Self::Skipped { .. } => Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Trait for academic source providers
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Which provider this adapter speaks to
    fn source(&self) -> Source;

    /// Human-readable description of the provider
    fn description(&self) -> &str;

    /// Base URL used for requests and reachability checks
    fn base_url(&self) -> &str;

    /// HTTP client used by this adapter
    fn http(&self) -> &reqwest::Client;

    /// Whether the provider needs an API key to be queried at all
    fn requires_credential(&self) -> bool {
        false
    }

    /// Whether the query carries the credential this provider needs
    fn has_credential(&self, _credentials: &Credentials) -> bool {
        true
    }

    /// Search the provider. Never fails: errors become [`ProviderOutcome::Failed`].
    async fn search(&self, query: &SearchQuery) -> ProviderOutcome;

    /// Reachability check: any HTTP response counts, only transport errors do not
    async fn health_check(&self) -> bool {
        let result = self
            .http()
            .head(self.base_url())
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => {
                debug!(
                    "{} reachable (HTTP {})",
                    self.source(),
                    response.status().as_u16()
                );
                true
            }
            Err(e) => {
                warn!("{} unreachable: {}", self.source(), e);
                false
            }
        }
    }
}

/// Map a non-success status into a provider error, reading the body for context
pub(crate) async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    if status == 429 {
        return ProviderError::RateLimited;
    }
    let body = response.text().await.unwrap_or_default();
    let message = body.chars().take(200).collect();
    ProviderError::Status { status, message }
}
