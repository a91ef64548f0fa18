use crate::client::providers::SearchQuery;
use crate::client::{MetaSearchClient, ProviderReport, Record};
use crate::config::Credentials;
use crate::ranking::{dedupe, rank};
use crate::{Config, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Ranked records plus what each provider did to produce them
#[derive(Debug, Clone)]
pub struct SearchOutput {
    /// Keyword as submitted, after trimming
    pub query: String,
    /// Final ranked records, at most `max_results` long
    pub records: Vec<Record>,
    /// One report per provider, in submission order
    pub providers: Vec<ProviderReport>,
    pub search_time: Duration,
}

impl SearchOutput {
    /// True when no provider produced anything; rendered as "no results found"
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Paper search pipeline: fan-out, deduplication, ranking
#[derive(Clone)]
pub struct SearchTool {
    client: Arc<MetaSearchClient>,
    config: Arc<Config>,
}

impl std::fmt::Debug for SearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchTool")
            .field("client", &self.client)
            .field("config", &"Config")
            .finish()
    }
}

impl SearchTool {
    /// Build the tool with the five standard providers
    pub fn new(config: Arc<Config>) -> Result<Self> {
        info!("Initializing paper search tool");
        let client = Arc::new(MetaSearchClient::new(&config)?);
        Ok(Self::with_client(client, config))
    }

    /// Use a pre-built client, e.g. one with custom providers
    #[must_use]
    pub fn with_client(client: Arc<MetaSearchClient>, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn client(&self) -> &MetaSearchClient {
        &self.client
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Search every provider and return the ranked records
    pub async fn search(
        &self,
        keyword: &str,
        max_results: u32,
        credentials: Credentials,
    ) -> Result<Vec<Record>> {
        Ok(self
            .search_with_report(keyword, max_results, credentials)
            .await?
            .records)
    }

    /// Like [`Self::search`], but keeps the per-provider reports.
    ///
    /// Only invalid input fails; provider trouble shows up in the reports
    /// and at worst yields an empty record list.
    #[instrument(skip(self, credentials), fields(keyword = %keyword, max_results = max_results))]
    pub async fn search_with_report(
        &self,
        keyword: &str,
        max_results: u32,
        credentials: Credentials,
    ) -> Result<SearchOutput> {
        let query = SearchQuery::new(keyword, max_results, credentials)?;
        let start_time = Instant::now();

        let fan_out = self.client.run_all(&query).await;
        let fetched = fan_out.records.len();

        let unique = dedupe(fan_out.records);
        let records = rank(unique, query.keyword(), query.max_results() as usize);

        let search_time = start_time.elapsed();
        if records.is_empty() {
            warn!("No results found for '{}'", query.keyword());
        } else {
            info!(
                "Search completed in {}ms: {} fetched, {} returned",
                search_time.as_millis(),
                fetched,
                records.len()
            );
        }

        Ok(SearchOutput {
            query: query.keyword().to_string(),
            records,
            providers: fan_out.reports,
            search_time,
        })
    }
}
