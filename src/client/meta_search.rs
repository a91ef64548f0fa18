use crate::client::providers::{
    CrossRefProvider, GoogleScholarProvider, IeeeXploreProvider, ProviderOutcome,
    ScienceDirectProvider, SearchQuery, SemanticScholarProvider, SourceProvider,
};
use crate::client::{HttpClientConfig, Record, Source};
use crate::{Config, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Configuration for fan-out behavior
#[derive(Debug, Clone)]
pub struct MetaSearchConfig {
    /// Maximum number of providers queried at once
    pub max_parallel_providers: usize,
}

impl Default for MetaSearchConfig {
    fn default() -> Self {
        Self {
            max_parallel_providers: Source::ALL.len(),
        }
    }
}

impl From<&Config> for MetaSearchConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_parallel_providers: config.search.max_parallel_providers,
        }
    }
}

/// How one provider fared during a fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Completed { count: usize },
    Skipped { reason: String },
    Failed { message: String, partial: usize },
}

/// Per-provider entry of a fan-out, in submission order
#[derive(Debug, Clone)]
pub struct ProviderReport {
    pub source: Source,
    pub status: ProviderStatus,
    pub elapsed: Duration,
}

impl ProviderReport {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.status, ProviderStatus::Failed { .. })
    }
}

/// Unordered union of provider records, concatenated in submission order
#[derive(Debug, Clone, Default)]
pub struct FanOutResult {
    pub records: Vec<Record>,
    pub reports: Vec<ProviderReport>,
    pub total_time: Duration,
}

impl FanOutResult {
    /// Number of providers that failed outright
    #[must_use]
    pub fn failed_providers(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failure()).count()
    }
}

/// Client that fans a query out to every academic source
pub struct MetaSearchClient {
    providers: Vec<Arc<dyn SourceProvider>>,
    config: MetaSearchConfig,
}

impl std::fmt::Debug for MetaSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaSearchClient")
            .field("providers", &self.provider_names())
            .field("config", &self.config)
            .finish()
    }
}

impl MetaSearchClient {
    /// Build the five standard providers from the application config
    pub fn new(config: &Config) -> Result<Self> {
        let http = HttpClientConfig::from(config.http.clone()).build()?;
        let endpoints = &config.providers;

        let providers: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(
                GoogleScholarProvider::new(endpoints.google_scholar.clone(), http.clone())
                    .with_page_size(config.search.scholar_page_size),
            ),
            Arc::new(CrossRefProvider::new(endpoints.crossref.clone(), http.clone())),
            Arc::new(SemanticScholarProvider::new(
                endpoints.semantic_scholar.clone(),
                http.clone(),
            )),
            Arc::new(ScienceDirectProvider::new(
                endpoints.science_direct.clone(),
                http.clone(),
            )),
            Arc::new(IeeeXploreProvider::new(endpoints.ieee_xplore.clone(), http)),
        ];

        info!(
            "Initialized meta-search client with {} providers",
            providers.len()
        );

        Ok(Self::with_providers(providers, MetaSearchConfig::from(config)))
    }

    /// Use an explicit provider list; its order is the submission order
    #[must_use]
    pub fn with_providers(providers: Vec<Arc<dyn SourceProvider>>, config: MetaSearchConfig) -> Self {
        Self { providers, config }
    }

    #[must_use]
    pub fn providers(&self) -> &[Arc<dyn SourceProvider>] {
        &self.providers
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.source().id()).collect()
    }

    /// Query every provider concurrently and merge the results.
    ///
    /// Results are joined in submission order regardless of completion order.
    /// A provider that fails, or whose task dies, contributes its partial
    /// records (possibly none) and never aborts the batch.
    pub async fn run_all(&self, query: &SearchQuery) -> FanOutResult {
        let start_time = Instant::now();
        info!(
            "Starting fan-out for '{}' across {} providers",
            query.keyword(),
            self.providers.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_providers.max(1)));

        let mut tasks = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let source = provider.source();
            let provider = Arc::clone(provider);
            let query = query.clone();
            let semaphore = Arc::clone(&semaphore);

            let task = tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only waits
                let _permit = semaphore.acquire_owned().await.ok();
                let started = Instant::now();
                let outcome = provider.search(&query).await;
                (outcome, started.elapsed())
            });

            tasks.push((source, task));
        }

        let mut result = FanOutResult::default();
        for (source, task) in tasks {
            let (status, records, elapsed) = match task.await {
                Ok((outcome, elapsed)) => {
                    let status = match &outcome {
                        ProviderOutcome::Completed(records) => ProviderStatus::Completed {
                            count: records.len(),
                        },
                        ProviderOutcome::Skipped { reason } => ProviderStatus::Skipped {
                            reason: reason.clone(),
                        },
                        ProviderOutcome::Failed { error, partial } => ProviderStatus::Failed {
                            message: error.to_string(),
                            partial: partial.len(),
                        },
                    };
                    (status, outcome.into_records(), elapsed)
                }
                Err(e) => {
                    error!("{} task failed: {}", source, e);
                    let status = ProviderStatus::Failed {
                        message: format!("task failed: {e}"),
                        partial: 0,
                    };
                    (status, Vec::new(), Duration::ZERO)
                }
            };

            result.records.extend(records);
            result.reports.push(ProviderReport {
                source,
                status,
                elapsed,
            });
        }

        result.total_time = start_time.elapsed();
        info!(
            "Fan-out completed: {} records, {} failed providers in {:?}",
            result.records.len(),
            result.failed_providers(),
            result.total_time
        );

        result
    }

    /// Check reachability of every provider, in submission order
    pub async fn health_check(&self) -> Vec<(Source, bool)> {
        let checks = self.providers.iter().map(|provider| async move {
            let healthy = provider.health_check().await;
            if healthy {
                info!("Provider {} is reachable", provider.source());
            }
            (provider.source(), healthy)
        });

        join_all(checks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::providers::ProviderError;
    use crate::config::Credentials;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Titles(Vec<&'static str>),
        Fail,
        Panic,
        Delay(Duration, Vec<&'static str>),
    }

    struct StubProvider {
        source: Source,
        behavior: Behavior,
        client: reqwest::Client,
    }

    impl StubProvider {
        fn new(source: Source, behavior: Behavior) -> Arc<dyn SourceProvider> {
            Arc::new(Self {
                source,
                behavior,
                client: reqwest::Client::new(),
            })
        }

        fn records(&self, titles: &[&str]) -> Vec<Record> {
            titles
                .iter()
                .map(|t| Record::new(self.source).with_title(Some(*t)))
                .collect()
        }
    }

    #[async_trait]
    impl SourceProvider for StubProvider {
        fn source(&self) -> Source {
            self.source
        }

        fn description(&self) -> &str {
            "stub"
        }

        fn base_url(&self) -> &str {
            "http://stub.invalid"
        }

        fn http(&self) -> &reqwest::Client {
            &self.client
        }

        async fn search(&self, _query: &SearchQuery) -> ProviderOutcome {
            match &self.behavior {
                Behavior::Titles(titles) => ProviderOutcome::Completed(self.records(titles)),
                Behavior::Fail => ProviderOutcome::failed(
                    self.source,
                    ProviderError::Network("connection reset".to_string()),
                    Vec::new(),
                ),
                Behavior::Panic => panic!("adapter bug"),
                Behavior::Delay(delay, titles) => {
                    tokio::time::sleep(*delay).await;
                    ProviderOutcome::Completed(self.records(titles))
                }
            }
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("deep learning", 5, Credentials::default()).unwrap()
    }

    #[tokio::test]
    async fn test_results_joined_in_submission_order() {
        // The first provider finishes last but still comes first
        let client = MetaSearchClient::with_providers(
            vec![
                StubProvider::new(
                    Source::GoogleScholar,
                    Behavior::Delay(Duration::from_millis(50), vec!["Slow"]),
                ),
                StubProvider::new(Source::CrossRef, Behavior::Titles(vec!["Fast"])),
            ],
            MetaSearchConfig::default(),
        );

        let result = client.run_all(&query()).await;
        let titles: Vec<_> = result.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Slow", "Fast"]);
        assert_eq!(result.reports[0].source, Source::GoogleScholar);
        assert_eq!(result.reports[1].source, Source::CrossRef);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let client = MetaSearchClient::with_providers(
            vec![
                StubProvider::new(Source::GoogleScholar, Behavior::Fail),
                StubProvider::new(Source::CrossRef, Behavior::Panic),
                StubProvider::new(Source::SemanticScholar, Behavior::Titles(vec!["Survivor"])),
            ],
            MetaSearchConfig::default(),
        );

        let result = client.run_all(&query()).await;
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].title, "Survivor");
        assert_eq!(result.failed_providers(), 2);
        assert!(matches!(
            result.reports[2].status,
            ProviderStatus::Completed { count: 1 }
        ));
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        struct CountingProvider {
            active: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
            client: reqwest::Client,
        }

        #[async_trait]
        impl SourceProvider for CountingProvider {
            fn source(&self) -> Source {
                Source::CrossRef
            }
            fn description(&self) -> &str {
                "counting"
            }
            fn base_url(&self) -> &str {
                "http://stub.invalid"
            }
            fn http(&self) -> &reqwest::Client {
                &self.client
            }
            async fn search(&self, _query: &SearchQuery) -> ProviderOutcome {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                ProviderOutcome::Completed(Vec::new())
            }
        }

        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let providers: Vec<Arc<dyn SourceProvider>> = (0..4)
            .map(|_| {
                Arc::new(CountingProvider {
                    active: Arc::clone(&active),
                    peak: Arc::clone(&peak),
                    client: reqwest::Client::new(),
                }) as Arc<dyn SourceProvider>
            })
            .collect();

        let client = MetaSearchClient::with_providers(
            providers,
            MetaSearchConfig {
                max_parallel_providers: 2,
            },
        );
        client.run_all(&query()).await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_standard_provider_order() {
        let client = MetaSearchClient::new(&Config::default()).unwrap();
        assert_eq!(
            client.provider_names(),
            vec!["google_scholar", "crossref", "semantic_scholar", "science_direct", "ieee_xplore"]
        );
    }
}
