use super::traits::{status_error, ProviderError, ProviderOutcome, SearchQuery, SourceProvider};
use crate::client::{Record, Source, Year};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

/// The search endpoint caps `limit` at 100
const MAX_LIMIT: u32 = 100;

/// Fields requested from the paper search endpoint; without them only ids and titles come back
const FIELDS: &str = "title,authors,venue,year,paperId";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    authors: Vec<Author>,
    venue: Option<String>,
    year: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

impl Paper {
    fn into_record(self) -> Record {
        let link = self
            .paper_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(|id| format!("https://www.semanticscholar.org/paper/{id}"));

        Record::new(Source::SemanticScholar)
            .with_title(self.title.as_deref())
            .with_authors(self.authors.iter().filter_map(|a| a.name.as_deref()))
            .with_venue(self.venue.as_deref())
            .with_year(Year::from_number(self.year))
            .with_link(link.as_deref())
    }
}

/// Semantic Scholar graph API provider
pub struct SemanticScholarProvider {
    client: Client,
    base_url: String,
}

impl SemanticScholarProvider {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn build_search_url(&self, query: &SearchQuery) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/graph/v1/paper/search",
            self.base_url.trim_end_matches('/')
        ))
        .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("query", query.keyword())
            .append_pair("limit", &query.max_results().min(MAX_LIMIT).to_string())
            .append_pair("fields", FIELDS);

        Ok(url)
    }

    fn parse_response(body: &str) -> Result<Vec<Record>, ProviderError> {
        let response: SearchResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::Malformed(format!("Failed to parse JSON: {e}")))?;

        Ok(response.data.into_iter().map(Paper::into_record).collect())
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Record>, ProviderError> {
        let url = self.build_search_url(query)?;
        debug!("Semantic Scholar search URL: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await?;
        Self::parse_response(&body)
    }
}

#[async_trait]
impl SourceProvider for SemanticScholarProvider {
    fn source(&self) -> Source {
        Source::SemanticScholar
    }

    fn description(&self) -> &str {
        "Semantic Scholar - AI-powered research paper search"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http(&self) -> &Client {
        &self.client
    }

    #[instrument(skip_all, fields(provider = "semantic_scholar"))]
    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        info!("Searching Semantic Scholar for: {}", query.keyword());
        ProviderOutcome::from_result(self.source(), self.fetch(query).await)
    }
}
