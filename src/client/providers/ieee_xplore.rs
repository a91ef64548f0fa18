use super::traits::{status_error, ProviderError, ProviderOutcome, SearchQuery, SourceProvider};
use crate::client::{Record, Source, Year};
use crate::config::Credentials;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

/// The articles endpoint caps `max_records` at 200
const MAX_RECORDS: u32 = 200;

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    authors: Option<Authors>,
    publication_title: Option<String>,
    publication_year: Option<YearValue>,
    document_link: Option<String>,
    html_url: Option<String>,
}

/// The API nests authors as `{"authors": [...]}`; a bare list is accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    Nested { authors: Vec<Author> },
    Flat(Vec<Author>),
}

impl Authors {
    fn names(&self) -> impl Iterator<Item = &str> {
        let authors = match self {
            Self::Nested { authors } | Self::Flat(authors) => authors,
        };
        authors.iter().filter_map(|a| a.full_name.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct Author {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YearValue {
    Number(i64),
    Text(String),
}

impl From<&YearValue> for Year {
    fn from(value: &YearValue) -> Self {
        match value {
            YearValue::Number(year) => Self::from_number(Some(*year)),
            YearValue::Text(text) => Self::from_text(Some(text)),
        }
    }
}

impl Article {
    fn into_record(self) -> Record {
        let link = self.document_link.as_deref().or(self.html_url.as_deref());

        Record::new(Source::IeeeXplore)
            .with_title(self.title.as_deref())
            .with_authors(self.authors.iter().flat_map(Authors::names))
            .with_venue(self.publication_title.as_deref())
            .with_year(self.publication_year.as_ref().map(Year::from).unwrap_or_default())
            .with_link(link)
    }
}

/// IEEE Xplore metadata search provider (requires an API key)
pub struct IeeeXploreProvider {
    client: Client,
    base_url: String,
}

impl IeeeXploreProvider {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn build_search_url(&self, query: &SearchQuery, api_key: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/api/v1/search/articles",
            self.base_url.trim_end_matches('/')
        ))
        .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("querytext", query.keyword())
            .append_pair("max_records", &query.max_results().min(MAX_RECORDS).to_string())
            .append_pair("apikey", api_key);

        Ok(url)
    }

    fn parse_response(body: &str) -> Result<Vec<Record>, ProviderError> {
        let response: ArticlesResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::Malformed(format!("Failed to parse JSON: {e}")))?;

        Ok(response.articles.into_iter().map(Article::into_record).collect())
    }

    async fn fetch(&self, query: &SearchQuery, api_key: &str) -> Result<Vec<Record>, ProviderError> {
        let url = self.build_search_url(query, api_key)?;
        // The key rides in the query string, so only the path is logged
        debug!("IEEE Xplore search path: {}", url.path());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await?;
        Self::parse_response(&body)
    }
}

#[async_trait]
impl SourceProvider for IeeeXploreProvider {
    fn source(&self) -> Source {
        Source::IeeeXplore
    }

    fn description(&self) -> &str {
        "IEEE Xplore - IEEE and IET journals, conferences and standards"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http(&self) -> &Client {
        &self.client
    }

    fn requires_credential(&self) -> bool {
        true
    }

    fn has_credential(&self, credentials: &Credentials) -> bool {
        credentials.ieee_key().is_some()
    }

    #[instrument(skip_all, fields(provider = "ieee_xplore"))]
    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        let Some(api_key) = query.credentials().ieee_key() else {
            return ProviderOutcome::skipped(self.source(), "no IEEE Xplore API key supplied");
        };

        info!("Searching IEEE Xplore for: {}", query.keyword());
        ProviderOutcome::from_result(self.source(), self.fetch(query, api_key).await)
    }
}
