use super::traits::{status_error, ProviderError, ProviderOutcome, SearchQuery, SourceProvider};
use crate::client::{Record, Source, Year};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// CrossRef `/works` response envelope
#[derive(Debug, Deserialize)]
struct CrossRefResponse {
    message: Option<CrossRefMessage>,
}

#[derive(Debug, Deserialize)]
struct CrossRefMessage {
    #[serde(default)]
    items: Vec<CrossRefItem>,
}

/// Individual work from the CrossRef API
#[derive(Debug, Deserialize)]
struct CrossRefItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CrossRefAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "published-print")]
    published_print: Option<DateParts>,
    #[serde(rename = "published-online")]
    published_online: Option<DateParts>,
    issued: Option<DateParts>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossRefAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Organisational authors only carry a name
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl DateParts {
    fn year(&self) -> Option<i64> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

impl CrossRefAuthor {
    fn display_name(&self) -> String {
        match (&self.given, &self.family) {
            (None, None) => self.name.clone().unwrap_or_default(),
            (given, family) => format!(
                "{} {}",
                given.as_deref().unwrap_or_default(),
                family.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string(),
        }
    }
}

impl CrossRefItem {
    fn into_record(self) -> Record {
        // Print date first, as readers cite it; online and issued dates are fallbacks
        let year = [&self.published_print, &self.published_online, &self.issued]
            .into_iter()
            .flatten()
            .find_map(DateParts::year);

        let link = self
            .doi
            .as_deref()
            .map(str::trim)
            .filter(|doi| !doi.is_empty())
            .map(|doi| format!("https://doi.org/{doi}"));

        Record::new(Source::CrossRef)
            .with_title(self.title.first().map(String::as_str))
            .with_authors(self.author.iter().map(CrossRefAuthor::display_name))
            .with_venue(self.container_title.first().map(String::as_str))
            .with_year(Year::from_number(year))
            .with_link(link.as_deref())
    }
}

/// CrossRef bibliographic metadata provider
pub struct CrossRefProvider {
    client: Client,
    base_url: String,
}

impl CrossRefProvider {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Build the `/works` search URL
    fn build_search_url(&self, query: &SearchQuery) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/works", self.base_url.trim_end_matches('/')))
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("query", query.keyword())
            .append_pair("rows", &query.max_results().to_string());

        Ok(url)
    }

    /// Parse a `/works` response body into records
    fn parse_response(body: &str) -> Result<Vec<Record>, ProviderError> {
        let response: CrossRefResponse = serde_json::from_str(body).map_err(|e| {
            warn!("Failed to parse CrossRef response");
            ProviderError::Malformed(format!("Failed to parse JSON: {e}"))
        })?;

        let items = response.message.map(|m| m.items).unwrap_or_default();
        Ok(items.into_iter().map(CrossRefItem::into_record).collect())
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<Record>, ProviderError> {
        let url = self.build_search_url(query)?;
        debug!("CrossRef search URL: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await?;
        Self::parse_response(&body)
    }
}

#[async_trait]
impl SourceProvider for CrossRefProvider {
    fn source(&self) -> Source {
        Source::CrossRef
    }

    fn description(&self) -> &str {
        "CrossRef - DOI registration agency with metadata for scholarly publications"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http(&self) -> &Client {
        &self.client
    }

    #[instrument(skip_all, fields(provider = "crossref"))]
    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        let start_time = Instant::now();
        info!("Searching CrossRef for: {}", query.keyword());

        let result = self.fetch(query).await;
        debug!("CrossRef search finished in {:?}", start_time.elapsed());

        ProviderOutcome::from_result(self.source(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn provider() -> CrossRefProvider {
        CrossRefProvider::new("https://api.crossref.org/", Client::new())
    }

    #[test]
    fn test_search_url_building() {
        let query = SearchQuery::new("graph neural networks", 7, Credentials::default()).unwrap();
        let url = provider().build_search_url(&query).unwrap();

        assert_eq!(url.path(), "/works");
        assert!(url.as_str().contains("query=graph+neural+networks"));
        assert!(url.as_str().contains("rows=7"));
    }

    #[test]
    fn test_parse_full_item() {
        let body = r#"{
            "status": "ok",
            "message": {
                "items": [{
                    "title": ["Graph Neural Networks"],
                    "author": [
                        {"given": "Jie", "family": "Zhou"},
                        {"name": "OpenGraph Consortium"}
                    ],
                    "container-title": ["AI Open"],
                    "published-print": {"date-parts": [[2020, 1]]},
                    "DOI": "10.1016/j.aiopen.2021.01.001"
                }]
            }
        }"#;

        let records = CrossRefProvider::parse_response(body).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "Graph Neural Networks");
        assert_eq!(record.authors, "Jie Zhou, OpenGraph Consortium");
        assert_eq!(record.venue, "AI Open");
        assert_eq!(record.year, Year::Number(2020));
        assert_eq!(record.link, "https://doi.org/10.1016/j.aiopen.2021.01.001");
        assert_eq!(record.source, Source::CrossRef);
    }

    #[test]
    fn test_parse_sparse_item_uses_fallbacks() {
        let body = r#"{"message": {"items": [{
            "published-print": {"date-parts": [[null]]},
            "issued": {"date-parts": [[2018, 5, 2]]}
        }]}}"#;

        let records = CrossRefProvider::parse_response(body).unwrap();
        let record = &records[0];
        assert_eq!(record.title, "Unknown");
        assert_eq!(record.authors, "Unknown");
        assert_eq!(record.venue, "Unknown");
        assert_eq!(record.year, Year::Number(2018));
        assert_eq!(record.link, "N/A");
    }

    #[test]
    fn test_parse_missing_message_is_empty() {
        let records = CrossRefProvider::parse_response(r#"{"status": "ok"}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = CrossRefProvider::parse_response("<html>oops</html>").unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
