use super::traits::{status_error, ProviderError, ProviderOutcome, SearchQuery, SourceProvider};
use crate::client::{Record, Source, Year};
use crate::config::Credentials;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

/// Header carrying the Elsevier API key
const API_KEY_HEADER: &str = "X-ELS-APIKey";

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "search-results")]
    search_results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    entry: Vec<Entry>,
}

/// Elsevier fields are either plain strings, `{"$": ...}` wrappers, or lists of either
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextValue {
    Plain(String),
    Wrapped {
        #[serde(rename = "$")]
        value: String,
    },
    List(Vec<TextValue>),
}

impl TextValue {
    fn collect<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Plain(value) | Self::Wrapped { value } => out.push(value),
            Self::List(values) => values.iter().for_each(|v| v.collect(out)),
        }
    }

    fn values(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn first(&self) -> Option<&str> {
        self.values().into_iter().next()
    }
}

#[derive(Debug, Deserialize)]
struct Entry {
    /// Present when the result set is empty: `{"error": "Result set was empty"}`
    error: Option<String>,
    #[serde(rename = "dc:title")]
    title: Option<TextValue>,
    #[serde(rename = "dc:creator")]
    creator: Option<TextValue>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<TextValue>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<TextValue>,
    #[serde(default)]
    link: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@ref")]
    rel: Option<String>,
    #[serde(rename = "@href")]
    href: Option<String>,
}

impl Entry {
    fn into_record(self) -> Record {
        let year = self
            .cover_date
            .as_ref()
            .and_then(TextValue::first)
            .map(|date| date.chars().take(4).collect::<String>());

        // The article landing page beats the API self-link
        let link = self
            .link
            .iter()
            .find(|l| l.rel.as_deref() == Some("scidir"))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.as_deref());

        Record::new(Source::ScienceDirect)
            .with_title(self.title.as_ref().and_then(TextValue::first))
            .with_authors(self.creator.as_ref().map(TextValue::values).unwrap_or_default())
            .with_venue(self.publication_name.as_ref().and_then(TextValue::first))
            .with_year(Year::from_text(year.as_deref()))
            .with_link(link)
    }
}

/// Elsevier ScienceDirect search provider (requires an API key)
pub struct ScienceDirectProvider {
    client: Client,
    base_url: String,
}

impl ScienceDirectProvider {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn build_search_url(&self, query: &SearchQuery) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/content/search/sciencedirect",
            self.base_url.trim_end_matches('/')
        ))
        .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("query", query.keyword())
            .append_pair("count", &query.max_results().to_string());

        Ok(url)
    }

    fn parse_response(body: &str) -> Result<Vec<Record>, ProviderError> {
        let envelope: SearchEnvelope = serde_json::from_str(body)
            .map_err(|e| ProviderError::Malformed(format!("Failed to parse JSON: {e}")))?;

        let entries = envelope.search_results.map(|r| r.entry).unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|entry| {
                if let Some(error) = &entry.error {
                    debug!("ScienceDirect entry skipped: {}", error);
                    return false;
                }
                true
            })
            .map(Entry::into_record)
            .collect())
    }

    async fn fetch(&self, query: &SearchQuery, api_key: &str) -> Result<Vec<Record>, ProviderError> {
        let url = self.build_search_url(query)?;
        debug!("ScienceDirect search URL: {}", url);

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body = response.text().await?;
        Self::parse_response(&body)
    }
}

#[async_trait]
impl SourceProvider for ScienceDirectProvider {
    fn source(&self) -> Source {
        Source::ScienceDirect
    }

    fn description(&self) -> &str {
        "ScienceDirect - Elsevier's full-text journal and book platform"
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
        credentials.science_direct_key().is_some()
    }

    #[instrument(skip_all, fields(provider = "science_direct"))]
    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        let Some(api_key) = query.credentials().science_direct_key() else {
            return ProviderOutcome::skipped(self.source(), "no ScienceDirect API key supplied");
        };

        info!("Searching ScienceDirect for: {}", query.keyword());
        ProviderOutcome::from_result(self.source(), self.fetch(query, api_key).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_skips_without_network() {
        // Unroutable base URL: any request attempt would fail, not skip
        let provider = ScienceDirectProvider::new("http://127.0.0.1:9", Client::new());
        let query = SearchQuery::new("catalysis", 5, Credentials::default()).unwrap();

        let outcome = provider.search(&query).await;
        assert!(matches!(outcome, ProviderOutcome::Skipped { .. }));
        assert!(!provider.has_credential(query.credentials()));
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "search-results": {
                "opensearch:totalResults": "1",
                "entry": [{
                    "dc:title": "Single-atom catalysis",
                    "dc:creator": "Bo Qiao",
                    "prism:publicationName": "Nature Chemistry",
                    "prism:coverDate": "2011-08-01",
                    "link": [
                        {"@ref": "self", "@href": "https://api.elsevier.com/content/article/pii/X"},
                        {"@ref": "scidir", "@href": "https://www.sciencedirect.com/science/article/pii/X"}
                    ]
                }]
            }
        }"#;

        let records = ScienceDirectProvider::parse_response(body).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "Single-atom catalysis");
        assert_eq!(record.authors, "Bo Qiao");
        assert_eq!(record.venue, "Nature Chemistry");
        assert_eq!(record.year, Year::Number(2011));
        assert_eq!(record.link, "https://www.sciencedirect.com/science/article/pii/X");
    }

    #[test]
    fn test_parse_wrapped_values() {
        let body = r#"{"search-results": {"entry": [{
            "dc:title": {"$": "Wrapped title"},
            "dc:creator": [{"$": "A. Author"}, {"$": "B. Author"}],
            "prism:coverDate": [{"@_fa": "true", "$": "2019-02-01"}]
        }]}}"#;

        let records = ScienceDirectProvider::parse_response(body).unwrap();
        assert_eq!(records[0].title, "Wrapped title");
        assert_eq!(records[0].authors, "A. Author, B. Author");
        assert_eq!(records[0].year, Year::Number(2019));
        assert_eq!(records[0].link, "N/A");
    }

    #[test]
    fn test_empty_result_marker_is_skipped() {
        let body = r#"{"search-results": {"entry": [{"@_fa": "true", "error": "Result set was empty"}]}}"#;
        let records = ScienceDirectProvider::parse_response(body).unwrap();
        assert!(records.is_empty());
    }
}
