pub mod meta_search;
pub mod providers;

pub use meta_search::{FanOutResult, MetaSearchClient, MetaSearchConfig, ProviderReport, ProviderStatus};

use crate::config::HttpSettings;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Placeholder for missing text fields
pub const UNKNOWN: &str = "Unknown";
/// Placeholder for a missing year or link
pub const NOT_AVAILABLE: &str = "N/A";

/// HTTP client configuration for provider integration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        HttpSettings::default().into()
    }
}

impl From<HttpSettings> for HttpClientConfig {
    fn from(settings: HttpSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            connect_timeout: settings.connect_timeout(),
            max_redirects: 10,
            user_agent: settings.user_agent,
        }
    }
}

impl HttpClientConfig {
    /// Build the shared `reqwest` client. Every adapter request inherits its timeouts.
    pub fn build(&self) -> crate::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects))
            .user_agent(self.user_agent.clone())
            .gzip(true)
            .build()?;
        Ok(client)
    }
}

/// External provider a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    #[serde(rename = "Google Scholar")]
    GoogleScholar,
    #[serde(rename = "CrossRef")]
    CrossRef,
    #[serde(rename = "Semantic Scholar")]
    SemanticScholar,
    #[serde(rename = "ScienceDirect")]
    ScienceDirect,
    #[serde(rename = "IEEE Xplore")]
    IeeeXplore,
}

impl Source {
    /// Fan-out submission order; first-seen-wins deduplication keys off it
    pub const ALL: [Self; 5] = [
        Self::GoogleScholar,
        Self::CrossRef,
        Self::SemanticScholar,
        Self::ScienceDirect,
        Self::IeeeXplore,
    ];

    /// Stable machine identifier
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::GoogleScholar => "google_scholar",
            Self::CrossRef => "crossref",
            Self::SemanticScholar => "semantic_scholar",
            Self::ScienceDirect => "science_direct",
            Self::IeeeXplore => "ieee_xplore",
        }
    }

    /// Human readable name, as written in exports
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::GoogleScholar => "Google Scholar",
            Self::CrossRef => "CrossRef",
            Self::SemanticScholar => "Semantic Scholar",
            Self::ScienceDirect => "ScienceDirect",
            Self::IeeeXplore => "IEEE Xplore",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Publication year as reported by a provider.
///
/// Providers disagree on the type: some send integers, some date strings.
/// Numeric strings are stored as numbers so exports stay uniform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Year {
    Number(i32),
    Text(String),
    #[default]
    Unknown,
}

impl Year {
    #[must_use]
    pub fn from_number(value: Option<i64>) -> Self {
        value
            .and_then(|v| i32::try_from(v).ok())
            .map_or(Self::Unknown, Self::Number)
    }

    #[must_use]
    pub fn from_text(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Unknown,
            Some(text) => text
                .parse::<i32>()
                .map_or_else(|_| Self::Text(text.to_string()), Self::Number),
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(year) => write!(f, "{year}"),
            Self::Text(text) => f.write_str(text),
            Self::Unknown => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(year) => serializer.serialize_i32(*year),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Unknown => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// Canonical paper record flowing through the pipeline.
///
/// Text fields are never empty: adapters fill gaps with [`UNKNOWN`] or
/// [`NOT_AVAILABLE`]. `relevance` stays `None` until the ranker scores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Authors")]
    pub authors: String,
    #[serde(rename = "Journal")]
    pub venue: String,
    #[serde(rename = "Year")]
    pub year: Year,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Source")]
    pub source: Source,
    #[serde(rename = "Relevance")]
    pub relevance: Option<u8>,
}

impl Record {
    /// Create a record with every field at its fallback value
    #[must_use]
    pub fn new(source: Source) -> Self {
        Self {
            title: UNKNOWN.to_string(),
            authors: UNKNOWN.to_string(),
            venue: UNKNOWN.to_string(),
            year: Year::Unknown,
            link: NOT_AVAILABLE.to_string(),
            source,
            relevance: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<&str>) -> Self {
        self.title = text_or(title, UNKNOWN);
        self
    }

    /// Join author names with `", "`, skipping blanks
    #[must_use]
    pub fn with_authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = authors
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.authors = if joined.is_empty() {
            UNKNOWN.to_string()
        } else {
            joined
        };
        self
    }

    #[must_use]
    pub fn with_venue(mut self, venue: Option<&str>) -> Self {
        self.venue = text_or(venue, UNKNOWN);
        self
    }

    #[must_use]
    pub fn with_year(mut self, year: Year) -> Self {
        self.year = year;
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: Option<&str>) -> Self {
        self.link = text_or(link, NOT_AVAILABLE);
        self
    }

    /// Deduplication key: the case-folded title, nothing else normalized
    #[must_use]
    pub fn dedupe_key(&self) -> String {
        self.title.to_lowercase()
    }
}

fn text_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}
