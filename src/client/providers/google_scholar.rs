use super::traits::{status_error, ProviderError, ProviderOutcome, SearchQuery, SourceProvider};
use crate::client::{Record, Source, Year};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::VecDeque;
use tracing::{debug, info, instrument};
use url::Url;

/// Scholar serves result pages of ten entries unless told otherwise
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Scholar rejects obvious non-browser agents
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Markers Scholar serves instead of results when it suspects automation
const CAPTCHA_MARKERS: [&str; 3] = ["gs_captcha_ccl", "g-recaptcha", "unusual traffic"];

/// One entry scraped from a Scholar result page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScholarEntry {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    /// Publication year parsed from the byline
    pub pub_year: Option<i32>,
    pub link: Option<String>,
}

impl ScholarEntry {
    #[must_use]
    pub fn into_record(self) -> Record {
        Record::new(Source::GoogleScholar)
            .with_title(self.title.as_deref())
            .with_authors(&self.authors)
            .with_venue(self.venue.as_deref())
            .with_year(Year::from_number(self.pub_year.map(i64::from)))
            .with_link(self.link.as_deref())
    }
}

/// Lazy cursor over Scholar results.
///
/// Pages are fetched only when the buffered entries run out. A page shorter
/// than the page size marks the stream as exhausted. The cursor cannot be
/// rewound; start a new one with [`GoogleScholarProvider::cursor`].
pub struct ScholarCursor<'a> {
    provider: &'a GoogleScholarProvider,
    keyword: String,
    next_start: u32,
    buffer: VecDeque<ScholarEntry>,
    exhausted: bool,
}

impl ScholarCursor<'_> {
    /// Advance the cursor by one entry; `Ok(None)` once the stream is exhausted
    pub async fn next_entry(&mut self) -> Result<Option<ScholarEntry>, ProviderError> {
        if let Some(entry) = self.buffer.pop_front() {
            return Ok(Some(entry));
        }
        if self.exhausted {
            return Ok(None);
        }

        let page = self.provider.fetch_page(&self.keyword, self.next_start).await?;
        debug!(
            "Scholar page at offset {} returned {} entries",
            self.next_start,
            page.len()
        );

        if page.len() < self.provider.page_size as usize {
            self.exhausted = true;
        }
        self.next_start += self.provider.page_size;
        self.buffer.extend(page);

        Ok(self.buffer.pop_front())
    }

    /// Whether every entry has been handed out
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.buffer.is_empty()
    }
}

/// Google Scholar provider, scraping the public result pages
pub struct GoogleScholarProvider {
    client: Client,
    base_url: String,
    page_size: u32,
}

impl GoogleScholarProvider {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Open a fresh cursor over the results for `keyword`
    #[must_use]
    pub fn cursor(&self, keyword: &str) -> ScholarCursor<'_> {
        ScholarCursor {
            provider: self,
            keyword: keyword.to_string(),
            next_start: 0,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn build_page_url(&self, keyword: &str, start: u32) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/scholar", self.base_url.trim_end_matches('/')))
            .map_err(|e| ProviderError::Other(format!("Invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("q", keyword)
            .append_pair("hl", "en")
            .append_pair("start", &start.to_string())
            .append_pair("num", &self.page_size.to_string());

        Ok(url)
    }

    async fn fetch_page(&self, keyword: &str, start: u32) -> Result<Vec<ScholarEntry>, ProviderError> {
        let url = self.build_page_url(keyword, start)?;
        debug!("Scholar page URL: {}", url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let html = response.text().await?;
        if CAPTCHA_MARKERS.iter().any(|marker| html.contains(marker)) {
            return Err(ProviderError::RateLimited);
        }

        parse_results_page(&html)
    }
}

fn selector(css: &str) -> Result<Selector, ProviderError> {
    Selector::parse(css).map_err(|e| ProviderError::Other(format!("Invalid CSS selector {css}: {e}")))
}

fn regex(pattern: &str) -> Result<Regex, ProviderError> {
    Regex::new(pattern).map_err(|e| ProviderError::Other(format!("Invalid pattern {pattern}: {e}")))
}

/// Byline parsing patterns, compiled once per page
struct BylinePatterns {
    year: Regex,
    trailing_year: Regex,
    markers: Regex,
}

impl BylinePatterns {
    fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            year: regex(r"\b(1[6-9]\d{2}|20\d{2})\b")?,
            trailing_year: regex(r",?\s*\b(1[6-9]\d{2}|20\d{2})\s*$")?,
            markers: regex(r"^(\s*\[[^\]]*\])+\s*")?,
        })
    }
}

/// Parse one Scholar result page into entries
pub(crate) fn parse_results_page(html: &str) -> Result<Vec<ScholarEntry>, ProviderError> {
    let document = Html::parse_document(html);
    let result_sel = selector(".gs_r.gs_or.gs_scl")?;
    let title_sel = selector(".gs_rt")?;
    let link_sel = selector(".gs_rt a")?;
    let byline_sel = selector(".gs_a")?;
    let patterns = BylinePatterns::new()?;

    let entries = document
        .select(&result_sel)
        .map(|element| {
            let link_element = element.select(&link_sel).next();
            let title = link_element
                .or_else(|| element.select(&title_sel).next())
                .map(|e| clean_title(e, &patterns));

            let link = link_element
                .and_then(|e| e.value().attr("href"))
                .map(ToString::to_string);

            let byline = element
                .select(&byline_sel)
                .next()
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default();
            let (authors, venue, pub_year) = parse_byline(&byline, &patterns);

            ScholarEntry {
                title,
                authors,
                venue,
                pub_year,
                link,
            }
        })
        .collect();

    Ok(entries)
}

fn clean_title(element: ElementRef<'_>, patterns: &BylinePatterns) -> String {
    let text = element.text().collect::<String>();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    patterns.markers.replace(&collapsed, "").trim().to_string()
}

/// Split a byline such as `"J Zhou, G Cui… - AI open, 2020 - Elsevier"`
/// into authors, venue and publication year
fn parse_byline(byline: &str, patterns: &BylinePatterns) -> (Vec<String>, Option<String>, Option<i32>) {
    let normalized = byline.replace('\u{a0}', " ");
    let parts: Vec<&str> = normalized.split(" - ").map(str::trim).collect();

    let authors = parts
        .first()
        .map(|names| {
            names
                .split(',')
                .map(|name| name.trim().trim_matches('…').trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    // With two parts the tail is usually just the hosting domain
    let middle = match parts.len() {
        0 | 1 => None,
        2 if looks_like_host(parts[1]) => None,
        _ => Some(parts[1]),
    };

    let pub_year = middle.and_then(|m| {
        patterns
            .year
            .find_iter(m)
            .last()
            .and_then(|found| found.as_str().parse::<i32>().ok())
    });

    let venue = middle
        .map(|m| {
            patterns
                .trailing_year
                .replace(m, "")
                .trim_matches(|c: char| c == '…' || c == ',' || c.is_whitespace())
                .to_string()
        })
        .filter(|venue| !venue.is_empty());

    (authors, venue, pub_year)
}

fn looks_like_host(text: &str) -> bool {
    text.contains('.') && !text.contains(char::is_whitespace)
}

#[async_trait]
impl SourceProvider for GoogleScholarProvider {
    fn source(&self) -> Source {
        Source::GoogleScholar
    }

    fn description(&self) -> &str {
        "Google Scholar - broad scholarly literature search engine"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn http(&self) -> &Client {
        &self.client
    }

    #[instrument(skip_all, fields(provider = "google_scholar"))]
    async fn search(&self, query: &SearchQuery) -> ProviderOutcome {
        info!("Searching Google Scholar for: {}", query.keyword());

        let wanted = query.max_results() as usize;
        let mut cursor = self.cursor(query.keyword());
        let mut records = Vec::with_capacity(wanted.min(100));

        while records.len() < wanted {
            match cursor.next_entry().await {
                Ok(Some(entry)) => records.push(entry.into_record()),
                Ok(None) => {
                    debug!(
                        "Scholar results exhausted after {} of {} entries",
                        records.len(),
                        wanted
                    );
                    break;
                }
                Err(error) => return ProviderOutcome::failed(self.source(), error, records),
            }
        }

        ProviderOutcome::from_result(self.source(), Ok(records))
    }
}
