//! Fetching of agency source pages and discovery of candidate PDF links.
//!
//! Page markup in the wild is too inconsistent for a strict parser; anchors
//! are pulled with regexes the same way feed items are, then classified by
//! link text and filename cues.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Document classification derived from link text and filename cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Minutes,
    Package,
    Other,
}

/// One candidate PDF discovered on a source page.
#[derive(Debug, Clone)]
pub struct DiscoveredDocument {
    pub url: String,
    pub file_name: String,
    pub link_text: String,
    pub kind: DocumentKind,
    pub date: Option<NaiveDate>,
}

/// Consolidates regexes for page scanning to avoid per-call overhead.
struct PageRegex {
    anchor: Regex,
    tag: Regex,
    iso_date: Regex,
    us_date: Regex,
    long_date: Regex,
}

impl PageRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<PageRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    anchor: Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
                        .ok()?,
                    tag: Regex::new(r"(?s)<[^>]+>").ok()?,
                    iso_date: Regex::new(r"(\d{4})-(\d{2})-(\d{2})").ok()?,
                    us_date: Regex::new(r"(\d{1,2})[/-](\d{1,2})[/-](\d{4})").ok()?,
                    long_date: Regex::new(
                        r"(?i)(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})",
                    )
                    .ok()?,
                })
            })
            .as_ref()
    }
}

fn month_number(name: &str) -> Option<u32> {
    let months = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    months
        .iter()
        .position(|m| name.eq_ignore_ascii_case(m))
        .map(|i| u32::try_from(i + 1).unwrap_or(1))
}

/// Best-effort date from link text first, then the URL itself.
fn extract_date(text: &str, href: &str) -> Option<NaiveDate> {
    let re = PageRegex::get()?;

    for haystack in [text, href] {
        if let Some(caps) = re.iso_date.captures(haystack) {
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }

        if let Some(caps) = re.us_date.captures(haystack) {
            let month = caps[1].parse().ok()?;
            let day = caps[2].parse().ok()?;
            let year = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }

        if let Some(caps) = re.long_date.captures(haystack) {
            let month = month_number(&caps[1])?;
            let day = caps[2].parse().ok()?;
            let year = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }

    None
}

fn classify(text: &str, file_name: &str) -> DocumentKind {
    let haystack = format!("{} {}", text.to_lowercase(), file_name.to_lowercase());

    if haystack.contains("minutes") {
        DocumentKind::Minutes
    } else if haystack.contains("packet")
        || haystack.contains("package")
        || haystack.contains("agenda")
    {
        DocumentKind::Package
    } else {
        DocumentKind::Other
    }
}

fn is_pdf_href(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn file_name_of(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map_or_else(|| "document.pdf".to_string(), str::to_string)
}

/// Scans fetched page markup for anchors pointing at PDFs, resolving relative
/// hrefs against the page URL. Unresolvable hrefs are skipped.
#[must_use]
pub fn discover_documents(page_url: &str, html: &str) -> Vec<DiscoveredDocument> {
    let Some(re) = PageRegex::get() else {
        return Vec::new();
    };

    let Ok(base) = Url::parse(page_url) else {
        warn!("Invalid source page URL: {}", page_url);
        return Vec::new();
    };

    let mut seen = std::collections::HashSet::new();
    let mut documents = Vec::new();

    for caps in re.anchor.captures_iter(html) {
        let href = html_escape::decode_html_entities(&caps[1]).to_string();

        if !is_pdf_href(&href) {
            continue;
        }

        let Ok(resolved) = base.join(&href) else {
            debug!("Skipping unresolvable href: {}", href);
            continue;
        };

        if !seen.insert(resolved.to_string()) {
            continue;
        }

        let raw_text = re.tag.replace_all(&caps[2], " ");
        let link_text = html_escape::decode_html_entities(raw_text.trim())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let file_name = file_name_of(&resolved);
        let kind = classify(&link_text, &file_name);
        let date = extract_date(&link_text, resolved.as_str());

        documents.push(DiscoveredDocument {
            url: resolved.to_string(),
            file_name,
            link_text,
            kind,
            date,
        });
    }

    documents
}

/// Network seam of the pipeline. The HTTP implementation is the production
/// fetcher; tests substitute a canned one.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetches a source page and returns its markup.
    async fn fetch_page(&self, url: &str) -> Result<String>;

    /// Downloads a document and returns its bytes.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    attempts: u32,
    backoff: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with a dedicated HTTP client.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be built (e.g., due to system TLS
    /// configuration issues).
    #[must_use]
    pub fn new(timeout: Duration, user_agent: &str, attempts: u32, backoff: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Preferred constructor when using `SharedState`: reuses the pooled client.
    #[must_use]
    pub const fn with_shared_client(client: Client, attempts: u32, backoff: Duration) -> Self {
        Self {
            client,
            attempts,
            backoff,
        }
    }

    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut delay = self.backoff;
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            match self.client.get(url).send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => return Ok(response),
                    Err(e) => last_error = Some(anyhow::Error::from(e)),
                },
                Err(e) => last_error = Some(anyhow::Error::from(e)),
            }

            if attempt < self.attempts {
                debug!(
                    "Fetch attempt {}/{} failed for {}, retrying in {:?}",
                    attempt, self.attempts, url, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Fetch failed: {url}")))
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.get_with_retry(url).await?;
        Ok(response.text().await?)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get_with_retry(url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"
        <html><body>
        <a href="/docs/council-minutes-2025-06-17.pdf">Council Minutes - June 17, 2025</a>
        <a href="https://cdn.example.gov/packets/agenda-packet-06-17-2025.PDF">Agenda&nbsp;Packet</a>
        <a href="/docs/budget.xlsx">Budget</a>
        <a href="/docs/notice.pdf?rev=2">Public Notice</a>
        <a href="/docs/council-minutes-2025-06-17.pdf">Duplicate link</a>
        </body></html>
    "#;

    #[test]
    fn test_discovers_only_pdfs_and_dedupes() {
        let docs = discover_documents("https://example.gov/meetings", SAMPLE_PAGE);

        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(|d| d.url.to_lowercase().contains(".pdf")));
    }

    #[test]
    fn test_resolves_relative_hrefs() {
        let docs = discover_documents("https://example.gov/meetings/2025/", SAMPLE_PAGE);

        assert_eq!(
            docs[0].url,
            "https://example.gov/docs/council-minutes-2025-06-17.pdf"
        );
    }

    #[test]
    fn test_classification() {
        let docs = discover_documents("https://example.gov/meetings", SAMPLE_PAGE);

        assert_eq!(docs[0].kind, DocumentKind::Minutes);
        assert_eq!(docs[1].kind, DocumentKind::Package);
        assert_eq!(docs[2].kind, DocumentKind::Other);
    }

    #[test]
    fn test_date_extraction_from_text_and_url() {
        let docs = discover_documents("https://example.gov/meetings", SAMPLE_PAGE);

        let expected = NaiveDate::from_ymd_opt(2025, 6, 17).unwrap();
        assert_eq!(docs[0].date, Some(expected));
        assert_eq!(docs[1].date, Some(expected));
        assert_eq!(docs[2].date, None);
    }

    #[test]
    fn test_entity_decoding_in_link_text() {
        let docs = discover_documents("https://example.gov/meetings", SAMPLE_PAGE);
        assert_eq!(docs[1].link_text, "Agenda Packet");
    }

    #[test]
    fn test_invalid_base_url_yields_nothing() {
        let docs = discover_documents("not a url", SAMPLE_PAGE);
        assert!(docs.is_empty());
    }
}
