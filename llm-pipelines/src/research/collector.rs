//! Web search and page content collection
//!
//! [`SearchProvider`] and [`PageFetcher`] are the seams to the network.
//! [`ContentCollector`] combines them: it finds candidate sources and turns
//! them into sources with readable text, substituting the search snippet when
//! a page cannot be fetched.

use super::types::Source;
use crate::config::{Settings, BROWSER_USER_AGENT};
use chrono::Local;
use llm_pipelines_sdk::{async_trait, StatusEvent, StatusReporter};
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const MAX_CONTENT_CHARS: usize = 5000;

const DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

impl From<SearchHit> for Source {
    fn from(hit: SearchHit) -> Self {
        Source::new(hit.url, hit.title, hit.snippet)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Never fails: provider errors are logged and yield an empty list.
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the cleaned, truncated text of the page.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

fn build_http_client(settings: &Settings) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(settings.request_timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Scrapes the DuckDuckGo HTML results page
pub struct DuckDuckGoSearch {
    http: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: build_http_client(settings),
            endpoint: DUCKDUCKGO_HTML_URL.to_string(),
        }
    }

    async fn fetch_results_page(&self, query: &str) -> Result<String, reqwest::Error> {
        self.http
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        match self.fetch_results_page(query).await {
            Ok(page) => {
                let hits = parse_duckduckgo_results(&page, max_results);
                tracing::info!(query, hits = hits.len(), "search complete");
                hits
            }
            Err(e) => {
                tracing::error!(query, error = %e, "search failed");
                Vec::new()
            }
        }
    }
}

/// Extracts result links, titles and snippets from a DuckDuckGo HTML page.
///
/// Each result runs from its `result__a` link up to the next one; a snippet is
/// only taken from inside that block.
pub fn parse_duckduckgo_results(page: &str, max_results: usize) -> Vec<SearchHit> {
    static LINK: OnceLock<Regex> = OnceLock::new();
    static SNIPPET: OnceLock<Regex> = OnceLock::new();
    let link = LINK.get_or_init(|| {
        Regex::new(r#"(?is)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
            .expect("static regex")
    });
    let snippet = SNIPPET.get_or_init(|| {
        Regex::new(r#"(?is)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).expect("static regex")
    });

    let links: Vec<regex::Captures> = link.captures_iter(page).collect();
    links
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let whole = c.get(0)?;
            let block_end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(page.len(), |m| m.start());
            let block = &page[whole.end()..block_end];
            Some(SearchHit {
                url: resolve_result_url(&c[1])?,
                title: html_to_text(&c[2]),
                snippet: snippet
                    .captures(block)
                    .map(|s| html_to_text(&s[1]))
                    .unwrap_or_default(),
            })
        })
        .take(max_results)
        .collect()
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`.
fn resolve_result_url(href: &str) -> Option<String> {
    let href = decode_entities(href);
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href
    };
    let parsed = reqwest::Url::parse(&absolute).ok()?;
    if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
        return Some(target.into_owned());
    }
    matches!(parsed.scheme(), "http" | "https").then(|| parsed.to_string())
}

/// Fetches pages over HTTP and reduces them to readable text
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: build_http_client(settings),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }
        let html = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(clean_html(&html))
    }
}

fn block_regexes() -> &'static [Regex] {
    static BLOCKS: OnceLock<Vec<Regex>> = OnceLock::new();
    BLOCKS.get_or_init(|| {
        ["script", "style", "noscript", "nav", "footer", "header", "aside"]
            .iter()
            .map(|tag| {
                Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("static regex")
            })
            .collect()
    })
}

fn region_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*)</{tag}\s*>")).expect("static regex")
}

/// Reduces an HTML document to at most [`MAX_CONTENT_CHARS`] of plain text.
///
/// Boilerplate elements are dropped; `<main>` is preferred over `<article>`,
/// which is preferred over `<body>`.
pub fn clean_html(html: &str) -> String {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    static REGIONS: OnceLock<Vec<Regex>> = OnceLock::new();

    let comment = COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
    let mut text = comment.replace_all(html, " ").into_owned();
    for re in block_regexes() {
        text = re.replace_all(&text, " ").into_owned();
    }

    let regions = REGIONS.get_or_init(|| ["main", "article", "body"].iter().map(|t| region_regex(t)).collect());
    let region = regions
        .iter()
        .find_map(|re| re.captures(&text).map(|c| c[1].to_string()))
        .unwrap_or(text);

    truncate_chars(&html_to_text(&region), MAX_CONTENT_CHARS)
}

/// Strips tags, decodes common entities and collapses whitespace.
pub fn html_to_text(fragment: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
    let stripped = tag.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Finds and fills sources for the research worker
pub struct ContentCollector {
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
}

impl ContentCollector {
    pub fn new(search: Arc<dyn SearchProvider>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { search, fetcher }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(DuckDuckGoSearch::new(settings)),
            Arc::new(HttpFetcher::new(settings)),
        )
    }

    pub async fn find_sources(&self, query: &str, max_results: usize) -> Vec<Source> {
        self.search
            .search(query, max_results)
            .await
            .into_iter()
            .map(Source::from)
            .collect()
    }

    /// Fills `content` for the first `max_sources` sources.
    ///
    /// A fetch error or empty page falls back to the snippet; sources that end
    /// up with no text at all are dropped.
    pub async fn collect(
        &self,
        sources: &[Source],
        max_sources: usize,
        reporter: &mut StatusReporter,
    ) -> Vec<Source> {
        let mut collected = Vec::new();
        for source in sources.iter().take(max_sources) {
            let title: String = source.title.chars().take(50).collect();
            reporter.emit(StatusEvent::new("EXTRACT", format!("Extracting: {}...", title)).from_agent("worker"));

            let mut filled = source.clone();
            filled.content = match self.fetcher.fetch(&source.url).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => source.snippet.clone(),
                Err(e) => {
                    tracing::warn!(url = %source.url, error = %e, "fetch failed, using snippet");
                    source.snippet.clone()
                }
            };
            filled.accessed_at = Some(Local::now());

            if !filled.content.trim().is_empty() {
                collected.push(filled);
            }
        }
        collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_prefers_main_and_drops_boilerplate() {
        let html = r#"<html><head><style>body{}</style></head><body>
            <nav>Home | About</nav>
            <article>article text</article>
            <main><h1>Title</h1><script>var x = 1;</script><p>Main &amp; only</p></main>
            <footer>copyright</footer></body></html>"#;
        assert_eq!(clean_html(html), "Title Main & only");
    }

    #[test]
    fn test_clean_html_falls_back_to_article_then_body() {
        assert_eq!(clean_html("<body><article><p>A</p></article><p>B</p></body>"), "A");
        assert_eq!(clean_html("<body><header>H</header><p>B  c</p></body>"), "B c");
    }

    #[test]
    fn test_clean_html_truncates() {
        let html = format!("<body>{}</body>", "é".repeat(MAX_CONTENT_CHARS + 100));
        assert_eq!(clean_html(&html).chars().count(), MAX_CONTENT_CHARS);
    }

    #[test]
    fn test_parse_duckduckgo_results() {
        let page = r#"
            <div class="result">
              <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.org%2Fqc&amp;rut=abc">Quantum <b>Computing</b></a>
              <a class="result__snippet" href="x">An intro to <b>qubits</b></a>
            </div>
            <div class="result">
              <a rel="nofollow" class="result__a" href="https://direct.example.com/page">Direct</a>
              <a class="result__snippet" href="y">Second</a>
            </div>"#;
        let hits = parse_duckduckgo_results(page, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://example.org/qc");
        assert_eq!(hits[0].title, "Quantum Computing");
        assert_eq!(hits[0].snippet, "An intro to qubits");
        assert_eq!(hits[1].url, "https://direct.example.com/page");

        assert_eq!(parse_duckduckgo_results(page, 1).len(), 1);
    }

    #[test]
    fn test_parse_duckduckgo_results_keeps_snippets_with_their_link() {
        let page = r#"
            <div class="result"><div class="result__body">
              <a class="result__a" href="https://a.example/">A</a>
            </div></div>
            <div class="result"><div class="result__body">
              <a class="result__a" href="https://b.example/">B</a>
              <a class="result__snippet" href="b">snippet for B</a>
            </div></div>"#;
        let hits = parse_duckduckgo_results(page, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].url, "https://a.example/");
        assert_eq!(hits[0].snippet, "");
        assert_eq!(hits[1].url, "https://b.example/");
        assert_eq!(hits[1].snippet, "snippet for B");
    }
}
