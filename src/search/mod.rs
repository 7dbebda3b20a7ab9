//! Web search abstraction.
//!
//! The title resolver and streaming lookup only need "give me the top few
//! results for this query", so that is the whole trait. The production
//! implementation scrapes the DuckDuckGo HTML endpoint, which needs no API
//! key; markup drift degrades results to an empty set rather than a crash.

use crate::error::{KinoError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// A single web search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Minimal web search capability.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return up to `max_results` hits for the query. May return fewer, or
    /// none at all.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

const DDG_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// DuckDuckGo HTML endpoint scraper.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; kino/0.1)")
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        debug!("Searching DuckDuckGo for: '{}'", query);

        let response = self
            .client
            .get(DDG_ENDPOINT)
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(KinoError::Search(format!(
                "Search endpoint returned {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(parse_results(&body, max_results))
    }
}

fn result_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#)
            .expect("valid regex")
    })
}

fn result_snippet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).expect("valid regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Extract result anchors and snippets from the DuckDuckGo HTML page.
fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let snippets: Vec<String> = result_snippet_re()
        .captures_iter(html)
        .map(|c| strip_html(&c[1]))
        .collect();

    result_link_re()
        .captures_iter(html)
        .take(max_results)
        .enumerate()
        .map(|(i, c)| SearchHit {
            title: strip_html(&c[2]),
            snippet: snippets.get(i).cloned().unwrap_or_default(),
            url: resolve_redirect(&c[1]),
        })
        .collect()
}

/// Drop tags and decode the handful of entities DuckDuckGo emits.
fn strip_html(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, "");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .trim()
        .to_string()
}

/// DuckDuckGo links go through a redirect with the target in the `uddg`
/// query parameter; unwrap it when present.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    if let Ok(parsed) = url::Url::parse(&absolute) {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "uddg") {
            return target.to_string();
        }
    }

    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
      <div class="result">
        <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.imdb.com%2Ftitle%2Ftt1375666%2F&amp;rut=abc">Inception (2010) - IMDb</a>
        <a class="result__snippet" href="#">A thief who steals corporate secrets through <b>dream</b>-sharing technology...</a>
      </div>
      <div class="result">
        <a rel="nofollow" class="result__a" href="https://en.wikipedia.org/wiki/Inception">Inception - Wikipedia</a>
        <a class="result__snippet" href="#">Inception is a 2010 science fiction film...</a>
      </div>
    "##;

    #[test]
    fn test_parse_results_extracts_title_snippet_url() {
        let hits = parse_results(PAGE, 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Inception (2010) - IMDb");
        assert!(hits[0].snippet.contains("dream-sharing technology"));
        assert_eq!(hits[0].url, "https://www.imdb.com/title/tt1375666/");
        assert_eq!(hits[1].url, "https://en.wikipedia.org/wiki/Inception");
    }

    #[test]
    fn test_parse_results_respects_max() {
        let hits = parse_results(PAGE, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_parse_results_empty_page() {
        assert!(parse_results("<html></html>", 3).is_empty());
    }

    #[test]
    fn test_strip_html_decodes_entities() {
        assert_eq!(strip_html("Tom &amp; Jerry <b>movie</b>"), "Tom & Jerry movie");
    }
}
