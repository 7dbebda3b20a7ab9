//! Movie lookup tools.
//!
//! One [`ToolContext`] owns every external collaborator the four tools
//! need: the web search provider, the optional text-generation backend for
//! title refinement, the result cache and the OMDb/YouTube API keys.
//! Dispatch is an exhaustive match on [`ToolKind`].

use super::{clean_movie_title, MovieDetails, ToolInvoker, ToolKind, ToolOutput, FOUND_MARKER};
use crate::cache::SearchCache;
use crate::error::{KinoError, Result};
use crate::llm::TextGenerator;
use crate::search::SearchProvider;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OMDB_ENDPOINT: &str = "https://www.omdbapi.com/";
const YOUTUBE_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

/// Tool execution context with access to search, the LLM and the cache.
pub struct ToolContext {
    http: reqwest::Client,
    search: Arc<dyn SearchProvider>,
    llm: Option<Arc<dyn TextGenerator>>,
    cache: SearchCache,
    omdb_api_key: Option<String>,
    youtube_api_key: Option<String>,
    /// How many web results the title resolver and streaming lookup ask for.
    max_results: usize,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(
        search: Arc<dyn SearchProvider>,
        llm: Option<Arc<dyn TextGenerator>>,
        cache: SearchCache,
        omdb_api_key: Option<String>,
        youtube_api_key: Option<String>,
        max_results: usize,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            search,
            llm,
            cache,
            omdb_api_key,
            youtube_api_key,
            max_results,
        }
    }

    /// Resolve a free-text movie description to a canonical title.
    ///
    /// Returns `"Found via search: <title>"` on success or `"Search failed."`
    /// on any miss or failure; this tool never surfaces an error.
    pub async fn resolve_title(&self, query: &str) -> String {
        if let Some(cached) = self.cache.get(query) {
            info!("Cache hit: using '{}' for '{}'", cached, query);
            return format!("{} {}", FOUND_MARKER, cached);
        }

        match self.resolve_via_search(query).await {
            Ok(title) => {
                // Keyed by the original query so the next phrasing of the
                // same question hits the cache.
                self.cache.put(query, &title);
                format!("{} {}", FOUND_MARKER, title)
            }
            Err(e) => {
                warn!("Title search failed for '{}': {}", query, e);
                "Search failed.".to_string()
            }
        }
    }

    async fn resolve_via_search(&self, query: &str) -> Result<String> {
        let hits = self
            .search
            .search(&format!("movie title {}", query), self.max_results)
            .await?;

        let top = hits
            .first()
            .ok_or_else(|| KinoError::Search("No results".to_string()))?;

        // Default candidate is the top result; the LLM refines it when
        // available.
        let mut final_title = top.title.clone();

        if let Some(llm) = &self.llm {
            let snippets = hits
                .iter()
                .map(|hit| format!("- {}: {}", hit.title, hit.snippet))
                .collect::<Vec<_>>()
                .join("\n");

            let prompt = format!(
                "Search Query: \"{}\"\n\
                 Search Results:\n{}\n\n\
                 Identify the specific movie title described. Return ONLY the title.",
                query, snippets
            );

            let extracted = llm.generate(&prompt).await?;
            final_title = clean_movie_title(extracted.trim());
        }

        Ok(final_title)
    }

    /// Fetch movie details from OMDb, falling back to fuzzy search when the
    /// exact-title lookup misses.
    pub async fn fetch_details(&self, movie_title: &str) -> Result<ToolOutput> {
        let title = clean_movie_title(movie_title);

        let Some(api_key) = &self.omdb_api_key else {
            return Ok(ToolOutput::Error("Error: OMDb API key missing.".to_string()));
        };

        debug!("OMDb request -> t='{}'", title);
        let data: serde_json::Value = self
            .http
            .get(OMDB_ENDPOINT)
            .query(&[("apikey", api_key.as_str()), ("t", title.as_str())])
            .send()
            .await?
            .json()
            .await?;

        if data["Response"] == "True" {
            return Ok(ToolOutput::Details(MovieDetails {
                title: field(&data, "Title"),
                year: opt_field(&data, "Year"),
                rating: opt_field(&data, "imdbRating"),
                plot: opt_field(&data, "Plot"),
                director: opt_field(&data, "Director"),
                note: None,
            }));
        }

        // Fuzzy fallback: 's' search instead of exact 't'.
        debug!("OMDb exact match failed for '{}', trying fuzzy search", title);
        let data: serde_json::Value = self
            .http
            .get(OMDB_ENDPOINT)
            .query(&[("apikey", api_key.as_str()), ("s", title.as_str())])
            .send()
            .await?
            .json()
            .await?;

        if data["Response"] == "True" {
            if let Some(first) = data["Search"].as_array().and_then(|s| s.first()) {
                return Ok(ToolOutput::Details(MovieDetails {
                    title: field(first, "Title"),
                    year: opt_field(first, "Year"),
                    rating: None,
                    plot: None,
                    director: None,
                    note: Some("Exact match failed, found closest result.".to_string()),
                }));
            }
        }

        Ok(ToolOutput::Error(format!(
            "Error: Movie '{}' not found in OMDb.",
            title
        )))
    }

    /// Fetch the YouTube trailer URL for a movie.
    pub async fn fetch_trailer(&self, movie_title: &str) -> Result<ToolOutput> {
        let Some(api_key) = &self.youtube_api_key else {
            return Ok(ToolOutput::Error("Error: YouTube API Key missing.".to_string()));
        };

        let title = clean_movie_title(movie_title);
        let query = format!("{} official trailer", title);
        let data: serde_json::Value = self
            .http
            .get(YOUTUBE_ENDPOINT)
            .query(&[
                ("key", api_key.as_str()),
                ("q", query.as_str()),
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        let video_id = data["items"]
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item["id"]["videoId"].as_str());

        match video_id {
            Some(id) => Ok(ToolOutput::Text(format!(
                "https://www.youtube.com/watch?v={}",
                id
            ))),
            None => Ok(ToolOutput::Text("Trailer not found.".to_string())),
        }
    }

    /// Find where a movie is available for streaming via web search.
    pub async fn fetch_streaming(&self, movie_title: &str) -> Result<ToolOutput> {
        let title = clean_movie_title(movie_title);

        let hits = match self
            .search
            .search(&format!("where to watch {} streaming", title), self.max_results)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Streaming search failed for '{}': {}", title, e);
                return Ok(ToolOutput::Text("Streaming info unavailable.".to_string()));
            }
        };

        if hits.is_empty() {
            return Ok(ToolOutput::Text("Streaming info not found.".to_string()));
        }

        let lines = hits
            .iter()
            .map(|hit| format!("{}: {}", hit.title, hit.url))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolOutput::Text(lines))
    }
}

#[async_trait]
impl ToolInvoker for ToolContext {
    async fn invoke(&self, tool: ToolKind, arg: &str) -> Result<ToolOutput> {
        match tool {
            ToolKind::TitleSearch => Ok(ToolOutput::Text(self.resolve_title(arg).await)),
            ToolKind::MovieDetails => self.fetch_details(arg).await,
            ToolKind::YoutubeTrailer => self.fetch_trailer(arg).await,
            ToolKind::StreamingInfo => self.fetch_streaming(arg).await,
        }
    }
}

fn field(value: &serde_json::Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

fn opt_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value[key].as_str().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchHit;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct ScriptedSearch {
        hits: Vec<SearchHit>,
        calls: AtomicUsize,
        requested: Mutex<Vec<usize>>,
    }

    impl ScriptedSearch {
        fn new(hits: Vec<SearchHit>) -> Self {
            Self {
                hits,
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn empty() -> Self {
            Self::new(Vec::new())
        }

        fn requested(&self) -> Vec<usize> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchProvider for ScriptedSearch {
        async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(max_results);
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }
    }

    struct ScriptedGenerator {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| KinoError::Llm("script exhausted".to_string()))
        }
    }

    fn hit(title: &str, snippet: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            snippet: snippet.to_string(),
            url: "https://example.com".to_string(),
        }
    }

    fn context(
        search: ScriptedSearch,
        llm: Option<Arc<dyn TextGenerator>>,
        cache: SearchCache,
    ) -> ToolContext {
        ToolContext::new(Arc::new(search), llm, cache, None, None, 3)
    }

    #[tokio::test]
    async fn test_resolver_cache_hit_skips_search() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        cache.put("a sci-fi movie about dreams", "Inception");

        let search = ScriptedSearch::empty();
        let ctx = context(search, None, cache);

        let output = ctx.resolve_title("A Sci-Fi Movie About Dreams").await;
        assert_eq!(output, "Found via search: Inception");
    }

    #[tokio::test]
    async fn test_resolver_empty_results_is_search_failed() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let ctx = context(ScriptedSearch::empty(), None, cache.clone());

        let output = ctx.resolve_title("a movie nobody made").await;
        assert_eq!(output, "Search failed.");
        // No cache write on failure.
        assert_eq!(cache.get("a movie nobody made"), None);
    }

    #[tokio::test]
    async fn test_resolver_defaults_to_top_hit_without_llm() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let search = ScriptedSearch::new(vec![
            hit("Arrival", "2016 film"),
            hit("Arrival (disambiguation)", "other uses"),
        ]);
        let ctx = context(search, None, cache);

        let output = ctx.resolve_title("the linguist alien movie").await;
        assert_eq!(output, "Found via search: Arrival");
    }

    #[tokio::test]
    async fn test_resolver_llm_refinement_is_cleaned_and_cached() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let search = ScriptedSearch::new(vec![hit(
            "Inception (2010) - IMDb",
            "dream heist thriller",
        )]);
        let llm: Arc<dyn TextGenerator> =
            Arc::new(ScriptedGenerator::new(&["\"Inception\" (2010)"]));
        let ctx = context(search, Some(llm), cache.clone());

        let output = ctx.resolve_title("The Dream Heist Movie").await;
        assert_eq!(output, "Found via search: Inception");
        // Cached under the original (normalized) query, cleaned title.
        assert_eq!(cache.get("the dream heist movie"), Some("Inception".to_string()));
    }

    #[tokio::test]
    async fn test_resolver_llm_failure_is_search_failed() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let search = ScriptedSearch::new(vec![hit("Inception", "dreams")]);
        let llm: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::new(&[]));
        let ctx = context(search, Some(llm), cache);

        let output = ctx.resolve_title("dream movie").await;
        assert_eq!(output, "Search failed.");
    }

    #[tokio::test]
    async fn test_trailer_without_api_key_is_error_output() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let ctx = context(ScriptedSearch::empty(), None, cache);

        let output = ctx.fetch_trailer("Inception").await.unwrap();
        assert_eq!(
            output,
            ToolOutput::Error("Error: YouTube API Key missing.".to_string())
        );
    }

    #[tokio::test]
    async fn test_details_without_api_key_is_error_output() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let ctx = context(ScriptedSearch::empty(), None, cache);

        let output = ctx.fetch_details("Inception").await.unwrap();
        assert!(matches!(output, ToolOutput::Error(_)));
    }

    #[tokio::test]
    async fn test_streaming_joins_title_and_url_lines() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let search = ScriptedSearch::new(vec![
            hit("Watch Inception | Netflix", "stream now"),
            hit("Inception - Prime Video", "rent or buy"),
        ]);
        let ctx = context(search, None, cache);

        let output = ctx.fetch_streaming("Inception (2010)").await.unwrap();
        match output {
            ToolOutput::Text(text) => {
                let lines: Vec<&str> = text.lines().collect();
                assert_eq!(lines.len(), 2);
                assert!(lines[0].starts_with("Watch Inception | Netflix: https://"));
            }
            other => panic!("expected text output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configured_max_results_reaches_search_provider() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let search = Arc::new(ScriptedSearch::new(vec![hit("Inception", "dreams")]));
        let ctx = ToolContext::new(search.clone(), None, cache, None, None, 5);

        ctx.resolve_title("the dream heist movie").await;
        ctx.fetch_streaming("Inception").await.unwrap();

        assert_eq!(search.requested(), vec![5, 5]);
    }

    #[tokio::test]
    async fn test_streaming_empty_results() {
        let dir = tempdir().unwrap();
        let cache = SearchCache::new(dir.path().join("cache.json"));
        let ctx = context(ScriptedSearch::empty(), None, cache);

        let output = ctx.fetch_streaming("Inception").await.unwrap();
        assert_eq!(output, ToolOutput::Text("Streaming info not found.".to_string()));
    }
}
