//! Persistent search-result cache.
//!
//! Maps a free-text movie query to the title it previously resolved to, so
//! repeated questions about the same movie skip the web search and LLM
//! refinement entirely. The cache is a single human-readable JSON object,
//! reread from disk on every access and rewritten wholesale on every put.
//!
//! Caching is best-effort: a missing or corrupt file behaves as an empty
//! cache, and write failures are logged and swallowed. There is no locking;
//! concurrent processes sharing one cache file may lose updates
//! (last-writer-wins).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed query -> resolved title cache.
#[derive(Debug, Clone)]
pub struct SearchCache {
    path: PathBuf,
}

impl SearchCache {
    /// Create a cache backed by the given file path. The file is not
    /// created until the first successful `put`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a previously resolved title for a query.
    ///
    /// Queries differing only in case or surrounding whitespace hit the
    /// same entry.
    pub fn get(&self, query: &str) -> Option<String> {
        let entries = self.load();
        entries.get(&normalize_key(query)).cloned()
    }

    /// Record a resolved title for a query. Failures are logged and
    /// swallowed; caching never aborts the resolution pipeline.
    pub fn put(&self, query: &str, title: &str) {
        let mut entries = self.load();
        entries.insert(normalize_key(query), title.to_string());
        self.save(&entries);
    }

    fn load(&self) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return BTreeMap::new(),
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cache file {} is unreadable, treating as empty: {}", self.path.display(), e);
                BTreeMap::new()
            }
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create cache directory: {}", e);
                return;
            }
        }

        let content = match serde_json::to_string_pretty(entries) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize cache: {}", e);
                return;
            }
        };

        match std::fs::write(&self.path, content) {
            Ok(()) => debug!("Cache saved ({} entries)", entries.len()),
            Err(e) => warn!("Failed to save cache: {}", e),
        }
    }
}

/// Normalize a query so casing and whitespace variants share one entry.
fn normalize_key(query: &str) -> String {
    query.trim().to_lowercase()
}
