//! Tool vocabulary and shared tool types.
//!
//! The planner emits tool names from a fixed four-entry vocabulary; the
//! executor dispatches on the closed [`ToolKind`] enum so an unknown tool
//! can only be rejected at plan validation, never silently at dispatch.

mod movie;

pub use movie::ToolContext;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

/// The four external lookup operations the planner may schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// Resolve a free-text movie description to a canonical title.
    TitleSearch,
    /// Fetch movie details (year, rating, plot, director) from OMDb.
    MovieDetails,
    /// Fetch the YouTube trailer URL.
    YoutubeTrailer,
    /// Find where the movie is available for streaming.
    StreamingInfo,
}

impl ToolKind {
    /// All tools, in catalog order.
    pub const ALL: [ToolKind; 4] = [
        ToolKind::TitleSearch,
        ToolKind::MovieDetails,
        ToolKind::YoutubeTrailer,
        ToolKind::StreamingInfo,
    ];

    /// Wire name the planner must emit verbatim.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::TitleSearch => "get_movie_title_from_search",
            ToolKind::MovieDetails => "search_movie_details",
            ToolKind::YoutubeTrailer => "get_youtube_trailer",
            ToolKind::StreamingInfo => "get_streaming_info",
        }
    }

    /// One-line description shown to the planner.
    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::TitleSearch => {
                "Use this if the user describes a movie but doesn't give the exact name."
            }
            ToolKind::MovieDetails => "Use this ONLY when you have a specific movie title.",
            ToolKind::YoutubeTrailer => "Fetch the YouTube trailer URL for a movie",
            ToolKind::StreamingInfo => "Find where the movie is available for streaming",
        }
    }

    /// Numbered tool catalog for the planner prompt.
    pub fn catalog() -> String {
        Self::ALL
            .iter()
            .enumerate()
            .map(|(i, tool)| format!("{}. {}(query): {}", i + 1, tool.as_str(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "get_movie_title_from_search" => Ok(ToolKind::TitleSearch),
            "search_movie_details" => Ok(ToolKind::MovieDetails),
            "get_youtube_trailer" => Ok(ToolKind::YoutubeTrailer),
            "get_streaming_info" => Ok(ToolKind::StreamingInfo),
            other => Err(format!("Unknown tool: {}", other)),
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured details for a movie, as returned by the detail lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    /// Set when the exact lookup failed and a fuzzy match was used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Latest output of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain text (resolver marker lines, trailer URLs, streaming lists).
    Text(String),
    /// Structured detail record.
    Details(MovieDetails),
    /// Recorded failure; the pipeline keeps going.
    Error(String),
}

impl std::fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolOutput::Text(text) | ToolOutput::Error(text) => write!(f, "{}", text),
            ToolOutput::Details(details) => {
                let json = serde_json::to_string(details).unwrap_or_default();
                write!(f, "{}", json)
            }
        }
    }
}

/// Seam between the executor and the real lookup tools.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke one tool with an already-substituted argument.
    async fn invoke(&self, tool: ToolKind, arg: &str) -> Result<ToolOutput>;
}

/// Marker prefix the title resolver puts on successful resolutions.
pub const FOUND_MARKER: &str = "Found via search:";

fn quote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("['\"\u{2018}\u{2019}\u{201C}\u{201D}]").expect("valid regex"))
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(\d{4}\)").expect("valid regex"))
}

/// Clean a raw movie title so downstream lookups accept it.
///
/// Strips the resolver marker, quote characters and a parenthesized year,
/// then truncates at the first of `" - "`, `" | "`, `" : "`, `" Official"`.
/// Pure and idempotent; the resolver and every lookup tool apply it
/// independently.
pub fn clean_movie_title(raw_title: &str) -> String {
    if raw_title.is_empty() {
        return String::new();
    }

    let mut title = raw_title.replace(FOUND_MARKER, "");
    title = quote_re().replace_all(&title, "").into_owned();
    title = year_re().replace_all(&title, "").into_owned();

    // Earliest separator wins, wherever it sits in the list.
    if let Some(index) = [" - ", " | ", " : ", " Official"]
        .iter()
        .filter_map(|separator| title.find(separator))
        .min()
    {
        title.truncate(index);
    }

    title.trim().to_string()
}
