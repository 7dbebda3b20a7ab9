//! Kino - Conversational movie assistant
//!
//! A CLI assistant that answers movie questions in plain language. The name
//! "Kino" is the German/Scandinavian word for "cinema."
//!
//! # Overview
//!
//! Kino turns a request like "show me the trailer for that dream heist
//! movie" into a plan of tool calls, runs the plan, and summarizes the
//! results:
//!
//! - resolve a vague description to a canonical movie title (web search +
//!   LLM refinement, backed by a persistent cache)
//! - fetch details (year, rating, plot, director) from OMDb
//! - fetch the YouTube trailer URL
//! - find where the movie is streaming
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `llm` - Text-generation backend abstraction
//! - `search` - Web search abstraction
//! - `cache` - Persistent title-resolution cache
//! - `tools` - The four lookup tools and the tool vocabulary
//! - `agent` - The plan/execute/verify pipeline
//! - `orchestrator` - Per-turn coordination and conversation window
//!
//! # Example
//!
//! ```rust,no_run
//! use kino::config::Settings;
//! use kino::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut orchestrator = Orchestrator::new(settings)?;
//!
//!     let reply = orchestrator.run_turn("who directed Arrival?").await;
//!     println!("{}", reply);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod search;
pub mod tools;

pub use error::{KinoError, Result};
