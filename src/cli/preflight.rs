//! Pre-flight checks before starting a conversation.
//!
//! Validates that required keys are available before operations that would
//! otherwise fail midway. Only the OpenAI key is hard-required; the
//! pipeline degrades per-tool when OMDb or YouTube keys are missing.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{KinoError, Result};

/// Check requirements for running the ask/chat pipeline.
///
/// Errors when the LLM backend cannot be reached at all; prints warnings
/// for optional keys so the user knows which tools will be degraded.
pub fn check(settings: &Settings) -> Result<()> {
    check_openai_key()?;

    if settings.omdb.key().is_none() {
        Output::warning("OMDB_API_KEY not set: detail lookups will fail.");
    }
    if settings.youtube.key().is_none() {
        Output::warning("YOUTUBE_API_KEY not set: trailer lookups will fail.");
    }

    Ok(())
}

/// Check if the OpenAI API key is configured.
fn check_openai_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(KinoError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(KinoError::Config(
            "OPENAI_API_KEY is not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
