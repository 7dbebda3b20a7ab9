//! Diagnostics command.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;

/// Report which keys and paths are configured.
pub fn run_doctor(settings: &Settings) -> Result<()> {
    Output::header("Kino doctor");

    Output::kv(
        "Config file",
        &Settings::default_config_path().display().to_string(),
    );
    Output::kv("Data dir", &settings.data_dir().display().to_string());
    Output::kv("Cache file", &settings.cache_path().display().to_string());
    Output::kv("LLM model", &settings.llm.model);

    check_key("OPENAI_API_KEY (required)", std::env::var("OPENAI_API_KEY").ok());
    check_key("OMDb API key", settings.omdb.key());
    check_key("YouTube API key", settings.youtube.key());

    let cache_dir_writable = settings
        .cache_path()
        .parent()
        .map(|dir| std::fs::create_dir_all(dir).is_ok())
        .unwrap_or(false);
    if cache_dir_writable {
        Output::success("Cache directory is writable.");
    } else {
        Output::warning("Cache directory is not writable; caching will be disabled in effect.");
    }

    Ok(())
}

fn check_key(label: &str, key: Option<String>) {
    match key {
        Some(k) if !k.is_empty() => Output::success(&format!("{}: configured", label)),
        _ => Output::warning(&format!("{}: missing", label)),
    }
}
