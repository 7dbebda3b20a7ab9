//! Configuration command.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use crate::error::{KinoError, Result};

/// Show configuration or its path.
pub fn run_config(action: &ConfigAction, settings: &Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let content =
                toml::to_string_pretty(settings).map_err(|e| KinoError::Config(e.to_string()))?;
            println!("{}", content);
        }
        ConfigAction::Path => {
            Output::kv(
                "Config path",
                &Settings::default_config_path().display().to_string(),
            );
        }
    }
    Ok(())
}
