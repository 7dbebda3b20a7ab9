//! Kino CLI entry point.

use anyhow::Result;
use clap::Parser;
use kino::cli::{commands, Cli, Commands};
use kino::config::Settings;
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Initialize logging: verbose stream to stdout, errors additionally to
    // a timestamped file under the data dir.
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("kino={}", log_level)),
        ));

    let error_file_layer = open_error_log(&settings).map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .with_filter(LevelFilter::ERROR)
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(error_file_layer)
        .init();

    // Execute command
    match &cli.command {
        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}

/// Open a fresh error log file; logging proceeds without the file sink when
/// the directory cannot be created.
fn open_error_log(settings: &Settings) -> Option<File> {
    let log_dir = settings.data_dir().join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    File::create(log_dir.join(format!("error_log_{}.log", timestamp))).ok()
}
