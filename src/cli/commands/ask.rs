//! One-shot question command.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;

/// Run a single plan/execute/verify pass and print the answer.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'kino doctor' for detailed diagnostics.");
        return Err(e);
    }

    let mut orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Thinking...");
    let reply = orchestrator.run_turn(question).await;
    spinner.finish_and_clear();

    println!("{}", reply);
    Ok(())
}
