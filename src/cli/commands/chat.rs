//! Interactive chat command.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat loop.
pub async fn run_chat(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'kino doctor' for detailed diagnostics.");
        return Err(e);
    }

    let mut orchestrator = Orchestrator::new(settings)?;

    println!("\n{}", style("Kino Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about movies, trailers, ratings or plots. Type 'exit' to quit, 'clear' to reset the conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            orchestrator.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let reply = orchestrator.run_turn(input).await;
        spinner.finish_and_clear();

        println!("\n{} {}\n", style("Kino:").cyan().bold(), reply);
    }

    Ok(())
}
