//! Pipeline orchestrator for Kino.
//!
//! Wires settings into components and runs one conversation turn at a time:
//! plan, execute, verify. A small rolling window of past turns is handed to
//! the planner so follow-up questions ("show me its trailer") resolve
//! against the previous movie. The discovered title itself never crosses
//! turns; every turn re-plans and re-executes from scratch.

use crate::agent::{Executor, Planner, Verifier};
use crate::cache::SearchCache;
use crate::config::Settings;
use crate::error::{KinoError, Result};
use crate::llm::{OpenAiGenerator, TextGenerator};
use crate::search::DuckDuckGoSearch;
use crate::tools::ToolContext;
use std::sync::Arc;
use tracing::{info, instrument};

/// Reply when plan generation exhausted its retries.
const NO_PLAN_REPLY: &str = "I couldn't generate a plan. Please try again.";

/// Turns included in the planner's context window.
const HISTORY_WINDOW: usize = 4;

/// Retained turns before the oldest are dropped.
const HISTORY_CAP: usize = 20;

/// Who said a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn label(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// The main orchestrator for the Kino pipeline.
pub struct Orchestrator {
    planner: Planner,
    executor: Executor,
    verifier: Verifier,
    history: Vec<Turn>,
}

impl Orchestrator {
    /// Create a new orchestrator from settings. Requires an OpenAI API key;
    /// OMDb and YouTube keys are optional and degrade those tools only.
    pub fn new(settings: Settings) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").map(|k| k.is_empty()).unwrap_or(true) {
            return Err(KinoError::Config(
                "OPENAI_API_KEY is not set. Export it before running.".to_string(),
            ));
        }

        let llm: Arc<dyn TextGenerator> = Arc::new(OpenAiGenerator::new(
            &settings.llm.model,
            settings.llm.temperature,
        ));

        let cache = SearchCache::new(settings.cache_path());
        let tools = Arc::new(ToolContext::new(
            Arc::new(DuckDuckGoSearch::new()),
            Some(llm.clone()),
            cache,
            settings.omdb.key(),
            settings.youtube.key(),
            settings.search.max_results,
        ));

        let planner = Planner::new(llm.clone()).with_max_retries(settings.llm.plan_retries);
        let executor = Executor::new(tools);
        let verifier = Verifier::new(Some(llm));

        Ok(Self {
            planner,
            executor,
            verifier,
            history: Vec::new(),
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(planner: Planner, executor: Executor, verifier: Verifier) -> Self {
        Self {
            planner,
            executor,
            verifier,
            history: Vec::new(),
        }
    }

    /// Run one full plan/execute/verify turn and return the reply text.
    /// Pipeline failures come back as fixed replies, not errors.
    #[instrument(skip(self), fields(query = %user_query))]
    pub async fn run_turn(&mut self, user_query: &str) -> String {
        let context = self.context_window();

        let Some(plan) = self.planner.create_plan(user_query, &context).await else {
            let reply = NO_PLAN_REPLY.to_string();
            self.remember(user_query, &reply);
            return reply;
        };

        let report = self.executor.execute(&plan).await;
        info!(
            "Execution finished (title: {})",
            report.context_title.as_deref().unwrap_or("none")
        );

        let reply = self
            .verifier
            .verify_and_respond(user_query, &report.results)
            .await;

        self.remember(user_query, &reply);
        reply
    }

    /// Forget the conversation so far.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Conversation turns retained so far.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Format the last few turns for the planner prompt.
    fn context_window(&self) -> String {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        self.history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker.label(), turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn remember(&mut self, user_query: &str, reply: &str) {
        self.history.push(Turn {
            speaker: Speaker::User,
            text: user_query.to_string(),
        });
        self.history.push(Turn {
            speaker: Speaker::Assistant,
            text: reply.to_string(),
        });

        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
    }
}
