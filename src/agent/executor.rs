//! Plan execution.
//!
//! Walks the plan steps in order, threading one accumulator through the
//! walk: the context title, the movie discovered by an earlier step. The
//! substitution policy lives in the pure [`prepare_argument`] function so
//! it can be tested without tools:
//!
//! - once a title is known, every non-resolution step is forced onto that
//!   title, whatever argument the planner wrote;
//! - a placeholder argument with no known title means the earlier step
//!   failed, so the step is skipped with an error result;
//! - otherwise the argument passes through as written.
//!
//! Tool failures are recorded per step and never abort the walk.

use super::planner::{Plan, Step};
use crate::tools::{ToolInvoker, ToolKind, ToolOutput, FOUND_MARKER};
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Latest output per tool for one plan run.
///
/// One slot per tool kind: a second step invoking the same tool overwrites
/// the first result. The verifier only inspects the latest result per tool,
/// so the overwrite is deliberate and visible in the type.
#[derive(Debug, Default)]
pub struct ExecutionResults {
    pub title_search: Option<ToolOutput>,
    pub movie_details: Option<ToolOutput>,
    pub youtube_trailer: Option<ToolOutput>,
    pub streaming_info: Option<ToolOutput>,
}

impl ExecutionResults {
    /// Record a tool's output, replacing any earlier result for that tool.
    pub fn record(&mut self, tool: ToolKind, output: ToolOutput) {
        *self.slot_mut(tool) = Some(output);
    }

    /// Latest output for a tool, if it ran.
    pub fn get(&self, tool: ToolKind) -> Option<&ToolOutput> {
        match tool {
            ToolKind::TitleSearch => self.title_search.as_ref(),
            ToolKind::MovieDetails => self.movie_details.as_ref(),
            ToolKind::YoutubeTrailer => self.youtube_trailer.as_ref(),
            ToolKind::StreamingInfo => self.streaming_info.as_ref(),
        }
    }

    /// True when no step produced any result.
    pub fn is_empty(&self) -> bool {
        ToolKind::ALL.iter().all(|tool| self.get(*tool).is_none())
    }

    fn slot_mut(&mut self, tool: ToolKind) -> &mut Option<ToolOutput> {
        match tool {
            ToolKind::TitleSearch => &mut self.title_search,
            ToolKind::MovieDetails => &mut self.movie_details,
            ToolKind::YoutubeTrailer => &mut self.youtube_trailer,
            ToolKind::StreamingInfo => &mut self.streaming_info,
        }
    }
}

/// Everything one plan run produced.
#[derive(Debug)]
pub struct ExecutionReport {
    pub results: ExecutionResults,
    /// The movie title discovered during the run, if any.
    pub context_title: Option<String>,
}

/// What to do with a step's argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgDecision {
    /// Invoke the tool with this (possibly substituted) argument.
    Invoke(String),
    /// Placeholder argument with no discovered title: skip the step.
    SkipMissingContext,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\[.*?\]|\{.*?\}|OUTPUT|STEP|THE_MOVIE|placeholder|output of step \d+)")
            .expect("valid regex")
    })
}

/// Whether an argument is a stand-in for a not-yet-known value rather than
/// text meant for a tool. The token list is part of the observable
/// contract; planners emit `THE_MOVIE` but sloppier generations produce
/// bracketed or brace-wrapped references too.
pub fn is_placeholder(arg: &str) -> bool {
    placeholder_re().is_match(arg)
}

/// Decide the argument for one step given the discovered title so far.
/// Pure; the executor folds it over the plan.
pub fn prepare_argument(context_title: Option<&str>, tool: ToolKind, arg: &str) -> ArgDecision {
    if let Some(title) = context_title {
        // A known title overrides placeholders everywhere and any argument
        // to a non-resolution tool.
        if is_placeholder(arg) || tool != ToolKind::TitleSearch {
            return ArgDecision::Invoke(title.to_string());
        }
        return ArgDecision::Invoke(arg.to_string());
    }

    if is_placeholder(arg) {
        return ArgDecision::SkipMissingContext;
    }

    ArgDecision::Invoke(arg.to_string())
}

/// Title discovered by a tool's output, if any.
fn capture_title(tool: ToolKind, output: &ToolOutput) -> Option<String> {
    match (tool, output) {
        (ToolKind::TitleSearch, ToolOutput::Text(text)) => text
            .find(FOUND_MARKER)
            .map(|idx| text[idx + FOUND_MARKER.len()..].trim().to_string())
            .filter(|title| !title.is_empty()),
        (ToolKind::MovieDetails, ToolOutput::Details(details)) if !details.title.is_empty() => {
            Some(details.title.clone())
        }
        _ => None,
    }
}

/// Sequential plan walker.
pub struct Executor {
    tools: Arc<dyn ToolInvoker>,
}

impl Executor {
    pub fn new(tools: Arc<dyn ToolInvoker>) -> Self {
        Self { tools }
    }

    /// Execute every step in order and return the accumulated results plus
    /// the discovered title. Steps depend on the title set by earlier
    /// steps, so there is no parallelism here.
    pub async fn execute(&self, plan: &Plan) -> ExecutionReport {
        info!("Starting execution phase ({} steps)", plan.steps.len());

        let mut results = ExecutionResults::default();
        let mut context_title: Option<String> = None;

        for step in &plan.steps {
            let (next_title, output) = self.run_step(context_title.take(), step).await;
            context_title = next_title;
            results.record(step.tool, output);
        }

        ExecutionReport {
            results,
            context_title,
        }
    }

    /// One fold iteration: `(title, step) -> (title', result)`.
    async fn run_step(
        &self,
        context_title: Option<String>,
        step: &Step,
    ) -> (Option<String>, ToolOutput) {
        let arg = match prepare_argument(context_title.as_deref(), step.tool, &step.args) {
            ArgDecision::Invoke(arg) => {
                if arg != step.args {
                    info!("Replacing '{}' with discovered title '{}'", step.args, arg);
                }
                arg
            }
            ArgDecision::SkipMissingContext => {
                let message = format!(
                    "Error: Previous step failed to find a movie title. Cannot execute {}.",
                    step.tool
                );
                error!("{}", message);
                return (context_title, ToolOutput::Error(message));
            }
        };

        info!("Executing step {}: {}('{}')", step.step_id, step.tool, arg);

        match self.tools.invoke(step.tool, &arg).await {
            Ok(output) => {
                let discovered = capture_title(step.tool, &output);
                if let Some(title) = &discovered {
                    info!("Discovered target movie: {}", title);
                } else if step.tool == ToolKind::TitleSearch {
                    warn!("Search step finished without a clear title: {}", output);
                }
                (discovered.or(context_title), output)
            }
            Err(e) => {
                error!("Step {} failed: {}", step.step_id, e);
                (context_title, ToolOutput::Error(format!("Error: {}", e)))
            }
        }
    }
}
