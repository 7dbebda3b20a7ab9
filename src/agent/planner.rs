//! Plan generation.
//!
//! Turns a user request plus a short conversation window into an ordered
//! list of tool steps. The LLM is instructed to answer with JSON only;
//! anything that fails extraction, parsing or validation costs one retry
//! with the same prompt. After the retries are spent the planner returns
//! `None` rather than erroring.

use crate::error::{KinoError, Result};
use crate::llm::TextGenerator;
use crate::tools::ToolKind;
use std::sync::Arc;
use tracing::{info, warn};

/// Extra attempts after the first failed one.
const DEFAULT_MAX_RETRIES: u32 = 2;

/// One tool invocation in a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Position in the plan, renumbered to 1..N by the planner.
    pub step_id: u32,
    pub tool: ToolKind,
    /// Free-form argument text; may be a placeholder the executor resolves.
    pub args: String,
    /// Informational only.
    pub description: String,
}

/// Ordered sequence of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<Step>,
}

/// LLM-backed plan generator.
pub struct Planner {
    llm: Arc<dyn TextGenerator>,
    max_retries: u32,
}

impl Planner {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self {
            llm,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Create a plan for a user request, or `None` when every attempt
    /// failed. `history` carries the last few conversation turns so pronoun
    /// references ("its trailer") can be resolved.
    pub async fn create_plan(&self, user_request: &str, history: &str) -> Option<Plan> {
        info!("Planning for request: '{}'", user_request);
        let prompt = build_prompt(user_request, history);

        for attempt in 0..=self.max_retries {
            let outcome = match self.llm.generate(&prompt).await {
                Ok(response) => parse_plan(&response),
                Err(e) => Err(KinoError::Agent(e.to_string())),
            };

            match outcome {
                Ok(plan) => {
                    info!("Plan ready with {} steps", plan.steps.len());
                    return Some(plan);
                }
                Err(e) => warn!("Planning attempt {} failed: {}", attempt + 1, e),
            }
        }

        None
    }
}

fn build_prompt(user_request: &str, history: &str) -> String {
    format!(
        r#"You are an AI Planner Agent.

Your task is to break down a user's request into a sequence of steps.

AVAILABLE TOOLS:
{catalog}

CONTEXT (PREVIOUS CONVERSATION):
{history}

RULES:
1. Return ONLY a valid JSON object.
2. The JSON MUST follow this schema:
   {{
       "steps": [
           {{ "step_id": 1, "tool": "tool_name", "args": "argument", "description": "Short explanation" }}
       ]
   }}
3. **CRITICAL ARGUMENT RULES**:
   - IF the user refers to a previous movie (e.g., "Who directed it?", "Show me the trailer"), look at the CONTEXT to find the movie title. Use that title.
   - IF the user gives a new specific title, use that.
   - IF the user asks a vague question, start with 'get_movie_title_from_search'.
   - **FOR SUBSEQUENT STEPS**: Use "THE_MOVIE" as the placeholder argument.

USER REQUEST:
<<< {user_request} >>>

PLAN (JSON ONLY):
"#,
        catalog = ToolKind::catalog(),
        history = history,
        user_request = user_request,
    )
}

/// Slice out the first brace span: first `{` to last `}`. No brace on
/// either side means no JSON.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse and validate a model response into a plan with steps renumbered
/// 1..N, discarding whatever ids the model produced.
fn parse_plan(response: &str) -> Result<Plan> {
    let json = extract_json(response)
        .ok_or_else(|| KinoError::Agent("No JSON found in response".to_string()))?;

    let value: serde_json::Value = serde_json::from_str(json)?;

    let raw_steps = value
        .get("steps")
        .and_then(|s| s.as_array())
        .ok_or_else(|| KinoError::Agent("Plan has no 'steps' array".to_string()))?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw) in raw_steps.iter().enumerate() {
        let record = raw
            .as_object()
            .ok_or_else(|| KinoError::Agent("Step is not an object".to_string()))?;

        let tool_name = record
            .get("tool")
            .and_then(|t| t.as_str())
            .ok_or_else(|| KinoError::Agent("Step has no 'tool' field".to_string()))?;

        let tool: ToolKind = tool_name.parse().map_err(KinoError::Agent)?;

        steps.push(Step {
            step_id: (index + 1) as u32,
            tool,
            args: stringify(record.get("args")),
            description: record
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or_default()
                .to_string(),
        });
    }

    Ok(Plan { steps })
}

/// Force any JSON value into argument text.
fn stringify(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String>>) -> Self {
            let mut reversed = replies;
            reversed.reverse();
            Self {
                replies: Mutex::new(reversed),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(KinoError::Llm("script exhausted".to_string())))
        }
    }

    fn planner_with(replies: Vec<Result<String>>) -> (Planner, Arc<ScriptedGenerator>) {
        let llm = Arc::new(ScriptedGenerator::new(replies));
        (Planner::new(llm.clone()), llm)
    }

    const VALID_PLAN: &str = r#"
    {
        "steps": [
            { "step_id": 1, "tool": "search_movie_details", "args": "Inception", "description": "Find movie" }
        ]
    }
    "#;

    #[tokio::test]
    async fn test_valid_json_produces_plan() {
        let (planner, _) = planner_with(vec![Ok(VALID_PLAN.to_string())]);

        let plan = planner.create_plan("Find Inception", "").await.unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, ToolKind::MovieDetails);
        assert_eq!(plan.steps[0].args, "Inception");
    }

    #[tokio::test]
    async fn test_json_embedded_in_prose_is_extracted() {
        let wrapped = format!("Sure! Here is the plan:\n{}\nHope that helps.", VALID_PLAN);
        let (planner, _) = planner_with(vec![Ok(wrapped)]);

        let plan = planner.create_plan("Find Inception", "").await;
        assert!(plan.is_some());
    }

    #[tokio::test]
    async fn test_step_ids_are_renumbered() {
        let response = r#"
        {
            "steps": [
                { "step_id": 7, "tool": "get_movie_title_from_search", "args": "dream movie" },
                { "step_id": 3, "tool": "get_youtube_trailer", "args": "THE_MOVIE" }
            ]
        }
        "#;
        let (planner, _) = planner_with(vec![Ok(response.to_string())]);

        let plan = planner.create_plan("trailer for the dream movie", "").await.unwrap();
        let ids: Vec<u32> = plan.steps.iter().map(|s| s.step_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected_and_retried() {
        let bad = r#"{ "steps": [ { "tool": "order_popcorn", "args": "large" } ] }"#;
        let (planner, llm) = planner_with(vec![
            Ok(bad.to_string()),
            Ok(VALID_PLAN.to_string()),
        ]);

        let plan = planner.create_plan("popcorn", "").await;
        assert!(plan.is_some());
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test]
    async fn test_missing_steps_field_is_rejected() {
        let (planner, llm) = planner_with(vec![
            Ok(r#"{ "plan": [] }"#.to_string()),
            Ok(r#"{ "steps": "not a list" }"#.to_string()),
            Ok("no json here at all".to_string()),
        ]);

        let plan = planner.create_plan("anything", "").await;
        assert!(plan.is_none());
        // First attempt plus two retries.
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_backend_errors_consume_retries() {
        let (planner, _) = planner_with(vec![
            Err(KinoError::Llm("boom".to_string())),
            Ok(VALID_PLAN.to_string()),
        ]);

        let plan = planner.create_plan("Find Inception", "").await;
        assert!(plan.is_some());
    }

    #[test]
    fn test_extract_json_requires_both_braces() {
        assert_eq!(extract_json("{\"a\": 1}"), Some("{\"a\": 1}"));
        assert_eq!(extract_json("no braces"), None);
        assert_eq!(extract_json("only open {"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_non_string_args_are_stringified() {
        let response = r#"{ "steps": [ { "tool": "search_movie_details", "args": 42 } ] }"#;
        let plan = parse_plan(response).unwrap();
        assert_eq!(plan.steps[0].args, "42");
    }
}
