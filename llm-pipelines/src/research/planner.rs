//! Plan construction for a research topic

use crate::llm::{LlmError, SharedGateway};
use crate::workflow_utils::{parse_json, ParseError};
use llm_pipelines_sdk::{Plan, StatusEvent, StatusReporter, TaskSpec};
use serde::Deserialize;

pub const PLAN_TASK_COUNT: usize = 6;

const PLANNER_SYSTEM_PROMPT: &str = "You are a strategic research planner. You analyze research \
topics and break them down into clear, sequential, actionable tasks.";

const PLAN_TEMPERATURE: f32 = 0.3;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlanPayload {
    Tasks(Vec<TaskSpec>),
    Wrapped { tasks: Vec<TaskSpec> },
}

fn planning_prompt(topic: &str) -> String {
    format!(
        r#"Create a research plan for the topic: "{topic}"

The plan must contain exactly 6 tasks, in this order:
1. Source Identification
2. Content Collection
3. Data Analysis
4. Report Drafting
5. Self-Review
6. Final Production

For each task write a specific, actionable description tailored to the topic.

Respond ONLY with a JSON array of 6 objects, each with "name" and "description" keys."#
    )
}

/// The canonical six-task plan used whenever the model's plan is unusable.
pub fn default_plan(topic: &str) -> Plan {
    let specs = [
        (
            "Source Identification",
            format!("Search the web for 3-5 trustworthy, authoritative sources about {}", topic),
        ),
        (
            "Content Collection",
            "Extract the readable text from each identified source".to_string(),
        ),
        (
            "Data Analysis",
            "Compute word statistics, keywords and sentiment over the collected text and chart them"
                .to_string(),
        ),
        (
            "Report Drafting",
            format!(
                "Write the executive summary, introduction, key findings, analysis and conclusion on {}",
                topic
            ),
        ),
        (
            "Self-Review",
            "Critically review each section and rewrite it for clarity and accuracy".to_string(),
        ),
        (
            "Final Production",
            "Render the final report as Markdown, HTML and PDF with sources and statistics"
                .to_string(),
        ),
    ];
    Plan::from_specs(
        topic,
        specs.into_iter().map(|(name, desc)| TaskSpec::new(name, desc)),
    )
}

/// Parses model output into a six-task plan.
///
/// Accepts a bare array or an object with a `tasks` array. Anything other than
/// exactly six named tasks is a [`ParseError::Shape`].
pub fn parse_plan(topic: &str, response: &str) -> Result<Plan, ParseError> {
    let specs = match parse_json::<PlanPayload>(response)? {
        PlanPayload::Tasks(specs) | PlanPayload::Wrapped { tasks: specs } => specs,
    };

    if specs.len() != PLAN_TASK_COUNT {
        return Err(ParseError::Shape(format!(
            "expected {} tasks, got {}",
            PLAN_TASK_COUNT,
            specs.len()
        )));
    }
    if let Some(pos) = specs.iter().position(|s| s.name.trim().is_empty()) {
        return Err(ParseError::Shape(format!("task {} has no name", pos + 1)));
    }

    let specs = specs
        .into_iter()
        .map(|s| TaskSpec::new(s.name.trim(), s.description.trim()));
    Ok(Plan::from_specs(topic, specs))
}

pub struct PlanBuilder {
    llm: SharedGateway,
}

impl PlanBuilder {
    pub fn new(llm: SharedGateway) -> Self {
        Self { llm }
    }

    /// Asks the model for a plan. Unparseable output yields [`default_plan`];
    /// only a failed model call is an error.
    pub async fn build(&self, topic: &str, reporter: &mut StatusReporter) -> Result<Plan, LlmError> {
        reporter.emit(StatusEvent::new("ANALYZING", format!("Analyzing topic: {}", topic)).from_agent("planner"));

        let response = self
            .llm
            .complete(&planning_prompt(topic), Some(PLANNER_SYSTEM_PROMPT), Some(PLAN_TEMPERATURE))
            .await?;

        let plan = parse_plan(topic, &response).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "planner output unusable, using default plan");
            reporter.emit(
                StatusEvent::new("PLAN_FALLBACK", format!("Using default plan ({})", e))
                    .from_agent("planner"),
            );
            default_plan(topic)
        });

        reporter.emit(
            StatusEvent::new("PLAN_CREATED", format!("Created plan with {} tasks", plan.tasks.len()))
                .from_agent("planner")
                .with_detail("tasks", plan.tasks.len()),
        );
        Ok(plan)
    }
}
