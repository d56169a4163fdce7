//! Planner, collector and analyzer behavior through the public API

use super::common::*;
use llm_pipelines::research::{
    default_plan, parse_plan, ContentCollector, PlanBuilder, SentimentLabel, Source, TextAnalyzer,
};
use llm_pipelines_sdk::StatusReporter;

#[test]
fn test_refusal_does_not_parse_as_plan() {
    assert!(parse_plan("t", "I cannot help with that.").is_err());
}

#[test]
fn test_wrapped_plan_object_parses() {
    let response = format!("```json\n{{\"tasks\": {}}}\n```", six_task_json());
    let plan = parse_plan("quantum computing", &response).unwrap();
    let ids: Vec<u32> = plan.tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_five_tasks_is_a_shape_error() {
    let response = r#"[{"name":"a"},{"name":"b"},{"name":"c"},{"name":"d"},{"name":"e"}]"#;
    assert!(parse_plan("t", response).is_err());
}

#[tokio::test]
async fn test_builder_falls_back_on_garbage() {
    let builder = PlanBuilder::new(ScriptedGateway::new("Sure! Here are some thoughts."));
    let mut reporter = StatusReporter::new();

    let plan = builder.build("rust async", &mut reporter).await.unwrap();

    assert_eq!(plan.tasks, default_plan("rust async").tasks);
}

#[tokio::test]
async fn test_collect_drops_sources_without_text() {
    let collector = ContentCollector::new(StubSearch::with_urls(3), StubFetcher::uniform(3, ""));
    let sources: Vec<Source> = (1..=3)
        .map(|i| Source::new(format!("https://example.org/{}", i), format!("S{}", i), ""))
        .collect();
    let mut reporter = StatusReporter::new();

    let collected = collector.collect(&sources, 3, &mut reporter).await;

    assert!(collected.is_empty());
    assert_eq!(reporter.events().iter().filter(|e| e.phase == "EXTRACT").count(), 3);
}

#[tokio::test]
async fn test_collect_uses_snippet_when_fetch_fails() {
    let collector = ContentCollector::new(StubSearch::with_urls(1), StubFetcher::uniform(0, ""));
    let sources = vec![Source::new("https://example.org/9", "Nine", "snippet text")];
    let mut reporter = StatusReporter::new();

    let collected = collector.collect(&sources, 3, &mut reporter).await;

    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].content, "snippet text");
    assert!(collected[0].accessed_at.is_some());
}

#[test]
fn test_analysis_is_deterministic() {
    let mut source = Source::new("https://example.org/1", "One", "");
    source.content = SECTION_TEXT.repeat(3);
    let sources = vec![source];
    let analyzer = TextAnalyzer::default();

    let first = analyzer.analyze(&sources, "quantum").unwrap();
    let second = analyzer.analyze(&sources, "quantum").unwrap();

    assert_eq!(first.word_count, second.word_count);
    assert_eq!(first.sentiment_label, second.sentiment_label);
    assert_eq!(first.keyword_names(10), second.keyword_names(10));
    assert!(first.chart_paths.is_empty());
}

#[test]
fn test_sentiment_boundaries() {
    assert_eq!(SentimentLabel::from_score(0.1), SentimentLabel::Neutral);
    assert_eq!(SentimentLabel::from_score(0.11), SentimentLabel::Positive);
    assert_eq!(SentimentLabel::from_score(-0.11), SentimentLabel::Negative);
}
