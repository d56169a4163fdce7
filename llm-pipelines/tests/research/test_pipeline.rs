//! End-to-end research runs against stub collaborators

use super::common::*;
use llm_pipelines::llm::{LlmGateway, SharedGateway};
use llm_pipelines::research::{ResearchOrchestrator, SECTION_NAMES};
use llm_pipelines_sdk::{RunStatus, Task, TaskStatus};
use std::sync::{Arc, Mutex};

const PAGE_TEXT: &str = "Quantum computing promises excellent speedups for chemistry. \
Quantum hardware is improving. Error correction remains a challenge for quantum devices.";

fn orchestrator(llm: SharedGateway, page_text: &str, dir: &tempfile::TempDir) -> ResearchOrchestrator {
    ResearchOrchestrator::new(
        llm,
        StubSearch::with_urls(5),
        StubFetcher::uniform(5, page_text),
        settings_in(dir),
    )
}

#[tokio::test]
async fn test_full_run_produces_all_sections() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = ScriptedGateway::echoing_plan();
    let mut orchestrator = orchestrator(gateway.clone(), PAGE_TEXT, &dir);

    let outcome = orchestrator.run("quantum computing").await;

    assert!(outcome.success, "error: {:?}", outcome.error);
    assert!(outcome.error.is_none());
    assert_eq!(orchestrator.status(), RunStatus::Completed);

    let plan = outcome.plan.expect("plan");
    assert_eq!(plan.tasks.len(), 6);
    assert_eq!(plan.count_with_status(TaskStatus::Completed), 6);

    let report = outcome.report.expect("report");
    for section in SECTION_NAMES {
        assert!(report.has_section(section), "missing {}", section);
        assert!(report.markdown_content.contains(&format!("## {}", section)));
    }
    assert_eq!(report.sources.len(), 3);

    let artifact = outcome.artifact_path.expect("artifact");
    assert!(artifact.exists());
    assert!(report.artifacts.markdown.as_ref().unwrap().exists());
    assert!(orchestrator.state_file().unwrap().exists());

    let phases: Vec<&str> = orchestrator.logs().iter().map(|e| e.phase.as_str()).collect();
    for expected in ["PLANNING", "PLAN_READY", "EXECUTING", "EXECUTION_COMPLETE", "REPORT_SAVED"] {
        assert!(phases.contains(&expected), "no {} event", expected);
    }
    assert!(gateway.prompts.lock().unwrap().len() > 6);
}

#[tokio::test]
async fn test_refusal_uses_default_plan() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ScriptedGateway::new("I cannot help with that."), PAGE_TEXT, &dir);

    let outcome = orchestrator.run("quantum computing").await;

    let plan = outcome.plan.unwrap();
    let names: Vec<&str> = plan.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Source Identification",
            "Content Collection",
            "Data Analysis",
            "Report Drafting",
            "Self-Review",
            "Final Production"
        ]
    );
    assert!(orchestrator.logs().iter().any(|e| e.phase == "PLAN_FALLBACK"));
    assert!(outcome.success);
}

#[tokio::test]
async fn test_empty_corpus_fails_analysis_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ScriptedGateway::echoing_plan(), "   ", &dir);

    let outcome = orchestrator.run("quantum computing").await;
    let plan = outcome.plan.unwrap();

    let collect = plan.task(2).unwrap();
    assert_eq!(collect.status, TaskStatus::Completed);
    assert_eq!(collect.result.as_deref(), Some("Collected 0 characters from 0 sources"));

    let analysis = plan.task(3).unwrap();
    assert_eq!(analysis.status, TaskStatus::Failed);
    assert!(!analysis.result.as_deref().unwrap_or("").is_empty());

    for id in 4..=6 {
        assert_eq!(plan.task(id).unwrap().status, TaskStatus::Completed, "task {}", id);
    }
    assert!(outcome.success);
    assert!(outcome.report.unwrap().analysis.is_none());
}

#[tokio::test]
async fn test_failing_model_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let llm: Arc<dyn LlmGateway> = Arc::new(FailingGateway);
    let mut orchestrator = orchestrator(llm, PAGE_TEXT, &dir);

    let outcome = orchestrator.run("quantum computing").await;

    assert!(!outcome.success);
    assert!(outcome.plan.is_none());
    let error = outcome.error.unwrap();
    assert!(error.contains("generation failed"), "{}", error);
    assert_eq!(orchestrator.logs().last().unwrap().phase, "ERROR");
    assert_eq!(orchestrator.status(), RunStatus::Failed);
}

#[tokio::test]
async fn test_empty_topic_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = ScriptedGateway::echoing_plan();
    let mut orchestrator = orchestrator(gateway.clone(), PAGE_TEXT, &dir);

    let outcome = orchestrator.run("   ").await;

    assert!(!outcome.success);
    assert!(gateway.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_observers_see_events_and_task_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ScriptedGateway::echoing_plan(), PAGE_TEXT, &dir);

    let events = Arc::new(Mutex::new(0usize));
    let sink = events.clone();
    orchestrator.set_observer(move |_| *sink.lock().unwrap() += 1);

    let updates: Arc<Mutex<Vec<(u32, TaskStatus)>>> = Arc::new(Mutex::new(Vec::new()));
    let task_sink = updates.clone();
    orchestrator.set_task_observer(move |task: &Task| task_sink.lock().unwrap().push((task.id, task.status)));

    let mut receiver = orchestrator.subscribe();
    orchestrator.run("quantum computing").await;

    assert_eq!(*events.lock().unwrap(), orchestrator.logs().len());
    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 12);
    assert_eq!(updates[0], (1, TaskStatus::InProgress));
    assert_eq!(updates[11], (6, TaskStatus::Completed));
    assert_eq!(receiver.try_recv().unwrap().phase, "PLANNING");

    orchestrator.clear();
    assert!(orchestrator.logs().is_empty());
    assert!(orchestrator.plan().is_none());
}
