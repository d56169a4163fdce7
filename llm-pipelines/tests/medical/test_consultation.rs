//! Chained consultation behavior

use super::common::*;
use llm_pipelines::medical::{sample_report, ReportAnalyzer};

#[tokio::test]
async fn test_each_physician_sees_previous_findings() {
    let gateway = RecordingGateway::new();
    let mut analyzer = ReportAnalyzer::new(gateway.clone());
    let report = sample_report("chest-pain").unwrap();

    let result = analyzer.analyze(report).await.unwrap();

    assert_eq!(result.diagnostic, "ANSWER 1");
    assert_eq!(result.specialist, "ANSWER 2");
    assert_eq!(result.coordinator, "ANSWER 3");

    let calls = gateway.calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(prompt, _)| prompt.contains("ST elevation")));
    assert!(calls[1].0.contains("**Initial Diagnostic Findings:**\nANSWER 1"));
    assert!(calls[2].0.contains("ANSWER 1") && calls[2].0.contains("ANSWER 2"));

    let systems: Vec<&str> = calls.iter().map(|(_, s)| s.as_deref().unwrap()).collect();
    assert!(systems[0].starts_with("You are Dr. Diagnostic"));
    assert!(systems[1].starts_with("You are Dr. Specialist"));
    assert!(systems[2].starts_with("You are Dr. Coordinator"));
}

#[tokio::test]
async fn test_events_follow_consultation_order() {
    let mut analyzer = ReportAnalyzer::new(RecordingGateway::new());
    analyzer.analyze("Patient: 40-year-old, headache").await.unwrap();

    let agents: Vec<&str> = analyzer
        .logs()
        .iter()
        .filter(|e| e.phase == "CONSULT_DONE")
        .filter_map(|e| e.agent.as_deref())
        .collect();
    assert_eq!(agents, vec!["Dr. Diagnostic", "Dr. Specialist", "Dr. Coordinator"]);
    assert_eq!(analyzer.logs().last().unwrap().phase, "COMPLETE");
}

#[tokio::test]
async fn test_empty_report_is_rejected_before_any_call() {
    let gateway = RecordingGateway::new();
    let mut analyzer = ReportAnalyzer::new(gateway.clone());

    assert!(analyzer.analyze("   \n").await.is_err());
    assert!(gateway.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_aborts_remaining_physicians() {
    let gateway = RecordingGateway::failing_from(2);
    let mut analyzer = ReportAnalyzer::new(gateway.clone());

    let err = analyzer.analyze("Patient: 70-year-old, dizziness").await.unwrap_err();

    assert!(format!("{:#}", err).contains("Dr. Specialist failed"));
    assert_eq!(gateway.calls.lock().unwrap().len(), 2);
    let last = analyzer.logs().last().unwrap();
    assert_eq!(last.phase, "ERROR");
    assert!(last.message.contains("503"));
}

#[tokio::test]
async fn test_full_report_is_saved_clean() {
    let dir = tempfile::tempdir().unwrap();
    let mut analyzer = ReportAnalyzer::new(RecordingGateway::new());
    let result = analyzer.analyze("**Patient**: 28-year-old\n\n\n\nRash").await.unwrap();

    let path = result.save(dir.path()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();

    assert!(path.file_name().unwrap().to_string_lossy().starts_with("medical_analysis_"));
    assert!(text.starts_with("MULTI-AGENT MEDICAL ANALYSIS REPORT\n"));
    assert!(text.contains("Patient: 28-year-old\n\nRash"));
    assert!(!text.contains("**"));
    assert!(!text.contains("\n\n\n"));
    assert!(text.ends_with(&format!("END OF REPORT\n{}\n", "=".repeat(70))));
}
