//! Full clinic visits through the orchestrator

use super::common::*;
use chrono::{Duration, Local};
use llm_pipelines::clinic::{AppointmentStatus, ClinicOrchestrator, NotificationType};
use llm_pipelines_sdk::{RunStatus, TaskStatus};

#[tokio::test]
async fn test_visit_runs_all_admin_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::happy(), &dir);

    let outcome = orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert!(outcome.success, "error: {:?}", outcome.error);
    assert_eq!(orchestrator.status(), RunStatus::Completed);
    let record = outcome.record.unwrap();
    assert_eq!(record.diagnosis, "Acute pharyngitis");
    assert_eq!(record.prescription.len(), 2);
    assert_eq!(record.appointment_type, "routine");

    assert_eq!(outcome.tasks.len(), 5);
    assert!(outcome.tasks.iter().all(|t| t.status == TaskStatus::Completed));
    assert_eq!(outcome.tasks[0].result.as_deref(), Some("Patient record saved (ID: 1)"));

    let prescription = outcome.admin.prescription_path.unwrap();
    assert!(prescription.exists());
    assert!(prescription.file_name().unwrap().to_string_lossy().starts_with("Jane_Roe_"));

    let appointment = outcome.admin.appointment.unwrap();
    assert_eq!(appointment.date, Local::now().date_naive() + Duration::days(14));
    assert_eq!(appointment.time, "09:00 AM");
    assert_eq!(appointment.status, AppointmentStatus::Scheduled);

    assert_eq!(outcome.admin.notifications.len(), 2);
    assert_eq!(outcome.admin.summary.as_deref(), Some(SUMMARY));

    let store = orchestrator.store();
    assert_eq!(store.get_patient_count().unwrap(), 1);
    let rows = store.get_patient_by_name("Jane").unwrap();
    assert_eq!(rows[0].prescription[0].medication, "Amoxicillin");
    assert_eq!(
        store
            .get_upcoming_appointments(Local::now().date_naive(), 10)
            .unwrap()
            .len(),
        1
    );

    let kinds: Vec<NotificationType> = orchestrator
        .notifications()
        .history()
        .iter()
        .map(|n| n.notification_type)
        .collect();
    assert_eq!(kinds, vec![NotificationType::AppointmentReminder, NotificationType::Prescription]);

    let phases: Vec<&str> = orchestrator.logs().iter().map(|e| e.phase.as_str()).collect();
    for expected in ["EXTRACTING", "RECORD_READY", "ADMIN_START", "ADMIN_COMPLETE"] {
        assert!(phases.contains(&expected), "no {} event", expected);
    }
}

#[tokio::test]
async fn test_garbage_extraction_uses_fallback_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::with(Some("I am not sure."), Some(SUMMARY)), &dir);

    let outcome = orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert!(outcome.success);
    let record = outcome.record.unwrap();
    assert_eq!(record.diagnosis, "To be determined");
    assert_eq!(record.followup, "7 days");
    assert!(record.prescription.is_empty());

    assert_eq!(outcome.tasks[1].result.as_deref(), Some("No prescription issued"));
    assert!(outcome.admin.prescription_path.is_none());
    // Only the appointment reminder goes out
    assert_eq!(outcome.admin.notifications.len(), 1);
    assert_eq!(
        outcome.admin.appointment.unwrap().date,
        Local::now().date_naive() + Duration::days(7)
    );
}

#[tokio::test]
async fn test_summary_failure_uses_fallback_summary() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::with(Some(EXTRACTION), None), &dir);

    let outcome = orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert!(outcome.success);
    assert_eq!(outcome.tasks[4].status, TaskStatus::Completed);
    assert_eq!(
        outcome.admin.summary.as_deref(),
        Some("Patient Jane Roe diagnosed with Acute pharyngitis. Prescription issued. Follow-up scheduled in 2 weeks.")
    );
}

#[tokio::test]
async fn test_extraction_call_failure_is_an_error_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::with(None, None), &dir);

    let outcome = orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert!(!outcome.success);
    assert!(outcome.record.is_none());
    assert!(outcome.tasks.is_empty());
    assert!(outcome.error.unwrap().contains("generation failed"));
    assert_eq!(orchestrator.logs().last().unwrap().phase, "ERROR");
}

#[tokio::test]
async fn test_empty_note_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::happy(), &dir);

    let outcome = orchestrator.run("  \n ", "Jane Roe", 34).await;

    assert!(!outcome.success);
    assert_eq!(orchestrator.status(), RunStatus::Failed);
    assert!(orchestrator.calendar().appointments().is_empty());
}

#[tokio::test]
async fn test_second_visit_increments_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::happy(), &dir);

    orchestrator.run(NOTE, "Jane Roe", 34).await;
    let outcome = orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert_eq!(outcome.admin.patient_id, Some(2));
    assert_eq!(outcome.admin.appointment.unwrap().id, "2");
    let ids: Vec<&str> = orchestrator
        .notifications()
        .history()
        .iter()
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
    assert_eq!(orchestrator.store().get_patient_count().unwrap(), 1);
}

#[tokio::test]
async fn test_from_settings_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(&dir);

    let mut orchestrator = ClinicOrchestrator::from_settings(ClinicGateway::happy(), &settings).unwrap();
    assert!(orchestrator.run(NOTE, "Jane Roe", 34).await.success);

    assert!(settings.database_path().exists());
    assert!(settings.appointments_path().exists());
    assert!(settings.notifications_path().exists());
}

#[tokio::test]
async fn test_out_of_range_followup_fails_only_the_booking() {
    let dir = tempfile::tempdir().unwrap();
    let extraction = EXTRACTION.replace(r#""followup": "2 weeks""#, r#""followup": "999999999999 years""#);
    let mut orchestrator = orchestrator(ClinicGateway::with(Some(&extraction), Some(SUMMARY)), &dir);

    let outcome = orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert!(outcome.success, "error: {:?}", outcome.error);
    assert_eq!(outcome.record.unwrap().followup, "999999999999 years");
    assert_eq!(outcome.tasks[2].status, TaskStatus::Failed);
    assert!(outcome.tasks[2].result.as_deref().unwrap().contains("out of range"));
    assert!(outcome.admin.appointment.is_none());
    assert!(orchestrator.calendar().appointments().is_empty());

    let kinds: Vec<NotificationType> = orchestrator
        .notifications()
        .history()
        .iter()
        .map(|n| n.notification_type)
        .collect();
    assert_eq!(kinds, vec![NotificationType::Prescription]);
    assert_eq!(outcome.tasks[4].status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_upcoming_window_after_visits() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = orchestrator(ClinicGateway::happy(), &dir);
    let today = Local::now().date_naive();

    orchestrator.run(NOTE, "Jane Roe", 34).await;

    assert_eq!(orchestrator.calendar().get_upcoming(today, 14).len(), 1);
    assert!(orchestrator.calendar().get_upcoming(today, 13).is_empty());
    assert_eq!(orchestrator.calendar().get_upcoming(today, i64::MAX).len(), 1);
}
