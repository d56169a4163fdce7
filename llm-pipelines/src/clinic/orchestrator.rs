//! Clinic visit orchestration: note extraction followed by admin tasks

use super::admin::{admin_plan, AdminOutcome, AdminWorker};
use super::calendar::CalendarManager;
use super::extraction::RecordExtractor;
use super::notifications::NotificationService;
use super::prescription::PrescriptionWriter;
use super::records::RecordStore;
use super::types::ClinicalRecord;
use crate::config::Settings;
use crate::llm::SharedGateway;
use crate::workflow_utils::execute_plan;
use anyhow::{bail, Context, Result};
use llm_pipelines_sdk::{RunStatus, StatusEvent, StatusReporter, Task};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const ORCHESTRATOR: &str = "orchestrator";

#[derive(Debug, Clone, Serialize)]
pub struct ClinicOutcome {
    pub run_id: Uuid,
    pub success: bool,
    pub record: Option<ClinicalRecord>,
    pub admin: AdminOutcome,
    /// Admin tasks with their final status and result
    pub tasks: Vec<Task>,
    pub error: Option<String>,
}

pub struct ClinicOrchestrator {
    llm: SharedGateway,
    store: RecordStore,
    calendar: CalendarManager,
    notifications: NotificationService,
    prescriptions: PrescriptionWriter,
    reporter: StatusReporter,
    status: RunStatus,
}

impl ClinicOrchestrator {
    /// Opens the record store, calendar and notification history under the
    /// configured data directory.
    pub fn from_settings(llm: SharedGateway, settings: &Settings) -> Result<Self> {
        let store = RecordStore::new(settings.database_path())
            .with_context(|| format!("opening {}", settings.database_path().display()))?;
        store.initialize_schema().context("initializing record store")?;
        let calendar = CalendarManager::load(settings.appointments_path()).context("loading calendar")?;
        let notifications =
            NotificationService::load(settings.notifications_path()).context("loading notification history")?;

        Ok(Self::new(
            llm,
            store,
            calendar,
            notifications,
            PrescriptionWriter::new(&settings.prescriptions_dir),
        ))
    }

    pub fn new(
        llm: SharedGateway,
        store: RecordStore,
        calendar: CalendarManager,
        notifications: NotificationService,
        prescriptions: PrescriptionWriter,
    ) -> Self {
        Self {
            llm,
            store,
            calendar,
            notifications,
            prescriptions,
            reporter: StatusReporter::new(),
            status: RunStatus::NotStarted,
        }
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&StatusEvent) + Send + 'static) {
        self.reporter.set_observer(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.reporter.subscribe()
    }

    pub fn logs(&self) -> &[StatusEvent] {
        self.reporter.events()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn calendar(&self) -> &CalendarManager {
        &self.calendar
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Extracts a record from `note` and runs the admin tasks for it.
    ///
    /// Never returns an error; see `success` and `error` on the outcome.
    pub async fn run(&mut self, note: &str, patient_name: &str, patient_age: u32) -> ClinicOutcome {
        let run_id = Uuid::new_v4();
        self.status = RunStatus::Running;
        tracing::info!(%run_id, patient = patient_name, "clinic run started");

        let mut record = None;
        let mut tasks = Vec::new();
        let mut admin = AdminOutcome::default();
        let result = self
            .execute(note.trim(), patient_name.trim(), patient_age, &mut record, &mut tasks, &mut admin)
            .await;

        let error = match result {
            Ok(()) => {
                self.status = RunStatus::Completed;
                None
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(%run_id, error = %message, "clinic run failed");
                self.reporter
                    .emit(StatusEvent::new("ERROR", format!("Processing failed: {}", message)).from_agent(ORCHESTRATOR));
                self.status = RunStatus::Failed;
                Some(message)
            }
        };

        ClinicOutcome {
            run_id,
            success: error.is_none(),
            record,
            admin,
            tasks,
            error,
        }
    }

    async fn execute(
        &mut self,
        note: &str,
        patient_name: &str,
        patient_age: u32,
        record_out: &mut Option<ClinicalRecord>,
        tasks_out: &mut Vec<Task>,
        admin_out: &mut AdminOutcome,
    ) -> Result<()> {
        if note.is_empty() {
            bail!("doctor's note is empty");
        }
        if patient_name.is_empty() {
            bail!("patient name is empty");
        }

        self.reporter.emit(
            StatusEvent::new("EXTRACTING", format!("Extracting information for {}", patient_name))
                .from_agent(ORCHESTRATOR),
        );
        let record = RecordExtractor::new(self.llm.clone())
            .extract(note, patient_name, patient_age)
            .await
            .context("extraction failed")?;
        self.reporter.emit(
            StatusEvent::new("RECORD_READY", format!("Diagnosis: {}", record.diagnosis))
                .from_agent(ORCHESTRATOR)
                .with_detail("medications", record.prescription.len()),
        );
        *record_out = Some(record.clone());

        self.reporter
            .emit(StatusEvent::new("ADMIN_START", "Running administrative tasks").from_agent(ORCHESTRATOR));
        let mut plan = admin_plan(patient_name);
        let mut worker = AdminWorker::new(
            &record,
            self.llm.clone(),
            &mut self.store,
            &mut self.calendar,
            &mut self.notifications,
            &self.prescriptions,
        );
        let summary = execute_plan(&mut plan, &mut worker, &mut self.reporter, None).await;
        *admin_out = worker.into_outcome();
        *tasks_out = plan.tasks;

        self.reporter.emit(
            StatusEvent::new(
                "ADMIN_COMPLETE",
                format!("Completed {} tasks, {} failed", summary.completed, summary.failed),
            )
            .from_agent(ORCHESTRATOR)
            .with_detail("completed", summary.completed)
            .with_detail("failed", summary.failed),
        );
        Ok(())
    }
}
