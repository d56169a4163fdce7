//! Administrative follow-through for one visit
//!
//! Five tasks run through the shared sequencer: EHR insert, prescription PDF,
//! appointment booking, patient notifications and a visit summary.

use super::calendar::CalendarManager;
use super::notifications::NotificationService;
use super::prescription::PrescriptionWriter;
use super::records::RecordStore;
use super::types::{Appointment, ClinicalRecord};
use crate::llm::SharedGateway;
use crate::workflow_utils::StepExecutor;
use anyhow::{Context, Result};
use llm_pipelines_sdk::{async_trait, Plan, StatusEvent, StatusReporter, Task, TaskSpec};
use serde::Serialize;
use std::path::PathBuf;

const ADMIN: &str = "admin";
const SUMMARY_TEMPERATURE: f32 = 0.3;

const ADMIN_SYSTEM_PROMPT: &str = "You are a highly efficient medical administrator. You ensure \
documentation is accurate, prescriptions are properly formatted, appointments are scheduled \
appropriately and patients receive timely notifications.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStep {
    FillEhr,
    GeneratePrescription,
    ScheduleAppointment,
    SendNotifications,
    Summarize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("no admin step has task id {0}")]
pub struct UnknownAdminStep(pub u32);

impl TryFrom<u32> for AdminStep {
    type Error = UnknownAdminStep;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Ok(match id {
            1 => AdminStep::FillEhr,
            2 => AdminStep::GeneratePrescription,
            3 => AdminStep::ScheduleAppointment,
            4 => AdminStep::SendNotifications,
            5 => AdminStep::Summarize,
            other => return Err(UnknownAdminStep(other)),
        })
    }
}

/// The fixed five-task admin plan for `patient_name`
pub fn admin_plan(patient_name: &str) -> Plan {
    Plan::from_specs(
        format!("Administrative tasks for {}", patient_name),
        [
            TaskSpec::new("Fill EHR", "Store the visit in the electronic health record"),
            TaskSpec::new("Generate Prescription", "Render the prescription as a PDF"),
            TaskSpec::new("Schedule Appointment", "Book the follow-up appointment"),
            TaskSpec::new("Send Notifications", "Notify the patient of appointment and prescription"),
            TaskSpec::new("Summary", "Summarize the visit for the doctor"),
        ],
    )
}

/// Fallback used when the summary cannot be generated
pub fn fallback_summary(record: &ClinicalRecord) -> String {
    format!(
        "Patient {} diagnosed with {}. Prescription issued. Follow-up scheduled in {}.",
        record.patient.name, record.diagnosis, record.followup
    )
}

/// What the admin tasks produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminOutcome {
    pub patient_id: Option<i64>,
    pub prescription_path: Option<PathBuf>,
    pub appointment: Option<Appointment>,
    pub notifications: Vec<String>,
    pub summary: Option<String>,
}

/// Mutable handles to the clinic's stores for the duration of one visit
pub struct AdminWorker<'a> {
    record: &'a ClinicalRecord,
    llm: SharedGateway,
    store: &'a mut RecordStore,
    calendar: &'a mut CalendarManager,
    notifications: &'a mut NotificationService,
    prescriptions: &'a PrescriptionWriter,
    outcome: AdminOutcome,
}

impl<'a> AdminWorker<'a> {
    pub fn new(
        record: &'a ClinicalRecord,
        llm: SharedGateway,
        store: &'a mut RecordStore,
        calendar: &'a mut CalendarManager,
        notifications: &'a mut NotificationService,
        prescriptions: &'a PrescriptionWriter,
    ) -> Self {
        Self {
            record,
            llm,
            store,
            calendar,
            notifications,
            prescriptions,
            outcome: AdminOutcome::default(),
        }
    }

    pub fn outcome(&self) -> &AdminOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> AdminOutcome {
        self.outcome
    }

    fn fill_ehr(&mut self) -> Result<String> {
        let id = self
            .store
            .add_patient_record(self.record)
            .context("saving patient record")?;
        self.outcome.patient_id = Some(id);
        Ok(format!("Patient record saved (ID: {})", id))
    }

    fn generate_prescription(&mut self) -> Result<String> {
        if self.record.prescription.is_empty() {
            return Ok("No prescription issued".to_string());
        }
        let path = self
            .prescriptions
            .write(self.record)
            .context("writing prescription PDF")?;
        let result = format!("Prescription generated: {}", path.display());
        self.outcome.prescription_path = Some(path);
        Ok(result)
    }

    fn schedule_appointment(&mut self) -> Result<String> {
        let appointment = self
            .calendar
            .schedule_appointment(
                &self.record.patient.name,
                &self.record.followup,
                &self.record.appointment_type,
            )
            .context("booking follow-up")?;
        if let Err(e) = self.store.add_appointment(&appointment) {
            tracing::warn!(error = %e, "appointment not mirrored to record store");
        }

        let result = format!("Appointment scheduled for {} at {}", appointment.date, appointment.time);
        self.outcome.appointment = Some(appointment);
        Ok(result)
    }

    fn send_notifications(&mut self) -> Result<String> {
        let name = &self.record.patient.name;
        let mut sent = Vec::new();

        if let Some(appointment) = &self.outcome.appointment {
            sent.push(
                self.notifications
                    .send_appointment_reminder(name, &appointment.date.to_string(), &appointment.time)
                    .context("sending appointment reminder")?,
            );
        }
        if !self.record.prescription.is_empty() {
            sent.push(
                self.notifications
                    .send_prescription_notification(name, &self.record.prescription)
                    .context("sending prescription notification")?,
            );
        }

        if sent.is_empty() {
            return Ok("No notifications needed".to_string());
        }
        let result = sent.join("; ");
        self.outcome.notifications = sent;
        Ok(result)
    }

    async fn summarize(&mut self) -> Result<String> {
        let record = self.record;
        let medications = if record.prescription.is_empty() {
            "none".to_string()
        } else {
            record
                .prescription
                .iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        };
        let prompt = format!(
            "Summarize this patient visit for the doctor's records.\n\n\
             Patient: {} ({} years)\nDiagnosis: {}\nSymptoms: {}\nPrescription: {}\nFollow-up: {}\n\n\
             Include a brief summary of the visit, next steps for the patient and any special \
             instructions.\nFormat: \"Patient [Name] diagnosed with [Diagnosis]. [Prescription details]. \
             [Follow-up information].\"",
            record.patient.name,
            record.patient.age,
            record.diagnosis,
            record.symptoms.join(", "),
            medications,
            record.followup
        );

        let summary = match self
            .llm
            .complete(&prompt, Some(ADMIN_SYSTEM_PROMPT), Some(SUMMARY_TEMPERATURE))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_summary(record),
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed, using fallback");
                fallback_summary(record)
            }
        };
        self.outcome.summary = Some(summary.clone());
        Ok(summary)
    }
}

#[async_trait]
impl StepExecutor for AdminWorker<'_> {
    async fn execute_step(&mut self, task: &Task, reporter: &mut StatusReporter) -> Result<String> {
        let step = AdminStep::try_from(task.id)?;
        reporter.emit(
            StatusEvent::new("ADMIN_TASK", task.name.clone())
                .from_agent(ADMIN)
                .with_detail("patient", &self.record.patient.name),
        );
        match step {
            AdminStep::FillEhr => self.fill_ehr(),
            AdminStep::GeneratePrescription => self.generate_prescription(),
            AdminStep::ScheduleAppointment => self.schedule_appointment(),
            AdminStep::SendNotifications => self.send_notifications(),
            AdminStep::Summarize => self.summarize().await,
        }
    }

    fn agent_name(&self) -> &str {
        ADMIN
    }
}
