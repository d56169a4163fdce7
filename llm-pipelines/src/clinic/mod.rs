//! Doctor's admin automator
//!
//! Turns a free-text doctor's note into a structured record, then stores it,
//! writes the prescription PDF, books the follow-up, notifies the patient and
//! summarizes the visit.

pub mod admin;
pub mod calendar;
pub mod extraction;
pub mod notifications;
pub mod orchestrator;
pub mod prescription;
pub mod records;
pub mod types;

pub use admin::{admin_plan, fallback_summary, AdminOutcome, AdminStep, AdminWorker};
pub use calendar::{parse_followup_days, CalendarManager};
pub use extraction::{fallback_record, parse_record, RecordExtractor};
pub use notifications::NotificationService;
pub use orchestrator::{ClinicOrchestrator, ClinicOutcome};
pub use prescription::PrescriptionWriter;
pub use records::RecordStore;
pub use types::{
    Appointment, AppointmentRow, AppointmentStatus, ClinicError, ClinicalRecord, Notification,
    NotificationType, PatientInfo, PatientRow, PrescriptionItem,
};
