//! Clinic data structures

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const NOT_MENTIONED: &str = "Not mentioned";

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("invalid stored value: {0}")]
    Corrupt(String),

    #[error("follow-up '{0}' is out of range")]
    FollowupOutOfRange(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

impl fmt::Display for PrescriptionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {} for {}",
            self.medication, self.dosage, self.frequency, self.duration
        )
    }
}

fn default_appointment_type() -> String {
    "routine".to_string()
}

/// Structured content of one doctor's note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    pub patient: PatientInfo,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    /// temperature, blood_pressure, heart_rate, other, ...
    pub vitals: BTreeMap<String, String>,
    pub prescription: Vec<PrescriptionItem>,
    /// e.g. "7 days", "2 weeks"
    pub followup: String,
    #[serde(default = "default_appointment_type")]
    pub appointment_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_name: String,
    pub date: NaiveDate,
    /// Display time, e.g. "09:00 AM"
    pub time: String,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AppointmentReminder,
    Prescription,
    FollowupReminder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub patient_name: String,
    pub message: String,
    pub status: String,
    pub timestamp: DateTime<Local>,
}

/// A patient visit as read back from the record store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientRow {
    pub id: i64,
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub vitals: BTreeMap<String, String>,
    pub prescription: Vec<PrescriptionItem>,
    pub followup: String,
    /// Visit date, YYYY-MM-DD
    pub date: String,
    pub created_at: String,
}

/// An appointment row from the record store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentRow {
    pub id: i64,
    pub patient_name: String,
    pub date: String,
    pub time: String,
    pub appointment_type: String,
    pub status: String,
}
