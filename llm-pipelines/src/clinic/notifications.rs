//! Patient notifications
//!
//! Delivery is simulated: each notification is logged and appended to a JSON
//! history file with status `sent`.

use super::types::{ClinicError, Notification, NotificationType, PrescriptionItem};
use chrono::Local;
use std::path::PathBuf;

const SIGNATURE: &str = "Best regards,\nMedical Clinic";

pub struct NotificationService {
    path: PathBuf,
    notifications: Vec<Notification>,
}

impl NotificationService {
    /// Loads the history file. A missing file is an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ClinicError> {
        let path = path.into();
        let notifications = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, notifications })
    }

    pub fn history(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn get_notifications_for_patient(&self, patient_name: &str) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| n.patient_name == patient_name)
            .collect()
    }

    pub fn send_appointment_reminder(&mut self, patient_name: &str, date: &str, time: &str) -> Result<String, ClinicError> {
        let message = format!(
            "Dear {patient_name},\n\nThis is a reminder for your upcoming appointment:\nDate: {date}\nTime: {time}\n\n\
             Please arrive 10 minutes early.\nIf you need to reschedule, please contact us.\n\n{SIGNATURE}"
        );
        self.record(NotificationType::AppointmentReminder, patient_name, message)?;
        Ok(format!("Appointment reminder sent for {} at {}", date, time))
    }

    pub fn send_prescription_notification(
        &mut self,
        patient_name: &str,
        prescription: &[PrescriptionItem],
    ) -> Result<String, ClinicError> {
        let medications = if prescription.is_empty() {
            "See prescription document".to_string()
        } else {
            prescription
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let message = format!(
            "Dear {patient_name},\n\nYour prescription has been prepared:\n\n{medications}\n\n\
             Please follow the instructions carefully.\nContact us if you have any questions.\n\n{SIGNATURE}"
        );
        self.record(NotificationType::Prescription, patient_name, message)?;
        Ok(format!("Prescription details sent to {}", patient_name))
    }

    pub fn send_followup_reminder(&mut self, patient_name: &str, days: i64) -> Result<String, ClinicError> {
        let message = format!(
            "Dear {patient_name},\n\nThis is a reminder that your follow-up appointment is due in {days} days.\n\n\
             Please schedule your appointment if you haven't already.\n\n{SIGNATURE}"
        );
        self.record(NotificationType::FollowupReminder, patient_name, message)?;
        Ok(format!("Follow-up reminder sent for {} days", days))
    }

    fn next_id(&self) -> String {
        let max = self
            .notifications
            .iter()
            .filter_map(|n| n.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    fn record(&mut self, kind: NotificationType, patient_name: &str, message: String) -> Result<(), ClinicError> {
        let notification = Notification {
            id: self.next_id(),
            notification_type: kind,
            patient_name: patient_name.to_string(),
            message,
            status: "sent".to_string(),
            timestamp: Local::now(),
        };
        tracing::info!(patient = patient_name, kind = ?kind, id = %notification.id, "notification sent");
        self.notifications.push(notification);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.notifications)?)?;
        Ok(())
    }
}
