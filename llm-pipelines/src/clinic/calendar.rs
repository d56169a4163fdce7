//! Follow-up appointment calendar backed by a JSON file

use super::types::{Appointment, AppointmentStatus, ClinicError};
use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_FOLLOWUP_DAYS: i64 = 7;
pub const DEFAULT_APPOINTMENT_TIME: &str = "09:00 AM";

/// Days until a follow-up described as "N day(s)/week(s)/month(s)/year(s)".
///
/// Months count as 30 days and years as 365. Anything unrecognized is
/// [`DEFAULT_FOLLOWUP_DAYS`].
pub fn parse_followup_days(followup: &str) -> i64 {
    static PERIOD: OnceLock<Regex> = OnceLock::new();
    let re = PERIOD.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\d+)\s*(day|week|month|year)s?\b").expect("static regex")
    });

    let Some(caps) = re.captures(followup) else {
        return DEFAULT_FOLLOWUP_DAYS;
    };
    let Ok(n) = caps[1].parse::<i64>() else {
        return DEFAULT_FOLLOWUP_DAYS;
    };
    let unit = match caps[2].to_lowercase().as_str() {
        "day" => 1,
        "week" => 7,
        "month" => 30,
        _ => 365,
    };
    n.saturating_mul(unit)
}

/// Appointments persisted as a pretty-printed JSON array
pub struct CalendarManager {
    path: PathBuf,
    appointments: Vec<Appointment>,
}

impl CalendarManager {
    /// Loads the calendar file. A missing file is an empty calendar.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ClinicError> {
        let path = path.into();
        let appointments = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            Vec::new()
        };
        Ok(Self { path, appointments })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    fn save(&self) -> Result<(), ClinicError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.appointments)?)?;
        Ok(())
    }

    fn next_id(&self) -> String {
        let max = self
            .appointments
            .iter()
            .filter_map(|a| a.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    /// Books a follow-up `followup` from today.
    pub fn schedule_appointment(
        &mut self,
        patient_name: &str,
        followup: &str,
        appointment_type: &str,
    ) -> Result<Appointment, ClinicError> {
        self.schedule_from(Local::now().date_naive(), patient_name, followup, appointment_type)
    }

    /// Books a follow-up `followup` after `from`.
    pub fn schedule_from(
        &mut self,
        from: NaiveDate,
        patient_name: &str,
        followup: &str,
        appointment_type: &str,
    ) -> Result<Appointment, ClinicError> {
        let days = parse_followup_days(followup);
        let date = Duration::try_days(days)
            .and_then(|delta| from.checked_add_signed(delta))
            .ok_or_else(|| ClinicError::FollowupOutOfRange(followup.to_string()))?;

        let appointment = Appointment {
            id: self.next_id(),
            patient_name: patient_name.to_string(),
            date,
            time: DEFAULT_APPOINTMENT_TIME.to_string(),
            appointment_type: appointment_type.to_string(),
            status: AppointmentStatus::Scheduled,
            created_at: Local::now(),
        };
        self.appointments.push(appointment.clone());
        self.save()?;

        tracing::info!(patient = patient_name, date = %appointment.date, "appointment scheduled");
        Ok(appointment)
    }

    pub fn get_appointments_for_patient(&self, patient_name: &str) -> Vec<&Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.patient_name == patient_name)
            .collect()
    }

    /// Scheduled appointments from `today` through `today + days`, soonest first.
    ///
    /// A window past the end of the calendar extends to [`NaiveDate::MAX`].
    pub fn get_upcoming(&self, today: NaiveDate, days: i64) -> Vec<&Appointment> {
        let cutoff = Duration::try_days(days)
            .and_then(|delta| today.checked_add_signed(delta))
            .unwrap_or(NaiveDate::MAX);
        let mut upcoming: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled && a.date >= today && a.date <= cutoff)
            .collect();
        upcoming.sort_by(|a, b| a.date.cmp(&b.date));
        upcoming
    }

    /// Marks an appointment cancelled. Returns false for an unknown id.
    pub fn cancel_appointment(&mut self, id: &str) -> Result<bool, ClinicError> {
        let Some(appointment) = self.appointments.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        appointment.status = AppointmentStatus::Cancelled;
        self.save()?;
        tracing::info!(id, "appointment cancelled");
        Ok(true)
    }
}
