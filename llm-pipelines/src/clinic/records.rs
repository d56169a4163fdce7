//! SQLite record store for patient visits and appointments
//!
//! # Database Schema
//!
//! 1. **patients** - One row per visit. Symptoms, vitals and prescription are
//!    stored as JSON text.
//! 2. **appointments** - Follow-up bookings mirrored from the calendar
//! 3. **schema_version** - Schema version for migrations
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use llm_pipelines::clinic::RecordStore;
//!
//! # fn main() -> Result<(), llm_pipelines::clinic::ClinicError> {
//! let store = RecordStore::new("data/medical_records.db")?;
//! store.initialize_schema()?;
//!
//! for patient in store.get_all_patients(10)? {
//!     println!("{} - {}", patient.name, patient.diagnosis);
//! }
//! println!("{} distinct patients", store.get_patient_count()?);
//! # Ok(())
//! # }
//! ```

use super::types::{Appointment, AppointmentRow, ClinicError, ClinicalRecord, PatientRow};
use chrono::{Local, NaiveDate, SecondsFormat};
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use std::path::Path;

const SCHEMA_VERSION: i32 = 2;

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Opens (creating if needed) the database file at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ClinicError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn })
    }

    /// Create an in-memory database
    pub fn new_in_memory() -> Result<Self, ClinicError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Creates tables and indexes, then runs pending migrations
    pub fn initialize_schema(&self) -> Result<(), ClinicError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS patients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                age INTEGER NOT NULL,
                diagnosis TEXT,
                symptoms TEXT,
                vitals TEXT,
                prescription TEXT,
                followup TEXT,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS appointments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patient_name TEXT NOT NULL,
                appointment_date TEXT NOT NULL,
                appointment_time TEXT NOT NULL,
                appointment_type TEXT,
                status TEXT NOT NULL DEFAULT 'scheduled',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )?;

        self.migrate_to_v2()?;
        Ok(())
    }

    /// Version 2 adds lookup indexes for name search and upcoming appointments
    pub fn migrate_to_v2(&self) -> Result<(), ClinicError> {
        if self.get_schema_version()? < 2 {
            self.conn.execute_batch(
                r#"
                CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(name);
                CREATE INDEX IF NOT EXISTS idx_appointments_date
                ON appointments(status, appointment_date, appointment_time);

                INSERT OR IGNORE INTO schema_version (version) VALUES (2);
                "#,
            )?;
        }
        Ok(())
    }

    pub fn get_schema_version(&self) -> Result<i32, ClinicError> {
        let version: i32 = self
            .conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
        Ok(version)
    }

    pub fn schema_is_current(&self) -> Result<bool, ClinicError> {
        Ok(self.get_schema_version()? == SCHEMA_VERSION)
    }

    /// Inserts a visit and returns its row id
    pub fn add_patient_record(&self, record: &ClinicalRecord) -> Result<i64, ClinicError> {
        self.conn.execute(
            r#"
            INSERT INTO patients (name, age, diagnosis, symptoms, vitals, prescription, followup, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.patient.name,
                record.patient.age,
                record.diagnosis,
                serde_json::to_string(&record.symptoms)?,
                serde_json::to_string(&record.vitals)?,
                serde_json::to_string(&record.prescription)?,
                record.followup,
                Local::now().format("%Y-%m-%d").to_string(),
                Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        tracing::info!(patient = %record.patient.name, id, "patient record added");
        Ok(id)
    }

    pub fn add_appointment(&self, appointment: &Appointment) -> Result<i64, ClinicError> {
        self.conn.execute(
            r#"
            INSERT INTO appointments (patient_name, appointment_date, appointment_time, appointment_type, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                appointment.patient_name,
                appointment.date.format("%Y-%m-%d").to_string(),
                appointment.time,
                appointment.appointment_type,
                appointment.status.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent visits first
    pub fn get_all_patients(&self, limit: usize) -> Result<Vec<PatientRow>, ClinicError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, age, diagnosis, symptoms, vitals, prescription, followup, date, created_at
            FROM patients
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;
        let rows = stmt
            .query_map(params![limit as i64], map_patient_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Visits whose patient name contains `name`
    pub fn get_patient_by_name(&self, name: &str) -> Result<Vec<PatientRow>, ClinicError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, age, diagnosis, symptoms, vitals, prescription, followup, date, created_at
            FROM patients
            WHERE name LIKE ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )?;
        let rows = stmt
            .query_map(params![format!("%{}%", name)], map_patient_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of distinct patient names
    pub fn get_patient_count(&self) -> Result<usize, ClinicError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT name) FROM patients", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Scheduled appointments on or after `from`, soonest first
    pub fn get_upcoming_appointments(&self, from: NaiveDate, limit: usize) -> Result<Vec<AppointmentRow>, ClinicError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, patient_name, appointment_date, appointment_time, appointment_type, status
            FROM appointments
            WHERE status = 'scheduled' AND appointment_date >= ?1
            ORDER BY appointment_date, appointment_time
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![from.format("%Y-%m-%d").to_string(), limit as i64], |row| {
                Ok(AppointmentRow {
                    id: row.get(0)?,
                    patient_name: row.get(1)?,
                    date: row.get(2)?,
                    time: row.get(3)?,
                    appointment_type: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    status: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Decodes a JSON text column, treating NULL or empty as the default
fn json_column<T: DeserializeOwned + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let text: Option<String> = row.get(idx)?;
    match text.as_deref() {
        None | Some("") => Ok(T::default()),
        Some(s) => serde_json::from_str(s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        }),
    }
}

fn map_patient_row(row: &Row) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        diagnosis: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        symptoms: json_column(row, 4)?,
        vitals: json_column(row, 5)?,
        prescription: json_column(row, 6)?,
        followup: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
        date: row.get(8)?,
        created_at: row.get(9)?,
    })
}
