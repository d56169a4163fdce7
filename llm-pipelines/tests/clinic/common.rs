//! Stub gateway and store setup for clinic tests

use llm_pipelines::clinic::{
    CalendarManager, ClinicOrchestrator, NotificationService, PrescriptionWriter, RecordStore,
};
use llm_pipelines::config::Settings;
use llm_pipelines::llm::{LlmError, LlmGateway};
use llm_pipelines_sdk::async_trait;
use std::sync::Arc;
use tempfile::TempDir;

pub const NOTE: &str = "Patient presents with fever 101F, sore throat and cough for 3 days. \
BP 120/80. Diagnosed with acute pharyngitis. Prescribed Amoxicillin 500mg three times daily \
for 7 days and Ibuprofen 400mg as needed for 5 days. Follow up in 2 weeks.";

pub const EXTRACTION: &str = r#"{
  "patient": {"name": "Jane Roe", "age": 34},
  "diagnosis": "Acute pharyngitis",
  "symptoms": ["fever", "sore throat", "cough"],
  "vitals": {"temperature": "101F", "blood_pressure": "120/80", "heart_rate": "Not mentioned"},
  "prescription": [
    {"medication": "Amoxicillin", "dosage": "500mg", "frequency": "three times daily", "duration": "7 days"},
    {"medication": "Ibuprofen", "dosage": "400mg", "frequency": "as needed", "duration": "5 days"}
  ],
  "followup": "2 weeks",
  "appointment_type": "Routine"
}"#;

pub const SUMMARY: &str = "Patient Jane Roe diagnosed with acute pharyngitis. Amoxicillin and \
ibuprofen prescribed. Follow-up in two weeks.";

/// Extraction and summary responses chosen per prompt.
pub struct ClinicGateway {
    extraction: Option<String>,
    summary: Option<String>,
}

impl ClinicGateway {
    pub fn happy() -> Arc<Self> {
        Arc::new(Self {
            extraction: Some(EXTRACTION.to_string()),
            summary: Some(SUMMARY.to_string()),
        })
    }

    pub fn with(extraction: Option<&str>, summary: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            extraction: extraction.map(str::to_string),
            summary: summary.map(str::to_string),
        })
    }
}

#[async_trait]
impl LlmGateway for ClinicGateway {
    async fn complete(&self, prompt: &str, _: Option<&str>, _: Option<f32>) -> Result<String, LlmError> {
        let answer = if prompt.starts_with("Extract structured information") {
            &self.extraction
        } else {
            &self.summary
        };
        answer
            .clone()
            .ok_or_else(|| LlmError::Generation("model unavailable".to_string()))
    }

    fn model(&self) -> &str {
        "clinic-stub"
    }
}

pub fn settings_in(dir: &TempDir) -> Settings {
    Settings::default().rooted_at(dir.path())
}

/// Orchestrator over an in-memory record store and tempdir files.
pub fn orchestrator(llm: Arc<ClinicGateway>, dir: &TempDir) -> ClinicOrchestrator {
    let settings = settings_in(dir);
    let store = RecordStore::new_in_memory().unwrap();
    store.initialize_schema().unwrap();
    ClinicOrchestrator::new(
        llm,
        store,
        CalendarManager::load(settings.appointments_path()).unwrap(),
        NotificationService::load(settings.notifications_path()).unwrap(),
        PrescriptionWriter::new(&settings.prescriptions_dir),
    )
}
