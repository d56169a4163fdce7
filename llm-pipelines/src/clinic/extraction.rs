//! Doctor's note to structured record extraction

use super::types::{ClinicalRecord, PatientInfo, PrescriptionItem, NOT_MENTIONED};
use crate::llm::{LlmError, SharedGateway};
use crate::workflow_utils::{parse_json_object, ParseError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const EXTRACTION_TEMPERATURE: f32 = 0.0;
const NOTE_PREVIEW_CHARS: usize = 100;

const EXTRACTOR_SYSTEM_PROMPT: &str = "You are an expert medical information extraction \
specialist. You parse clinical notes into structured data and understand medical terminology, \
vital signs, medication dosages and appointment scheduling requirements.";

/// Loosely typed model output. Required fields are the ones without defaults.
#[derive(Debug, Deserialize)]
struct RawRecord {
    diagnosis: String,
    symptoms: Vec<Value>,
    vitals: BTreeMap<String, Value>,
    prescription: Vec<RawItem>,
    followup: Value,
    #[serde(default)]
    appointment_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    medication: Value,
    #[serde(default)]
    dosage: Value,
    #[serde(default)]
    frequency: Value,
    #[serde(default)]
    duration: Value,
}

fn value_text(value: &Value, missing: &str) -> String {
    match value {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => missing.to_string(),
    }
}

fn extraction_prompt(note: &str, name: &str, age: u32) -> String {
    format!(
        r#"Extract structured information from the following doctor's note:

Patient Name: {name}
Patient Age: {age}
Doctor's Note: {note}

Extract and structure the following information:
1. Patient Information (name, age)
2. Diagnosis (primary condition identified)
3. Vital Signs (temperature, blood pressure, heart rate, etc. if mentioned)
4. Symptoms (list of symptoms mentioned)
5. Prescription (medications with dosage and duration)
6. Follow-up (when the next appointment should be scheduled)
7. Appointment Type (routine, urgent, specialist referral, etc.)

Return ONLY a valid JSON object with this exact structure:
{{
    "patient": {{"name": "string", "age": number}},
    "diagnosis": "string",
    "symptoms": ["string"],
    "vitals": {{
        "temperature": "string",
        "blood_pressure": "string",
        "heart_rate": "string",
        "other": "string"
    }},
    "prescription": [
        {{"medication": "string", "dosage": "string", "frequency": "string", "duration": "string"}}
    ],
    "followup": "string (e.g., '7 days', '2 weeks', '1 month')",
    "appointment_type": "string (routine/urgent/specialist)"
}}

If any information is not mentioned in the note, use "Not mentioned" or an empty array/object."#
    )
}

/// Record used whenever the model output cannot be decoded.
pub fn fallback_record(note: &str, name: &str, age: u32) -> ClinicalRecord {
    let vitals = [
        ("temperature", NOT_MENTIONED.to_string()),
        ("blood_pressure", NOT_MENTIONED.to_string()),
        ("heart_rate", NOT_MENTIONED.to_string()),
        ("other", note.chars().take(NOTE_PREVIEW_CHARS).collect()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    ClinicalRecord {
        patient: PatientInfo {
            name: name.to_string(),
            age,
        },
        diagnosis: "To be determined".to_string(),
        symptoms: vec!["See note".to_string()],
        vitals,
        prescription: Vec::new(),
        followup: "7 days".to_string(),
        appointment_type: "routine".to_string(),
    }
}

/// Decodes model output into a record for the given patient.
///
/// The patient block of the output is ignored; `name` and `age` always win.
pub fn parse_record(response: &str, name: &str, age: u32) -> Result<ClinicalRecord, ParseError> {
    let raw: RawRecord = parse_json_object(response)?;

    let followup = match &raw.followup {
        Value::Number(n) => format!("{} days", n),
        other => value_text(other, ""),
    };
    if followup.is_empty() {
        return Err(ParseError::Shape("followup is empty".to_string()));
    }

    Ok(ClinicalRecord {
        patient: PatientInfo {
            name: name.to_string(),
            age,
        },
        diagnosis: raw.diagnosis.trim().to_string(),
        symptoms: raw
            .symptoms
            .iter()
            .map(|s| value_text(s, ""))
            .filter(|s| !s.is_empty())
            .collect(),
        vitals: raw
            .vitals
            .iter()
            .map(|(k, v)| (k.clone(), value_text(v, NOT_MENTIONED)))
            .collect(),
        prescription: raw
            .prescription
            .iter()
            .map(|item| PrescriptionItem {
                medication: value_text(&item.medication, "N/A"),
                dosage: value_text(&item.dosage, "N/A"),
                frequency: value_text(&item.frequency, "N/A"),
                duration: value_text(&item.duration, "N/A"),
            })
            .filter(|item| item.medication != "N/A")
            .collect(),
        followup,
        appointment_type: raw
            .appointment_type
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "routine".to_string()),
    })
}

pub struct RecordExtractor {
    llm: SharedGateway,
}

impl RecordExtractor {
    pub fn new(llm: SharedGateway) -> Self {
        Self { llm }
    }

    /// One model call at temperature 0. Unusable output yields
    /// [`fallback_record`]; only a failed call is an error.
    pub async fn extract(&self, note: &str, name: &str, age: u32) -> Result<ClinicalRecord, LlmError> {
        tracing::info!(patient = name, "extracting clinical record");
        let response = self
            .llm
            .complete(
                &extraction_prompt(note, name, age),
                Some(EXTRACTOR_SYSTEM_PROMPT),
                Some(EXTRACTION_TEMPERATURE),
            )
            .await?;

        Ok(parse_record(&response, name, age).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "extraction output unusable, using fallback record");
            fallback_record(note, name, age)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"Sure! ```json
{
  "patient": {"name": "Someone Else", "age": 99},
  "diagnosis": "Acute bronchitis",
  "symptoms": ["cough", "fever"],
  "vitals": {"temperature": "101.2F", "blood_pressure": "120/80", "heart_rate": 88, "other": null},
  "prescription": [
    {"medication": "Amoxicillin", "dosage": "500mg", "frequency": "3x daily", "duration": "7 days"},
    {"medication": "Ibuprofen", "dosage": "400mg"}
  ],
  "followup": "2 weeks",
  "appointment_type": "Routine"
}
```"#;

    #[test]
    fn test_parse_record_normalizes_values() {
        let record = parse_record(GOOD, "John Doe", 45).unwrap();
        assert_eq!(record.patient, PatientInfo { name: "John Doe".into(), age: 45 });
        assert_eq!(record.diagnosis, "Acute bronchitis");
        assert_eq!(record.vitals["heart_rate"], "88");
        assert_eq!(record.vitals["other"], NOT_MENTIONED);
        assert_eq!(record.prescription.len(), 2);
        assert_eq!(record.prescription[1].frequency, "N/A");
        assert_eq!(record.followup, "2 weeks");
        assert_eq!(record.appointment_type, "routine");
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let text = r#"{"diagnosis": "Flu", "symptoms": [], "vitals": {}, "prescription": []}"#;
        assert!(matches!(parse_record(text, "A", 1), Err(ParseError::Json(_))));
        assert!(matches!(parse_record("no json here", "A", 1), Err(ParseError::NoStructure)));
    }

    #[test]
    fn test_fallback_record_shape() {
        let note = "n".repeat(250);
        let record = fallback_record(&note, "Jane", 30);
        assert_eq!(record.diagnosis, "To be determined");
        assert_eq!(record.symptoms, vec!["See note"]);
        assert_eq!(record.vitals["other"].len(), 100);
        assert_eq!(record.vitals["temperature"], NOT_MENTIONED);
        assert!(record.prescription.is_empty());
        assert_eq!(record.followup, "7 days");
        assert_eq!(record.appointment_type, "routine");
    }
}
