//! Three-physician consultation over a single medical report
//!
//! Each physician is one prompt. The specialist sees the diagnostic analysis
//! and the coordinator sees both, so the calls are strictly sequential.

use crate::llm::SharedGateway;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use llm_pipelines_sdk::{StatusEvent, StatusReporter};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::broadcast;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const SYSTEM: &str = "System";
const RULE_WIDTH: usize = 70;

/// One consulting physician
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub role: &'static str,
    pub focus: &'static str,
    #[serde(skip)]
    instructions: &'static [&'static str],
}

impl AgentInfo {
    fn system_prompt(&self) -> String {
        let mut prompt = format!("You are {}, {}.\n\nInstructions:\n", self.name, self.role);
        for line in self.instructions {
            prompt.push_str("- ");
            prompt.push_str(line);
            prompt.push('\n');
        }
        prompt
    }
}

const DIAGNOSTIC: AgentInfo = AgentInfo {
    key: "diagnostic",
    name: "Dr. Diagnostic",
    role: "Primary Diagnostic Physician",
    focus: "Initial symptom analysis and diagnosis",
    instructions: &[
        "Analyze medical reports and symptoms thoroughly",
        "Identify key concerns and potential diagnoses",
        "Flag urgent issues that need immediate attention",
        "Be concise and specific with medical terminology",
        "Focus on pattern recognition in symptoms",
        "Consider vital signs and their implications",
        "Identify any life-threatening conditions first",
    ],
};

const SPECIALIST: AgentInfo = AgentInfo {
    key: "specialist",
    name: "Dr. Specialist",
    role: "Medical Specialist Consultant",
    focus: "Detailed investigation and treatment planning",
    instructions: &[
        "Provide specialized medical insights based on findings",
        "Suggest specific diagnostic tests or investigations needed",
        "Consider rare conditions and potential complications",
        "Recommend evidence-based treatment approaches",
        "Note any drug interactions or contraindications",
        "Consider differential diagnoses",
        "Identify specialists that should be consulted",
    ],
};

const COORDINATOR: AgentInfo = AgentInfo {
    key: "coordinator",
    name: "Dr. Coordinator",
    role: "Medical Case Coordinator",
    focus: "Synthesis and comprehensive care planning",
    instructions: &[
        "Synthesize findings from diagnostic and specialist agents",
        "Create clear, actionable medical recommendations",
        "Prioritize next steps for patient care with timelines",
        "Ensure nothing critical is missed from other agents",
        "Provide patient-friendly summary without medical jargon",
        "Create a cohesive care plan",
        "Highlight follow-up requirements",
    ],
};

/// The three physicians in consultation order
pub fn agent_info() -> [AgentInfo; 3] {
    [DIAGNOSTIC, SPECIALIST, COORDINATOR]
}

/// Built-in cases for trying the analyzer without a report at hand
pub const SAMPLE_REPORTS: [(&str, &str); 3] = [
    (
        "chest-pain",
        "Patient: 58-year-old male\n\
         Chief Complaint: Chest pain, shortness of breath\n\
         History: Pain started 2 hours ago, radiating to left arm\n\
         Vitals: BP 150/95, HR 98, Temp 98.6°F, O2 Sat 94%\n\
         Physical: Diaphoresis noted, mild distress\n\
         Labs: Pending troponin, ECG shows ST elevation in leads II, III, aVF\n\
         Past Medical History: Hypertension, hyperlipidemia\n\
         Medications: Lisinopril 10mg, Atorvastatin 40mg",
    ),
    (
        "diabetic-followup",
        "Patient: 45-year-old female with Type 2 DM\n\
         Chief Complaint: Routine follow-up, foot tingling\n\
         History: DM for 8 years, inconsistent medication adherence\n\
         Vitals: BP 140/88, HR 76, BMI 32, Weight 185 lbs\n\
         Labs: HbA1c 9.2%, fasting glucose 220 mg/dL, Creatinine 1.1\n\
         Physical: Decreased sensation in bilateral feet, no wounds noted\n\
         Current medications: Metformin 1000mg BID\n\
         Allergies: None known",
    ),
    (
        "respiratory-infection",
        "Patient: 32-year-old female\n\
         Chief Complaint: Persistent cough, fever for 5 days\n\
         History: Productive cough with yellow sputum, chills, body aches\n\
         Vitals: BP 118/76, HR 88, Temp 101.4°F, RR 20, O2 Sat 96%\n\
         Physical: Rhonchi bilateral lower lobes, no wheezing\n\
         Labs: WBC 14,500, CRP elevated\n\
         CXR: Patchy infiltrates right lower lobe\n\
         Social: Non-smoker, works in daycare",
    ),
];

pub fn sample_report(key: &str) -> Option<&'static str> {
    SAMPLE_REPORTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, report)| *report)
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationResult {
    pub report: String,
    pub diagnostic: String,
    pub specialist: String,
    pub coordinator: String,
    pub generated_at: DateTime<Local>,
}

impl ConsultationResult {
    /// Plain-text report with every analysis under a ruled heading.
    ///
    /// Markdown bold markers are dropped, runs of blank lines collapse to one
    /// and trailing whitespace is trimmed from each line.
    pub fn full_report(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut text = format!(
            "MULTI-AGENT MEDICAL ANALYSIS REPORT\nGenerated: {}\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        for (heading, body) in [
            ("ORIGINAL MEDICAL REPORT", &self.report),
            ("DIAGNOSTIC AGENT ANALYSIS (Dr. Diagnostic)", &self.diagnostic),
            ("SPECIALIST CONSULTATION (Dr. Specialist)", &self.specialist),
            ("COORDINATOR SYNTHESIS (Dr. Coordinator)", &self.coordinator),
        ] {
            text.push_str(&format!("{rule}\n{heading}\n{rule}\n{body}\n\n"));
        }
        text.push_str(&format!("{rule}\nEND OF REPORT\n{rule}\n"));
        sanitize_report(&text)
    }

    /// Writes [`full_report`](Self::full_report) to
    /// `medical_analysis_{YYYYmmdd_HHMMSS}.txt` under `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!(
            "medical_analysis_{}.txt",
            self.generated_at.format("%Y%m%d_%H%M%S")
        ));
        std::fs::write(&path, self.full_report()).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

fn sanitize_report(text: &str) -> String {
    static BLANK_RUNS: OnceLock<Regex> = OnceLock::new();
    let re = BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"));

    let text = text.replace("**", "");
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let text = lines.join("\n");
    format!("{}\n", re.replace_all(&text, "\n\n").trim())
}

pub struct ReportAnalyzer {
    llm: SharedGateway,
    reporter: StatusReporter,
}

impl ReportAnalyzer {
    pub fn new(llm: SharedGateway) -> Self {
        Self {
            llm,
            reporter: StatusReporter::new(),
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

    /// Runs the diagnostic, specialist and coordinator prompts in turn.
    ///
    /// The first failing call aborts the consultation after an `ERROR` event.
    pub async fn analyze(&mut self, report: &str) -> Result<ConsultationResult> {
        let report = report.trim();
        if report.is_empty() {
            bail!("medical report is empty");
        }

        match self.consult(report).await {
            Ok(result) => {
                self.reporter.emit(
                    StatusEvent::new("COMPLETE", "Multi-agent analysis successfully completed").from_agent(SYSTEM),
                );
                Ok(result)
            }
            Err(e) => {
                self.reporter
                    .emit(StatusEvent::new("ERROR", format!("Error during analysis: {:#}", e)).from_agent(SYSTEM));
                Err(e)
            }
        }
    }

    async fn consult(&mut self, report: &str) -> Result<ConsultationResult> {
        let diagnostic_prompt = format!(
            "Analyze this medical report and provide:\n\n\
             1. **Primary Symptoms & Findings**: List the key symptoms and clinical findings\n\
             2. **Initial Diagnostic Impression**: What conditions are most likely based on the presentation?\n\
             3. **Urgent Red Flags**: Any critical issues requiring immediate attention?\n\
             4. **Vital Signs Assessment**: Analysis of vital signs and their significance\n\n\
             Medical Report:\n{report}\n\n\
             Provide a structured, concise analysis."
        );
        let diagnostic = self
            .ask(&DIAGNOSTIC, "Reviewing medical report and analyzing symptoms", &diagnostic_prompt)
            .await?;

        let specialist_prompt = format!(
            "Based on this medical report and the initial diagnostic findings, provide specialist-level consultation:\n\n\
             **Medical Report:**\n{report}\n\n\
             **Initial Diagnostic Findings:**\n{diagnostic}\n\n\
             Please provide:\n\n\
             1. **Specialized Medical Insights**: Deeper analysis from a specialist perspective\n\
             2. **Recommended Investigations**: Specific tests, imaging, or labs needed\n\
             3. **Differential Diagnoses**: Other conditions to rule out\n\
             4. **Treatment Considerations**: Evidence-based treatment options and approaches\n\
             5. **Risk Factors & Complications**: What to monitor and potential complications\n\n\
             Be specific and actionable."
        );
        let specialist = self
            .ask(
                &SPECIALIST,
                "Providing specialized consultation and recommendations",
                &specialist_prompt,
            )
            .await?;

        let coordinator_prompt = format!(
            "Synthesize the following analyses into a comprehensive, actionable care plan:\n\n\
             **Original Medical Report:**\n{report}\n\n\
             **Diagnostic Analysis (Dr. Diagnostic):**\n{diagnostic}\n\n\
             **Specialist Consultation (Dr. Specialist):**\n{specialist}\n\n\
             Create a unified assessment that includes:\n\n\
             1. **Summary Assessment**: Brief overview of the patient's condition\n\
             2. **Priority Action Items**: Immediate steps needed (with urgency levels)\n\
             3. **Recommended Care Plan**: Short-term and long-term management\n\
             4. **Follow-up Requirements**: When and what type of follow-ups needed\n\
             5. **Patient-Friendly Explanation**: Simple language summary for patient understanding\n\n\
             Ensure all critical points from both agents are included and nothing is missed."
        );
        let coordinator = self
            .ask(&COORDINATOR, "Creating unified care plan from all analyses", &coordinator_prompt)
            .await?;

        Ok(ConsultationResult {
            report: report.to_string(),
            diagnostic,
            specialist,
            coordinator,
            generated_at: Local::now(),
        })
    }

    async fn ask(&mut self, agent: &AgentInfo, activity: &str, prompt: &str) -> Result<String> {
        self.reporter
            .emit(StatusEvent::new("CONSULT", format!("{}...", activity)).from_agent(agent.name));
        tracing::debug!(agent = agent.key, model = self.llm.model(), "consulting");

        let response = self
            .llm
            .complete(prompt, Some(&agent.system_prompt()), None)
            .await
            .with_context(|| format!("{} failed", agent.name))?;

        self.reporter.emit(
            StatusEvent::new("CONSULT_DONE", format!("{} analysis complete", agent.role))
                .from_agent(agent.name)
                .with_detail("chars", response.chars().count()),
        );
        Ok(response)
    }
}
