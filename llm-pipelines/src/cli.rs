//! Command line surface for the three pipelines

use crate::clinic::{CalendarManager, ClinicOrchestrator, NotificationService, RecordStore};
use crate::config::Settings;
use crate::llm::{DummyGateway, GroqClient, SharedGateway};
use crate::medical::{self, ReportAnalyzer};
use crate::research::ResearchOrchestrator;
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use llm_pipelines_sdk::{
    log_error, log_event, log_file_saved, log_found, log_info, log_stage, log_stage_done, log_task_line,
    log_warning, TaskStatus,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug, Clone)]
#[command(name = "llm-pipelines", version, about = "Research assistant, clinic admin automator and medical report analyzer")]
pub struct Cli {
    /// Use the offline gateway instead of the Groq API
    #[arg(long, global = true)]
    pub offline: bool,

    /// Debug level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Put outputs, data and prescriptions below this directory
    #[arg(long, global = true)]
    pub output_root: Option<PathBuf>,

    /// Override the model id
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Plan and run web research on a topic
    Research(ResearchArgs),
    /// Process a doctor's note into records, prescription, appointment and notifications
    Clinic(ClinicArgs),
    /// Run a medical report past three consulting physicians
    AnalyzeReport(AnalyzeArgs),
    /// List stored patient records
    Patients(PatientsArgs),
    /// List upcoming appointments
    Appointments(AppointmentsArgs),
    /// Show notification history
    Notifications(NotificationsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResearchArgs {
    /// Research topic
    pub topic: String,

    /// Number of sources to collect
    #[arg(long)]
    pub max_sources: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ClinicArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value_t = 30)]
    pub age: u32,

    /// Note text
    #[arg(long, conflicts_with = "note_file")]
    pub note: Option<String>,

    /// Read the note from a file
    #[arg(long)]
    pub note_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Report text
    #[arg(conflicts_with_all = ["file", "sample"])]
    pub text: Option<String>,

    /// Read the report from a file
    #[arg(long, conflicts_with = "sample")]
    pub file: Option<PathBuf>,

    /// Built-in case: chest-pain, diabetic-followup or respiratory-infection
    #[arg(long)]
    pub sample: Option<String>,

    /// Skip writing the text report
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PatientsArgs {
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Filter by (partial) patient name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AppointmentsArgs {
    /// Days ahead to include
    #[arg(long, default_value_t = 30)]
    pub days: i64,
}

#[derive(Args, Debug, Clone)]
pub struct NotificationsArgs {
    #[arg(long)]
    pub patient: Option<String>,
}

impl Cli {
    /// Applies command line overrides on top of environment settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(root) = &self.output_root {
            settings = settings.rooted_at(root);
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Command::Research(ResearchArgs {
            max_sources: Some(n), ..
        }) = &self.command
        {
            settings.max_sources = *n;
        }
        if self.verbose {
            settings.log_level = "debug".to_string();
        }
        settings
    }
}

fn gateway(settings: &Settings, offline: bool, model: Option<&str>) -> Result<SharedGateway> {
    if offline {
        log_warning!("Offline mode: responses are placeholders");
        return Ok(Arc::new(DummyGateway));
    }
    let client = GroqClient::new(settings).context("configuring LLM client")?;
    Ok(match model {
        Some(model) => Arc::new(client.with_model(model)),
        None => Arc::new(client),
    })
}

/// Dispatches one subcommand.
pub async fn run(cli: Cli, settings: Settings) -> Result<()> {
    match &cli.command {
        Command::Research(args) => run_research(&cli, args, settings).await,
        Command::Clinic(args) => run_clinic(&cli, args, &settings).await,
        Command::AnalyzeReport(args) => run_analyze(&cli, args, &settings).await,
        Command::Patients(args) => list_patients(args, &settings),
        Command::Appointments(args) => list_appointments(args, &settings),
        Command::Notifications(args) => list_notifications(args, &settings),
    }
}

async fn run_research(cli: &Cli, args: &ResearchArgs, settings: Settings) -> Result<()> {
    let llm = gateway(&settings, cli.offline, None)?;
    let mut orchestrator = ResearchOrchestrator::from_settings(llm, settings);
    orchestrator.set_observer(|event| {
        log_event!(event);
    });
    orchestrator.set_task_observer(|task| {
        if task.status.is_terminal() {
            log_task_line!(task);
        }
    });

    log_stage!(1, "Research", format!("Topic: {}", args.topic));
    let outcome = orchestrator.run(&args.topic).await;

    if let Some(plan) = &outcome.plan {
        log_info!(
            "{} of {} tasks completed",
            plan.count_with_status(TaskStatus::Completed),
            plan.tasks.len()
        );
    }
    if let Some(report) = &outcome.report {
        for path in [&report.artifacts.markdown, &report.artifacts.html, &report.artifacts.pdf]
            .into_iter()
            .flatten()
        {
            log_file_saved!(path.display());
        }
        for chart in report.analysis.iter().flat_map(|a| a.chart_paths.iter()) {
            log_file_saved!(chart.display());
        }
    }
    if let Some(path) = orchestrator.state_file() {
        log_file_saved!(path.display());
    }

    if !outcome.success {
        bail!(outcome.error.unwrap_or_else(|| "research failed".to_string()));
    }
    log_stage_done!(1);
    Ok(())
}

async fn run_clinic(cli: &Cli, args: &ClinicArgs, settings: &Settings) -> Result<()> {
    let note = match (&args.note, &args.note_file) {
        (Some(note), _) => note.clone(),
        (None, Some(path)) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, None) => bail!("provide --note or --note-file"),
    };

    let llm = gateway(settings, cli.offline, None)?;
    let mut orchestrator = ClinicOrchestrator::from_settings(llm, settings)?;
    orchestrator.set_observer(|event| {
        log_event!(event);
    });

    log_stage!(1, "Clinic", format!("Processing note for {}", args.name));
    let outcome = orchestrator.run(&note, &args.name, args.age).await;

    if let Some(record) = &outcome.record {
        log_info!("Diagnosis: {}", record.diagnosis);
        log_found!(record.prescription.len(), "prescribed medications");
    }
    for task in &outcome.tasks {
        log_task_line!(task);
    }
    if let Some(path) = &outcome.admin.prescription_path {
        log_file_saved!(path.display());
    }
    if let Some(summary) = &outcome.admin.summary {
        println!("\n{}\n", summary);
    }

    if !outcome.success {
        bail!(outcome.error.unwrap_or_else(|| "clinic run failed".to_string()));
    }
    log_stage_done!(1);
    Ok(())
}

async fn run_analyze(cli: &Cli, args: &AnalyzeArgs, settings: &Settings) -> Result<()> {
    let report = if let Some(text) = &args.text {
        text.clone()
    } else if let Some(path) = &args.file {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    } else if let Some(key) = &args.sample {
        medical::sample_report(key)
            .with_context(|| format!("unknown sample '{}'", key))?
            .to_string()
    } else {
        bail!("provide report text, --file or --sample");
    };

    // The consultation uses the smaller model unless one was given explicitly
    let model = cli.model.as_deref().unwrap_or(medical::DEFAULT_MODEL);
    let llm = gateway(settings, cli.offline, Some(model))?;
    let mut analyzer = ReportAnalyzer::new(llm);
    analyzer.set_observer(|event| {
        log_event!(event);
    });

    log_stage!(1, "Consultation", "Diagnostic, specialist and coordinator review");
    let result = match analyzer.analyze(&report).await {
        Ok(result) => result,
        Err(e) => {
            log_error!("{:#}", e);
            return Err(e);
        }
    };

    for (agent, text) in medical::agent_info()
        .iter()
        .zip([&result.diagnostic, &result.specialist, &result.coordinator])
    {
        println!("\n=== {} ({}) ===\n{}", agent.name, agent.role, text);
    }

    if !args.no_save {
        let path = result.save(&settings.output_dir)?;
        log_file_saved!(path.display());
    }
    log_stage_done!(1);
    Ok(())
}

fn open_store(settings: &Settings) -> Result<RecordStore> {
    let path = settings.database_path();
    let store = RecordStore::new(&path).with_context(|| format!("opening {}", path.display()))?;
    store.initialize_schema()?;
    Ok(store)
}

fn list_patients(args: &PatientsArgs, settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let rows = match &args.name {
        Some(name) => store.get_patient_by_name(name)?,
        None => store.get_all_patients(args.limit)?,
    };
    log_found!(rows.len(), "patient records");
    log_info!("{} distinct patients on file", store.get_patient_count()?);
    for row in rows {
        println!(
            "#{} {} ({}) {} | {} | follow-up {} | {}",
            row.id,
            row.name,
            row.age,
            row.date,
            row.diagnosis,
            row.followup,
            row.prescription
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    Ok(())
}

fn list_appointments(args: &AppointmentsArgs, settings: &Settings) -> Result<()> {
    let calendar = CalendarManager::load(settings.appointments_path())?;
    let upcoming = calendar.get_upcoming(Local::now().date_naive(), args.days);
    log_found!(upcoming.len(), format!("appointments in the next {} days", args.days));
    for appointment in upcoming {
        println!(
            "[{}] {} {} {} ({})",
            appointment.id, appointment.date, appointment.time, appointment.patient_name, appointment.appointment_type
        );
    }
    Ok(())
}

fn list_notifications(args: &NotificationsArgs, settings: &Settings) -> Result<()> {
    let service = NotificationService::load(settings.notifications_path())?;
    let notifications: Vec<_> = match &args.patient {
        Some(name) => service.get_notifications_for_patient(name),
        None => service.history().iter().collect(),
    };
    log_found!(notifications.len(), "notifications");
    for notification in notifications {
        println!(
            "[{}] {} {:?} to {}\n{}\n",
            notification.id,
            notification.timestamp.format("%Y-%m-%d %H:%M"),
            notification.notification_type,
            notification.patient_name,
            notification.message
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clinic_command() {
        let cli = Cli::try_parse_from([
            "llm-pipelines",
            "--offline",
            "clinic",
            "--name",
            "Ann Lee",
            "--age",
            "41",
            "--note",
            "Flu",
        ])
        .unwrap();
        assert!(cli.offline);
        match cli.command {
            Command::Clinic(args) => {
                assert_eq!(args.name, "Ann Lee");
                assert_eq!(args.age, 41);
                assert_eq!(args.note.as_deref(), Some("Flu"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_applied_to_settings() {
        let cli = Cli::try_parse_from([
            "llm-pipelines",
            "research",
            "quantum computing",
            "--max-sources",
            "2",
            "--output-root",
            "/tmp/run",
        ])
        .unwrap();
        let settings = cli.apply(Settings::default());
        assert_eq!(settings.max_sources, 2);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/run/outputs"));
    }

    #[test]
    fn test_note_and_note_file_conflict() {
        let err = Cli::try_parse_from([
            "llm-pipelines",
            "clinic",
            "--name",
            "A",
            "--note",
            "x",
            "--note-file",
            "n.txt",
        ]);
        assert!(err.is_err());
    }
}
