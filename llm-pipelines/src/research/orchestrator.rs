//! Research run orchestration
//!
//! [`ResearchOrchestrator::run`] is the error boundary of a research run:
//! planning, sequential task execution through [`ResearchWorker`], and
//! finalization. Whatever was produced before a failure is still returned.

use super::analyzer::TextAnalyzer;
use super::charts::ChartRenderer;
use super::collector::{ContentCollector, DuckDuckGoSearch, HttpFetcher, PageFetcher, SearchProvider};
use super::planner::PlanBuilder;
use super::render::ReportRenderer;
use super::steps::ResearchWorker;
use super::types::ResearchReport;
use crate::config::Settings;
use crate::llm::SharedGateway;
use crate::workflow_utils::{execute_plan, TaskCallback};
use anyhow::{bail, Context, Result};
use chrono::Local;
use llm_pipelines_sdk::{Plan, RunStatus, StatusEvent, StatusReporter, Task};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::broadcast;
use uuid::Uuid;

const ORCHESTRATOR: &str = "orchestrator";

/// Result of one research run
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub run_id: Uuid,
    /// True when the run reached the end without an orchestration error.
    /// Individual tasks may still have failed; see `plan`.
    pub success: bool,
    pub plan: Option<Plan>,
    pub report: Option<ResearchReport>,
    /// PDF when available, otherwise the Markdown file
    pub artifact_path: Option<PathBuf>,
    pub error: Option<String>,
}

pub struct ResearchOrchestrator {
    llm: SharedGateway,
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
    settings: Settings,
    reporter: StatusReporter,
    task_observer: Option<Box<dyn FnMut(&Task) + Send>>,
    plan: Option<Plan>,
    report: Option<ResearchReport>,
    state_file: Option<PathBuf>,
    status: RunStatus,
}

impl ResearchOrchestrator {
    /// Creates an orchestrator with every external collaborator supplied.
    pub fn new(
        llm: SharedGateway,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
        settings: Settings,
    ) -> Self {
        Self {
            llm,
            search,
            fetcher,
            settings,
            reporter: StatusReporter::new(),
            task_observer: None,
            plan: None,
            report: None,
            state_file: None,
            status: RunStatus::NotStarted,
        }
    }

    /// Uses DuckDuckGo search and plain HTTP fetching.
    pub fn from_settings(llm: SharedGateway, settings: Settings) -> Self {
        let search = Arc::new(DuckDuckGoSearch::new(&settings));
        let fetcher = Arc::new(HttpFetcher::new(&settings));
        Self::new(llm, search, fetcher, settings)
    }

    /// Receives every status event as it is emitted.
    pub fn set_observer(&mut self, observer: impl FnMut(&StatusEvent) + Send + 'static) {
        self.reporter.set_observer(observer);
    }

    /// Receives each task when it starts and when it finishes.
    pub fn set_task_observer(&mut self, observer: impl FnMut(&Task) + Send + 'static) {
        self.task_observer = Some(Box::new(observer));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.reporter.subscribe()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn report(&self) -> Option<&ResearchReport> {
        self.report.as_ref()
    }

    pub fn logs(&self) -> &[StatusEvent] {
        self.reporter.events()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Path of the YAML plan state written during the last run
    pub fn state_file(&self) -> Option<&PathBuf> {
        self.state_file.as_ref()
    }

    pub fn clear(&mut self) {
        self.reporter.clear();
        self.plan = None;
        self.report = None;
        self.state_file = None;
        self.status = RunStatus::NotStarted;
    }

    /// Plans, executes and finalizes research on `topic`.
    ///
    /// Never returns an error: failures are reported through `success`,
    /// `error` and a final `ERROR` event.
    pub async fn run(&mut self, topic: &str) -> ResearchOutcome {
        let run_id = Uuid::new_v4();
        self.plan = None;
        self.report = None;
        self.state_file = None;
        self.status = RunStatus::Running;
        tracing::info!(%run_id, topic, "research run started");

        let result = self.execute(topic.trim()).await;

        let (success, artifact_path, error) = match result {
            Ok(artifact) => {
                self.status = RunStatus::Completed;
                (true, artifact, None)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::error!(%run_id, error = %message, "research run failed");
                self.reporter.emit(
                    StatusEvent::new("ERROR", format!("Research failed: {}", message)).from_agent(ORCHESTRATOR),
                );
                self.status = RunStatus::Failed;
                (false, None, Some(message))
            }
        };

        ResearchOutcome {
            run_id,
            success,
            plan: self.plan.clone(),
            report: self.report.clone(),
            artifact_path,
            error,
        }
    }

    async fn execute(&mut self, topic: &str) -> Result<Option<PathBuf>> {
        if topic.is_empty() {
            bail!("research topic is empty");
        }

        self.reporter
            .emit(StatusEvent::new("PLANNING", format!("Creating research plan for: {}", topic)).from_agent(ORCHESTRATOR));
        let mut plan = PlanBuilder::new(self.llm.clone())
            .build(topic, &mut self.reporter)
            .await
            .context("planning failed")?;
        self.reporter.emit(
            StatusEvent::new("PLAN_READY", format!("Plan ready with {} tasks", plan.tasks.len()))
                .from_agent(ORCHESTRATOR)
                .with_detail("tasks", plan.tasks.len()),
        );
        self.plan = Some(plan.clone());
        self.save_plan_state(&plan).await;

        self.reporter
            .emit(StatusEvent::new("EXECUTING", "Executing research tasks").from_agent(ORCHESTRATOR));
        let mut worker = ResearchWorker::new(
            topic,
            self.llm.clone(),
            ContentCollector::new(self.search.clone(), self.fetcher.clone()),
            TextAnalyzer::new(Some(ChartRenderer::new(&self.settings.charts_dir))),
            ReportRenderer::new(&self.settings.output_dir),
            &self.settings,
        );

        let summary = match self.task_observer.as_mut() {
            Some(observer) => {
                let callback: TaskCallback<'_> = &mut **observer;
                execute_plan(&mut plan, &mut worker, &mut self.reporter, Some(callback)).await
            }
            None => execute_plan(&mut plan, &mut worker, &mut self.reporter, None).await,
        };
        self.reporter.emit(
            StatusEvent::new(
                "EXECUTION_COMPLETE",
                format!("Completed {} tasks, {} failed", summary.completed, summary.failed),
            )
            .from_agent(ORCHESTRATOR)
            .with_detail("completed", summary.completed)
            .with_detail("failed", summary.failed),
        );
        self.save_plan_state(&plan).await;
        self.plan = Some(plan);

        let report = worker.into_report();
        let artifact = report
            .artifacts
            .pdf
            .clone()
            .or_else(|| report.artifacts.markdown.clone());
        if let Some(path) = &artifact {
            self.reporter.emit(
                StatusEvent::new("REPORT_SAVED", format!("Report saved: {}", path.display()))
                    .from_agent(ORCHESTRATOR),
            );
        }
        self.report = Some(report);
        Ok(artifact)
    }

    /// Writes the plan as YAML next to the reports. Failures only warn.
    async fn save_plan_state(&mut self, plan: &Plan) {
        let path = match &self.state_file {
            Some(path) => path.clone(),
            None => self.settings.output_dir.join(format!(
                "research_plan_{}.yaml",
                Local::now().format("%Y%m%d_%H%M%S")
            )),
        };

        let write = async {
            let yaml = serde_yaml::to_string(plan).context("serializing plan")?;
            fs::create_dir_all(&self.settings.output_dir)
                .await
                .with_context(|| format!("creating {}", self.settings.output_dir.display()))?;
            fs::write(&path, yaml)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            anyhow::Ok(())
        };

        match write.await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "plan state saved");
                self.state_file = Some(path);
            }
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "could not save plan state"),
        }
    }
}
