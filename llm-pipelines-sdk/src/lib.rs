use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::broadcast;

// Re-export async trait for convenience
pub use async_trait::async_trait;

/// Lifecycle of a single task inside a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a whole pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Name and description of a task before it gets an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A unit of work inside a [`Plan`]
///
/// Status only moves forward: `pending -> in_progress -> completed | failed`.
/// Once a task is terminal every transition method is a no-op and returns `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
}

impl Task {
    pub fn new(id: u32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            result: None,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) -> bool {
        if self.status != TaskStatus::Pending {
            return false;
        }
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Local::now());
        true
    }

    pub fn complete(&mut self, result: impl Into<String>) -> bool {
        self.finish(TaskStatus::Completed, result.into())
    }

    /// Marks the task failed. An empty message is replaced so a failed task
    /// always carries a readable result.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("{} failed", self.name);
        }
        self.finish(TaskStatus::Failed, message)
    }

    fn finish(&mut self, status: TaskStatus, result: String) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if self.started_at.is_none() {
            self.started_at = Some(Local::now());
        }
        self.status = status;
        self.result = Some(result);
        self.completed_at = Some(Local::now());
        true
    }
}

/// Ordered list of tasks produced for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub topic: String,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Local>,
}

impl Plan {
    /// Builds a plan, assigning ids `1..=n` in the order the specs are given.
    pub fn from_specs(topic: impl Into<String>, specs: impl IntoIterator<Item = TaskSpec>) -> Self {
        let tasks = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Task::new(i as u32 + 1, spec.name, spec.description))
            .collect();
        Self {
            topic: topic.into(),
            tasks,
            created_at: Local::now(),
        }
    }

    pub fn task(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_terminal())
    }
}

/// Timestamped progress notice shown to whoever is watching a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub timestamp: DateTime<Local>,
    pub phase: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

impl StatusEvent {
    pub fn new(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            phase: phase.into(),
            message: message.into(),
            agent: None,
            details: None,
        }
    }

    pub fn from_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.to_string());
        self
    }

    /// `[HH:MM:SS] agent PHASE: message`
    pub fn to_line(&self) -> String {
        match &self.agent {
            Some(agent) => format!(
                "[{}] {} {}: {}",
                self.timestamp.format("%H:%M:%S"),
                agent,
                self.phase,
                self.message
            ),
            None => format!(
                "[{}] {}: {}",
                self.timestamp.format("%H:%M:%S"),
                self.phase,
                self.message
            ),
        }
    }
}

pub type StatusObserver = Box<dyn FnMut(&StatusEvent) + Send>;

const BROADCAST_CAPACITY: usize = 256;

/// Append-only event log for a run
///
/// Each emitted event is stored, handed to the observer callback (if any),
/// published to broadcast subscribers and traced. Subscribers that lag or
/// have gone away never block emission.
pub struct StatusReporter {
    events: Vec<StatusEvent>,
    observer: Option<StatusObserver>,
    sender: broadcast::Sender<StatusEvent>,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StatusReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusReporter")
            .field("events", &self.events.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl StatusReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            events: Vec::new(),
            observer: None,
            sender,
        }
    }

    pub fn with_observer(observer: impl FnMut(&StatusEvent) + Send + 'static) -> Self {
        let mut reporter = Self::new();
        reporter.set_observer(observer);
        reporter
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&StatusEvent) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&mut self, event: StatusEvent) {
        tracing::info!(
            phase = %event.phase,
            agent = event.agent.as_deref().unwrap_or("-"),
            "{}",
            event.message
        );
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
        // No receivers is fine
        let _ = self.sender.send(event.clone());
        self.events.push(event);
    }

    pub fn emit_phase(&mut self, phase: &str, message: impl Into<String>) {
        self.emit(StatusEvent::new(phase, message));
    }

    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    pub fn last(&self) -> Option<&StatusEvent> {
        self.events.last()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Colored human-readable output for the command line, complementing the
// StatusEvent stream that observers consume.
// ============================================================================

/// Prints a stage header and a one-line description.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::log_stage;
/// log_stage!(1, "Planning", "Building a six task research plan");
/// ```
///
/// Outputs:
/// ```text
/// ═══ STAGE 1: Planning ═══
/// Building a six task research plan
/// ```
#[macro_export]
macro_rules! log_stage {
    ($stage:expr, $title:expr, $description:expr) => {
        println!("\x1b[1;36m═══ STAGE {}: {} ═══\x1b[0m", $stage, $title);
        println!("\x1b[36m{}\x1b[0m", $description);
    };
}

/// Prints a stage completion line.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::log_stage_done;
/// log_stage_done!(1);
/// ```
#[macro_export]
macro_rules! log_stage_done {
    ($stage:expr) => {
        println!("\x1b[32m✓ Stage {} complete\x1b[0m", $stage);
    };
}

/// Prints a task line with a status glyph.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::{log_task_line, Task};
/// let task = Task::new(1, "Source Identification", "Find sources");
/// log_task_line!(&task);
/// ```
#[macro_export]
macro_rules! log_task_line {
    ($task:expr) => {{
        let task: &$crate::Task = $task;
        let (color, glyph) = match task.status {
            $crate::TaskStatus::Pending => ("\x1b[2m", "○"),
            $crate::TaskStatus::InProgress => ("\x1b[36m", "→"),
            $crate::TaskStatus::Completed => ("\x1b[32m", "✓"),
            $crate::TaskStatus::Failed => ("\x1b[31m", "✗"),
        };
        println!("{}{} Task {}: {}\x1b[0m", color, glyph, task.id, task.name);
        if let Some(result) = &task.result {
            println!("\x1b[2m    {}\x1b[0m", result.replace('\n', "\n    "));
        }
    }};
}

/// Prints a status event as a dim timestamped line.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::{log_event, StatusEvent};
/// log_event!(&StatusEvent::new("PLANNING", "Creating plan"));
/// ```
#[macro_export]
macro_rules! log_event {
    ($event:expr) => {
        println!("\x1b[2m{}\x1b[0m", $crate::StatusEvent::to_line($event));
    };
}

/// # Example
/// ```
/// use llm_pipelines_sdk::log_found;
/// log_found!(3, "patients");
/// ```
#[macro_export]
macro_rules! log_found {
    ($count:expr, $item_type:expr) => {
        println!("\x1b[36mFound {} {}\x1b[0m", $count, $item_type);
    };
}

/// Logs an informational message.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::log_info;
/// log_info!("Using offline gateway");
/// let topic = "quantum computing";
/// log_info!("Researching {}", topic);
/// ```
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::log_warning;
/// log_warning!("GROQ_API_KEY is not set");
/// ```
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ Warning: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs an error message to stderr.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::log_error;
/// log_error!("Run failed: {}", "timeout");
/// ```
#[macro_export]
macro_rules! log_error {
    ($message:expr) => {
        eprintln!("\x1b[31m✗ Error: {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        eprintln!("\x1b[31m✗ Error: {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs that a file has been written.
///
/// # Example
/// ```
/// use llm_pipelines_sdk::log_file_saved;
/// log_file_saved!("outputs/report_20240101_120000.md");
/// ```
#[macro_export]
macro_rules! log_file_saved {
    ($path:expr) => {
        println!("\x1b[32m✓ Saved: {}\x1b[0m", $path);
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_plan_assigns_sequential_ids() {
        let plan = Plan::from_specs(
            "topic",
            vec![TaskSpec::new("a", ""), TaskSpec::new("b", ""), TaskSpec::new("c", "")],
        );
        let ids: Vec<u32> = plan.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(plan.tasks.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[test]
    fn test_task_transitions_forward_only() {
        let mut task = Task::new(1, "Collect", "");
        assert!(task.start());
        assert!(!task.start());
        assert!(task.complete("done"));
        assert!(!task.fail("late"));
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.result.as_deref(), Some("done"));
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_failed_task_has_non_empty_result() {
        let mut task = Task::new(3, "Data Analysis", "");
        task.start();
        task.fail("");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.result.as_deref(), Some("Data Analysis failed"));
    }

    #[test]
    fn test_task_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_reporter_appends_and_notifies_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut reporter = StatusReporter::with_observer(move |e| {
            sink.lock().unwrap().push(e.phase.clone());
        });

        reporter.emit_phase("PLANNING", "start");
        reporter.emit(StatusEvent::new("PLAN_READY", "6 tasks").with_detail("tasks", 6));

        assert_eq!(reporter.events().len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["PLANNING", "PLAN_READY"]);
        let details = reporter.last().unwrap().details.as_ref().unwrap();
        assert_eq!(details.get("tasks").map(String::as_str), Some("6"));

        reporter.clear();
        assert!(reporter.events().is_empty());
    }

    #[tokio::test]
    async fn test_reporter_broadcasts_to_subscribers() {
        let mut reporter = StatusReporter::new();
        let mut rx = reporter.subscribe();
        reporter.emit(StatusEvent::new("EXECUTING", "go").from_agent("worker"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.phase, "EXECUTING");
        assert_eq!(event.agent.as_deref(), Some("worker"));
        assert!(event.to_line().contains("worker EXECUTING: go"));
    }
}
