//! Sequential plan execution with status tracking
//!
//! [`execute_plan`] walks a plan's tasks in ascending id order and hands each
//! one to a [`StepExecutor`]. A failing step marks its task failed and the walk
//! continues; nothing is retried and nothing runs concurrently.

use anyhow::Result;
use llm_pipelines_sdk::{async_trait, Plan, StatusEvent, StatusReporter, Task};

/// Performs the work behind one task id
#[async_trait]
pub trait StepExecutor: Send {
    /// Runs the step for `task` and returns its human-readable result line.
    async fn execute_step(&mut self, task: &Task, reporter: &mut StatusReporter) -> Result<String>;

    /// Label attached to the events this executor produces
    fn agent_name(&self) -> &str {
        "worker"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceSummary {
    pub completed: usize,
    pub failed: usize,
}

pub type TaskCallback<'a> = &'a mut (dyn FnMut(&Task) + Send);

/// Execute every task of `plan` in order
///
/// For each task:
/// - marks it in progress, notifies `on_task_update`, emits `TASK_START`
/// - runs the executor
/// - records `completed` with the step's result, or `failed` with the error text
/// - notifies `on_task_update` again and emits `TASK_COMPLETE` / `TASK_FAILED`
///
/// # Example
/// ```rust,ignore
/// let summary = execute_plan(&mut plan, &mut worker, &mut reporter, None).await;
/// assert_eq!(summary.completed + summary.failed, plan.tasks.len());
/// ```
pub async fn execute_plan<E>(
    plan: &mut Plan,
    executor: &mut E,
    reporter: &mut StatusReporter,
    mut on_task_update: Option<TaskCallback<'_>>,
) -> SequenceSummary
where
    E: StepExecutor + ?Sized,
{
    let agent = executor.agent_name().to_string();
    let mut summary = SequenceSummary::default();

    plan.tasks.sort_by_key(|t| t.id);
    reporter.emit(StatusEvent::new("START", format!("Beginning work on: {}", plan.topic)).from_agent(&agent));

    for task in plan.tasks.iter_mut() {
        task.start();
        if let Some(callback) = on_task_update.as_mut() {
            callback(task);
        }
        reporter.emit(
            StatusEvent::new("TASK_START", format!("Starting: {}", task.name))
                .from_agent(&agent)
                .with_detail("task_id", task.id),
        );

        match executor.execute_step(task, reporter).await {
            Ok(result) => {
                task.complete(result);
                summary.completed += 1;
                reporter.emit(
                    StatusEvent::new("TASK_COMPLETE", format!("Completed: {}", task.name))
                        .from_agent(&agent)
                        .with_detail("task_id", task.id),
                );
            }
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::warn!(task_id = task.id, task = %task.name, error = %message, "task failed");
                task.fail(message.clone());
                summary.failed += 1;
                reporter.emit(
                    StatusEvent::new("TASK_FAILED", format!("Failed: {} - {}", task.name, message))
                        .from_agent(&agent)
                        .with_detail("task_id", task.id),
                );
            }
        }

        if let Some(callback) = on_task_update.as_mut() {
            callback(task);
        }
    }

    reporter.emit(
        StatusEvent::new(
            "COMPLETE",
            format!(
                "Finished {} tasks ({} completed, {} failed)",
                summary.completed + summary.failed,
                summary.completed,
                summary.failed
            ),
        )
        .from_agent(&agent),
    );
    summary
}
