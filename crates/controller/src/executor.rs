//! Task dispatcher.
//!
//! Routes each task to the executor registered for its capability and runs
//! a plan wave by wave.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use reasoner_core::{Capability, Context, Error, Result, Task, TaskStatus};
use reasoner_skills::ExecutorRegistry;

use crate::dag::plan_waves;

/// Outcome of running one plan.
#[derive(Debug, Clone)]
pub struct PlanReport {
    /// Every task of the plan in plan order, in its final state.
    pub tasks: Vec<Task>,
    /// True when any task failed. Later waves were skipped.
    pub failed: bool,
}

impl PlanReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Succeeded)
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.status() == TaskStatus::Failed)
    }
}

/// Dispatches tasks to registered executors. Never retries.
#[derive(Clone)]
pub struct TaskDispatcher {
    registry: Arc<ExecutorRegistry>,
}

impl TaskDispatcher {
    /// Create a new dispatcher.
    pub fn new(registry: Arc<ExecutorRegistry>) -> Self {
        Self { registry }
    }

    /// Run a single pending task.
    ///
    /// Executor failures are recorded on the task, not returned. An error is
    /// returned only when the task was not `Pending`.
    pub async fn dispatch(&self, query: &str, task: &mut Task, context: &Context) -> Result<()> {
        let executor = task
            .capability
            .parse::<Capability>()
            .ok()
            .and_then(|cap| self.registry.get(cap));

        task.start()?;

        let Some(executor) = executor else {
            let err = Error::UnknownCapability(task.capability.clone());
            tracing::warn!(task_id = %task.id, capability = %task.capability, "No executor for capability");
            task.fail(err.to_string())?;
            record(task);
            return Ok(());
        };

        tracing::info!(task_id = %task.id, capability = %task.capability, "Executing task");

        match executor.invoke(query, task, context).await {
            Ok(()) if task.status() == TaskStatus::Succeeded => {}
            Ok(()) => {
                task.fail(format!(
                    "Executor '{}' returned without a result",
                    task.capability
                ))?;
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "Task failed");
                if task.status() == TaskStatus::Running {
                    task.fail(e.to_string())?;
                }
            }
        }

        record(task);
        Ok(())
    }

    /// Run a plan in dependency waves.
    ///
    /// At most `max_concurrency` tasks of a wave are in flight at once.
    /// Results are bound into `context` after each wave. After a wave with a
    /// failed task the remaining tasks stay `Pending`. All tasks are appended
    /// to the context history in plan order.
    pub async fn dispatch_plan(
        &self,
        query: &str,
        plan: Vec<Task>,
        context: &mut Context,
        max_concurrency: usize,
    ) -> Result<PlanReport> {
        let waves = plan_waves(&plan)?;
        let mut slots: Vec<Option<Task>> = plan.into_iter().map(Some).collect();
        let mut failed = false;

        for (n, wave) in waves.into_iter().enumerate() {
            tracing::debug!(wave = n, tasks = wave.len(), "Dispatching wave");

            let ctx: &Context = context;
            let batch: Vec<(usize, Task)> = wave
                .into_iter()
                .filter_map(|i| slots[i].take().map(|task| (i, task)))
                .collect();

            let done: Vec<(usize, Task, Result<()>)> = stream::iter(batch)
                .map(|(i, mut task)| async move {
                    let outcome = self.dispatch(query, &mut task, ctx).await;
                    (i, task, outcome)
                })
                .buffer_unordered(max_concurrency.max(1))
                .collect()
                .await;

            for (i, task, outcome) in done {
                if let Err(e) = outcome {
                    tracing::warn!(task_id = %task.id, error = %e, "Task could not be dispatched");
                    failed = true;
                }
                if task.status() != TaskStatus::Succeeded {
                    failed = true;
                }
                context.bind_task(&task);
                slots[i] = Some(task);
            }

            if failed {
                break;
            }
        }

        let tasks: Vec<Task> = slots.into_iter().flatten().collect();
        for task in &tasks {
            context.record(task.clone());
        }

        Ok(PlanReport { tasks, failed })
    }
}

fn record(task: &Task) {
    reasoner_telemetry::track_task(&task.capability, &task.status().to_string());
}
