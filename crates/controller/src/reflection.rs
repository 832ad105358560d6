//! Plan / execute / reflect loop.
//!
//! ```text
//! Planning -> Executing -> Checking -> Finished
//!    ^                        |
//!    +------------------------+
//! ```
//!
//! A run finishes when memory holds a solved answer, when the reflection
//! policy accepts an iteration, or when `max_reflect_time` iterations have
//! been used. The generator is invoked on every exit path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use reasoner_core::{
    config::{ControllerConfig, VerificationStrictness},
    render_value,
    traits::{EvidenceExtractor, Generator, Planner, Reflection, Reflector, StateVerifier},
    Capability, Context, Error, Memory, Result, RetryPolicy, Task,
};

use crate::executor::{PlanReport, TaskDispatcher};
use crate::memory::MemoryManager;

/// Controller states, recorded in order for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReflectionState {
    Planning,
    Executing,
    Checking,
    Finished,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Memory holds an exact answer.
    Solved,
    /// The reflection policy accepted the last iteration.
    Accepted,
    /// `max_reflect_time` iterations were used.
    BudgetExhausted,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solved => "solved",
            Self::Accepted => "accepted",
            Self::BudgetExhausted => "budget_exhausted",
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub answer: String,
    pub iterations: u32,
    pub finish_reason: FinishReason,
    pub states: Vec<ReflectionState>,
    pub context: Context,
    pub memory: Memory,
}

/// Drives one query through repeated plan/execute/reflect iterations.
#[derive(Clone)]
pub struct ReflectionController {
    pub(crate) planner: Arc<dyn Planner>,
    pub(crate) dispatcher: TaskDispatcher,
    pub(crate) reflector: Arc<dyn Reflector>,
    pub(crate) generator: Arc<dyn Generator>,
    pub(crate) verifier: Arc<dyn StateVerifier>,
    pub(crate) extractor: Arc<dyn EvidenceExtractor>,
    pub(crate) config: ControllerConfig,
    pub(crate) retry: RetryPolicy,
}

struct Iteration {
    failed: bool,
}

impl ReflectionController {
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run a query with the controller's own configuration.
    pub async fn run(&self, query: &str) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4().to_string();
        self.run_with(&run_id, query, &self.config).await
    }

    /// Run a query under an explicit run id and configuration.
    pub async fn run_with(
        &self,
        run_id: &str,
        query: &str,
        config: &ControllerConfig,
    ) -> Result<RunOutcome> {
        if config.max_reflect_time == 0 {
            return Err(Error::controller("max_reflect_time must be at least 1"));
        }
        let span = tracing::info_span!("reflection_run", run_id = %run_id);
        self.run_inner(query, config).instrument(span).await
    }

    async fn run_inner(&self, query: &str, config: &ControllerConfig) -> Result<RunOutcome> {
        let mut context = Context::new();
        let mut memory = MemoryManager::new(self.verifier.clone(), self.extractor.clone())
            .with_retry(self.retry);
        let mut states = vec![ReflectionState::Planning];
        let mut instruction = query.to_string();
        let mut iterations = 0u32;

        tracing::info!(query = %query, strictness = ?config.strictness, "Run started");

        let finish_reason = loop {
            // Planning
            iterations += 1;
            let plan = self.plan(&instruction, &context, iterations).await;

            // Executing
            let iteration = match plan {
                Ok(tasks) => {
                    states.push(ReflectionState::Executing);
                    self.execute(query, &instruction, tasks, &mut context, &mut memory, config)
                        .await
                }
                Err(e) => {
                    tracing::warn!(iteration = iterations, error = %e, "Planning failed");
                    Iteration { failed: true }
                }
            };

            // Checking
            states.push(ReflectionState::Checking);
            if memory.get_solved_answer().is_some() {
                break FinishReason::Solved;
            }

            let reflection = self.reflect(&instruction, memory.memory(), &iteration, config).await;
            let accepted = !iteration.failed
                && match config.strictness {
                    VerificationStrictness::Completion => true,
                    VerificationStrictness::Reflective => reflection.finished,
                    VerificationStrictness::ExactAnswer => false,
                };
            tracing::info!(
                iteration = iterations,
                failed = iteration.failed,
                accepted = accepted,
                "Iteration checked"
            );

            if accepted {
                break FinishReason::Accepted;
            }
            if iterations >= config.max_reflect_time {
                break FinishReason::BudgetExhausted;
            }
            if !reflection.next_instruction.is_empty() {
                instruction = reflection.next_instruction;
            }
            states.push(ReflectionState::Planning);
        };
        states.push(ReflectionState::Finished);

        let memory = memory.into_memory();
        let answer = self.generator.generate(query, &memory).await;

        tracing::info!(
            iterations = iterations,
            finish_reason = finish_reason.as_str(),
            "Run finished"
        );
        reasoner_telemetry::track_run(finish_reason.as_str(), iterations);

        Ok(RunOutcome {
            answer,
            iterations,
            finish_reason,
            states,
            context,
            memory,
        })
    }

    async fn plan(&self, instruction: &str, context: &Context, iteration: u32) -> Result<Vec<Task>> {
        tracing::info!(iteration = iteration, instruction = %instruction, "Planning");
        // Planners own their backend retries.
        self.planner.invoke(instruction, context).await
    }

    async fn execute(
        &self,
        query: &str,
        instruction: &str,
        tasks: Vec<Task>,
        context: &mut Context,
        memory: &mut MemoryManager,
        config: &ControllerConfig,
    ) -> Iteration {
        let report = match self
            .dispatcher
            .dispatch_plan(query, tasks, context, config.max_concurrency)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Plan could not be dispatched");
                return Iteration { failed: true };
            }
        };

        let candidate = candidate_answer(&report);
        let evidence = supporting_evidence(&report);
        memory
            .save_memory(candidate.as_deref(), &evidence, instruction)
            .await;

        Iteration {
            failed: report.failed,
        }
    }

    async fn reflect(
        &self,
        instruction: &str,
        memory: &Memory,
        iteration: &Iteration,
        config: &ControllerConfig,
    ) -> Reflection {
        let keep = Reflection {
            finished: false,
            next_instruction: instruction.to_string(),
        };

        // A clean iteration under the completion policy needs no second opinion.
        if config.strictness == VerificationStrictness::Completion && !iteration.failed {
            return Reflection {
                finished: true,
                ..keep
            };
        }

        match self.reflector.reflect(instruction, memory).await {
            Ok(reflection) => Reflection {
                finished: reflection.finished && !iteration.failed,
                next_instruction: reflection.next_instruction,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Reflection failed, keeping instruction");
                keep
            }
        }
    }
}

/// Rendered result of the last succeeded `Output` task.
fn candidate_answer(report: &PlanReport) -> Option<String> {
    report
        .succeeded()
        .filter(|t| is_output(t))
        .last()
        .and_then(|t| t.result())
        .map(render_value)
        .filter(|s| !s.trim().is_empty())
}

/// Rendered results of succeeded non-`Output` tasks.
fn supporting_evidence(report: &PlanReport) -> Vec<String> {
    report
        .succeeded()
        .filter(|t| !is_output(t))
        .filter_map(|t| t.result())
        .map(render_evidence)
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_output(task: &Task) -> bool {
    task.capability.parse::<Capability>().ok() == Some(Capability::Output)
}

fn render_evidence(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join("\n"),
        other => render_value(other),
    }
}
