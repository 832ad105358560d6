//! Asynchronous run submission.
//!
//! `submit` returns a task id immediately. The run itself happens on a
//! background task bounded by the [`WorkerPool`], and its state is kept in
//! the [`ResultCache`] until the TTL after completion elapses.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use reasoner_controller::ReflectionController;
use reasoner_core::{
    config::{ControllerConfig, ServiceConfig},
    Error, Result, RunResult,
};

use crate::cache::ResultCache;
use crate::scheduler::WorkerPool;

/// Something that can answer one query end to end.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Run `query` and return the JSON stored as the run's result.
    async fn run_query(
        &self,
        run_id: &str,
        query: &str,
        config: Option<&ControllerConfig>,
    ) -> Result<Value>;
}

#[async_trait]
impl QueryRunner for ReflectionController {
    async fn run_query(
        &self,
        run_id: &str,
        query: &str,
        config: Option<&ControllerConfig>,
    ) -> Result<Value> {
        let config = config.unwrap_or_else(|| self.config());
        let outcome = self.run_with(run_id, query, config).await?;
        Ok(json!({
            "answer": outcome.answer,
            "iterations": outcome.iterations,
            "finish_reason": outcome.finish_reason.as_str(),
        }))
    }
}

/// Accepts queries and tracks their runs.
pub struct ReasonerService {
    runner: Arc<dyn QueryRunner>,
    cache: Arc<ResultCache>,
    pool: Arc<WorkerPool>,
    cleanup_interval: Duration,
}

impl ReasonerService {
    pub fn new(runner: Arc<dyn QueryRunner>, config: &ServiceConfig) -> Self {
        Self {
            runner,
            cache: Arc::new(ResultCache::new(Duration::from_secs(config.result_ttl_secs))),
            pool: Arc::new(WorkerPool::new(config.max_workers)),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_secs.max(1)),
        }
    }

    /// Queue a run and return its id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, query: impl Into<String>, config: Option<ControllerConfig>) -> String {
        let task_id = Uuid::new_v4().to_string();
        let query = query.into();
        self.cache.insert(RunResult::new(&task_id));

        let runner = self.runner.clone();
        let cache = self.cache.clone();
        let pool = self.pool.clone();
        let id = task_id.clone();
        let span = tracing::info_span!("service_run", task_id = %task_id);

        tokio::spawn(
            async move {
                let run_cache = cache.clone();
                let run_id = id.clone();
                let outcome = pool
                    .run(move || async move {
                        run_cache.update(&run_id, |r| r.mark_running());
                        tracing::info!("Run started");

                        // Run on its own task so a panic surfaces as a JoinError.
                        let inner = tokio::spawn(async move {
                            runner.run_query(&run_id, &query, config.as_ref()).await
                        });
                        inner.await
                    })
                    .await;

                match outcome {
                    Ok(Ok(Ok(value))) => {
                        tracing::info!("Run completed");
                        cache.update(&id, |r| r.complete(value));
                    }
                    Ok(Ok(Err(e))) => {
                        tracing::warn!(error = %e, "Run failed");
                        cache.update(&id, |r| r.fail(e.to_string()));
                    }
                    Ok(Err(join_error)) => {
                        tracing::error!(error = %join_error, "Run aborted");
                        let message = if join_error.is_panic() {
                            "Run panicked".to_string()
                        } else {
                            format!("Run aborted: {}", join_error)
                        };
                        cache.update(&id, |r| r.fail(message));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Run was not scheduled");
                        cache.update(&id, |r| r.fail(e.to_string()));
                    }
                }
            }
            .instrument(span),
        );

        reasoner_telemetry::track_submission();
        task_id
    }

    /// Current state of a live run.
    pub fn lookup(&self, task_id: &str) -> Result<RunResult> {
        self.cache
            .get(task_id)
            .ok_or_else(|| Error::ExpiredOrUnknownTask(task_id.to_string()))
    }

    /// Current state of a run. Unknown or expired ids yield the not-found payload.
    pub fn query(&self, task_id: &str) -> RunResult {
        self.lookup(task_id).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Lookup missed");
            RunResult::not_found(task_id)
        })
    }

    /// Stop scheduling. Runs still waiting for a worker, and later
    /// submissions, fail instead of starting.
    pub fn shutdown(&self) {
        self.pool.close();
        tracing::info!("Service stopped accepting runs");
    }

    /// Spawn the task that periodically sweeps expired results.
    pub fn spawn_janitor(&self) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let period = self.cleanup_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed = removed, "Expired results purged");
                }
            }
        })
    }

    /// Number of results currently held, expired or not.
    pub fn cached_results(&self) -> usize {
        self.cache.len()
    }

    pub fn max_workers(&self) -> usize {
        self.pool.max_workers()
    }
}
