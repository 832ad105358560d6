//! Built-in executors for the Retrieval, Deduce and Output capabilities.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use reasoner_core::{
    render_value, Capability, Context, Error, Executor, LlmClient, Result, Retriever, RetryPolicy,
    Task,
};

/// Resolve every input of `task` and render it as text.
fn rendered_inputs(task: &Task, context: &Context) -> Result<Vec<String>> {
    Ok(context
        .resolve_all(task)?
        .iter()
        .map(render_value)
        .filter(|s| !s.is_empty())
        .collect())
}

// =============================================================================
// Retrieval Executor
// =============================================================================

/// Looks up supporting passages for a sub-question.
pub struct RetrievalExecutor {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    retry: RetryPolicy,
}

impl RetrievalExecutor {
    /// Create a new retrieval executor.
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self {
            retriever,
            top_k: top_k.max(1),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl Executor for RetrievalExecutor {
    fn capability(&self) -> Capability {
        Capability::Retrieval
    }

    async fn invoke(&self, _query: &str, task: &mut Task, context: &Context) -> Result<()> {
        let mut parts = vec![task.description.clone()];
        parts.extend(rendered_inputs(task, context)?);
        let search = parts
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let retriever = &self.retriever;
        let top_k = self.top_k;
        let search_ref = search.as_str();
        let chunks = self
            .retry
            .run("retrieval", move || async move {
                retriever.retrieve(search_ref, top_k).await
            })
            .await?;

        tracing::debug!(task_id = %task.id, hits = chunks.len(), "Retrieval finished");
        task.succeed(Value::Array(
            chunks.into_iter().map(|c| Value::String(c.content)).collect(),
        ))
    }
}

// =============================================================================
// Deduce Executor
// =============================================================================

/// Answers a sub-question by asking the language model to reason over inputs.
pub struct DeduceExecutor {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl DeduceExecutor {
    /// Create a new deduce executor.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn prompt(query: &str, description: &str, findings: &[String]) -> String {
        let findings = if findings.is_empty() {
            "(none)".to_string()
        } else {
            findings
                .iter()
                .map(|f| format!("- {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!(
            "Deduce the answer to the sub-question from the findings.\n\
             Overall question: {}\n\
             Sub-question: {}\n\
             Findings:\n{}\n\
             Reply with the answer only.",
            query, description, findings
        )
    }
}

#[async_trait]
impl Executor for DeduceExecutor {
    fn capability(&self) -> Capability {
        Capability::Deduce
    }

    async fn invoke(&self, query: &str, task: &mut Task, context: &Context) -> Result<()> {
        let findings = rendered_inputs(task, context)?;
        let prompt = Self::prompt(query, &task.description, &findings);

        let llm = &self.llm;
        let prompt_ref = prompt.as_str();
        let answer = self
            .retry
            .run("deduce", move || async move {
                let response = llm.complete(prompt_ref).await?;
                let answer = response.content.trim().to_string();
                if answer.is_empty() {
                    return Err(Error::external("deduce", "empty reply"));
                }
                Ok(answer)
            })
            .await?;

        task.succeed(Value::String(answer))
    }
}

// =============================================================================
// Output Executor
// =============================================================================

/// Assembles the final answer from its inputs.
#[derive(Debug, Default)]
pub struct OutputExecutor;

impl OutputExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for OutputExecutor {
    fn capability(&self) -> Capability {
        Capability::Output
    }

    async fn invoke(&self, _query: &str, task: &mut Task, context: &Context) -> Result<()> {
        let rendered = rendered_inputs(task, context)?;
        let text = if rendered.is_empty() {
            task.description.trim().to_string()
        } else {
            rendered.join("\n")
        };
        task.succeed(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasoner_core::mocks::{MockLlm, StaticRetriever};
    use reasoner_core::TaskInput;
    use serde_json::json;
    use std::time::Duration;

    fn running(task: Task) -> Task {
        let mut task = task;
        task.start().unwrap();
        task
    }

    #[tokio::test]
    async fn test_retrieval_collects_contents() {
        let retriever = Arc::new(StaticRetriever::new(vec!["X equals 4", "unrelated"]));
        let executor = RetrievalExecutor::new(retriever.clone(), 1);

        let mut task = running(Task::new("t1", "Retrieval").with_description("What is X?"));
        executor.invoke("q", &mut task, &Context::new()).await.unwrap();

        assert_eq!(task.result(), Some(&json!(["X equals 4"])));
        assert_eq!(retriever.queries(), vec!["What is X?"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieval_retries_transient_failures() {
        let retriever = Arc::new(StaticRetriever::new(vec!["X equals 4"]).flaky(2));
        let executor = RetrievalExecutor::new(retriever.clone(), 3)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(10)));

        let mut task = running(Task::new("t1", "Retrieval").with_description("X"));
        executor.invoke("q", &mut task, &Context::new()).await.unwrap();

        assert_eq!(retriever.queries().len(), 3);
        assert!(task.result().is_some());
    }

    #[tokio::test]
    async fn test_deduce_trims_reply() {
        let llm = Arc::new(MockLlm::constant("  Paris \n"));
        let executor = DeduceExecutor::new(llm.clone());

        let mut ctx = Context::new();
        ctx.bind("t1", json!("The capital of France is Paris"));
        let mut task = running(
            Task::new("t2", "Deduce")
                .with_description("Which city?")
                .with_input(TaskInput::reference("t1")),
        );

        executor.invoke("q", &mut task, &ctx).await.unwrap();
        assert_eq!(task.result(), Some(&json!("Paris")));
        assert!(llm.prompts()[0].contains("The capital of France is Paris"));
    }

    #[tokio::test]
    async fn test_deduce_surfaces_exhausted_retries() {
        let executor = DeduceExecutor::new(Arc::new(MockLlm::failing("down")))
            .with_retry(RetryPolicy::no_retry());

        let mut task = running(Task::new("t1", "Deduce"));
        let result = executor.invoke("q", &mut task, &Context::new()).await;
        assert!(matches!(result, Err(Error::ExternalCall { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_output_joins_inputs_or_uses_description() {
        let mut ctx = Context::new();
        ctx.bind("t2", json!(40));

        let mut task = running(
            Task::new("t3", "Output")
                .with_input(TaskInput::reference("t2"))
                .with_input(TaskInput::literal("units")),
        );
        OutputExecutor::new().invoke("q", &mut task, &ctx).await.unwrap();
        assert_eq!(task.result(), Some(&json!("40\nunits")));

        let mut bare = running(Task::new("t4", "Output").with_description(" no inputs "));
        OutputExecutor::new().invoke("q", &mut bare, &ctx).await.unwrap();
        assert_eq!(bare.result(), Some(&json!("no inputs")));
    }

    #[tokio::test]
    async fn test_unresolved_reference_is_an_error() {
        let mut task = running(Task::new("t3", "Output").with_input(TaskInput::reference("nope")));
        let result = OutputExecutor::new().invoke("q", &mut task, &Context::new()).await;
        assert!(matches!(result, Err(Error::UnresolvedReference(_))));
    }
}
