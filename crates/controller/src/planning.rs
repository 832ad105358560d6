//! LLM-backed planner.
//!
//! Renders the current instruction and a summary of prior work into a prompt,
//! asks the model for a JSON plan and parses the reply strictly.

use async_trait::async_trait;
use std::sync::Arc;

use reasoner_core::{
    traits::{LlmClient, Planner},
    Capability, Context, Result, RetryPolicy, Task,
};

use crate::parser::PlanParser;

/// Planner that asks a language model for the next plan.
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
    parser: PlanParser,
    retry: RetryPolicy,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            parser: PlanParser::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_prompt(instruction: &str, context: &Context) -> String {
        let capabilities = Capability::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let history = if context.history().is_empty() {
            "(none)".to_string()
        } else {
            context.summary()
        };

        format!(
            "Break the instruction into tasks.\n\
             Available capabilities: {capabilities}.\n\
             Reply with JSON only, shaped as \
             {{\"tasks\": [{{\"id\": \"t1\", \"capability\": \"Retrieval\", \"description\": \"...\", \
             \"inputs\": [{{\"literal\": \"...\"}}, {{\"ref\": \"t0\"}}]}}]}}.\n\
             A Math task takes its expression as the first literal input. \
             Finish with one Output task that references the answer.\n\n\
             Previous work:\n{history}\n\n\
             Instruction: {instruction}"
        )
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn invoke(&self, query: &str, context: &Context) -> Result<Vec<Task>> {
        let prompt = Self::build_prompt(query, context);
        let llm = &self.llm;
        let prompt_ref = prompt.as_str();

        let response = self
            .retry
            .run("planner", move || async move { llm.complete(prompt_ref).await })
            .await?;

        let tasks = self.parser.parse(&response.content)?;
        tracing::info!(tasks = tasks.len(), "Plan generated");
        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasoner_core::{mocks::MockLlm, Error};
    use std::time::Duration;

    #[tokio::test]
    async fn test_plan_from_fenced_reply() {
        let reply = "```json\n{\"tasks\": [{\"id\": \"t1\", \"capability\": \"Output\", \"description\": \"say hi\", \"inputs\": []}]}\n```";
        let llm = Arc::new(MockLlm::constant(reply));
        let planner = LlmPlanner::new(llm.clone());

        let tasks = planner.invoke("greet", &Context::new()).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(llm.prompts()[0].contains("Instruction: greet"));
    }

    #[tokio::test]
    async fn test_bad_reply_is_plan_parse() {
        let planner = LlmPlanner::new(Arc::new(MockLlm::constant("I would first look up X")));
        let result = planner.invoke("q", &Context::new()).await;
        assert!(matches!(result, Err(Error::PlanParse(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_failure_retried_then_surfaced() {
        let llm = Arc::new(MockLlm::failing("503"));
        let planner = LlmPlanner::new(llm.clone())
            .with_retry(RetryPolicy::new(3, Duration::from_millis(5)));

        let result = planner.invoke("q", &Context::new()).await;
        assert!(matches!(result, Err(Error::ExternalCall { attempts: 3, .. })));
        assert_eq!(llm.call_count(), 3);
    }
}
