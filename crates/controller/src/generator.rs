//! Final answer generation.

use async_trait::async_trait;
use std::sync::Arc;

use reasoner_core::{
    traits::{Generator, LlmClient},
    Memory, RetryPolicy,
};

/// Answer returned when memory holds nothing usable and the model is unavailable.
pub const NO_ANSWER: &str = "No answer could be determined.";

/// Generator that asks the model to answer from memory.
///
/// A solved answer is returned as-is without calling the model.
pub struct LlmGenerator {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl LlmGenerator {
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

    fn fallback(memory: &Memory) -> String {
        memory
            .latest_state()
            .or_else(|| memory.latest_evidence())
            .unwrap_or(NO_ANSWER)
            .to_string()
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(&self, query: &str, memory: &Memory) -> String {
        if let Some(answer) = memory.solved_answer() {
            return answer.to_string();
        }

        let prompt = format!(
            "Answer the question using only the memory below. Be concise.\n\n\
             {}\n\
             Question: {}",
            memory.serialize(),
            query
        );
        let llm = &self.llm;
        let prompt_ref = prompt.as_str();

        let result = self
            .retry
            .run("generator", move || async move { llm.complete(prompt_ref).await })
            .await;

        match result {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => Self::fallback(memory),
            Err(e) => {
                tracing::warn!(error = %e, "Generator failed, answering from memory");
                Self::fallback(memory)
            }
        }
    }
}
