//! LLM-backed reflector.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use reasoner_core::{
    traits::{LlmClient, Reflection, Reflector},
    Error, Memory, Result, RetryPolicy,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReflection {
    finished: bool,
    next_instruction: String,
}

/// Asks the model whether memory already answers the instruction.
pub struct LlmReflector {
    llm: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl LlmReflector {
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

    /// Parse `{"finished": bool, "next_instruction": string}`, fenced or not.
    pub fn parse(reply: &str) -> Result<Reflection> {
        let trimmed = reply.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|rest| rest.trim_end().strip_suffix("```"))
            .unwrap_or(trimmed);

        let raw: RawReflection = serde_json::from_str(body.trim())
            .map_err(|e| Error::controller(format!("invalid reflection reply: {}", e)))?;
        Ok(Reflection {
            finished: raw.finished,
            next_instruction: raw.next_instruction.trim().to_string(),
        })
    }
}

#[async_trait]
impl Reflector for LlmReflector {
    async fn reflect(&self, instruction: &str, memory: &Memory) -> Result<Reflection> {
        let prompt = format!(
            "Decide whether the memory below answers the instruction.\n\
             Reply with JSON only: {{\"finished\": true|false, \"next_instruction\": \"...\"}}. \
             When not finished, next_instruction says what to find out next.\n\n\
             Memory:\n{}\n\
             Instruction: {}",
            memory.serialize(),
            instruction
        );
        let llm = &self.llm;
        let prompt_ref = prompt.as_str();

        let response = self
            .retry
            .run("reflector", move || async move { llm.complete(prompt_ref).await })
            .await?;
        Self::parse(&response.content)
    }
}
