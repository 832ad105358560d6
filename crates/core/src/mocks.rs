//! Mock implementations of core traits for testing.
//!
//! Shared by the unit and integration tests of every crate in the workspace.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::{
    traits::{
        ChatMessage, Chunk, EvidenceExtractor, LlmClient, LlmResponse, LlmUsage, Planner,
        Reflection, Reflector, Retriever, StateVerifier,
    },
    types::{Context, Memory, Task},
    Error, Result,
};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM that returns predefined responses.
pub struct MockLlm {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl MockLlm {
    /// Create a new mock LLM with a queue of responses, cycled in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock whose every call fails with a retryable error.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Get the number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        let count = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };

        if let Some(message) = &self.failure {
            return Err(Error::external("llm", message.clone()));
        }

        let responses = self.responses.lock().unwrap();
        let idx = (count - 1) % responses.len().max(1);
        let content = responses.get(idx).cloned().unwrap_or_default();

        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.complete(&prompt).await
    }
}

// =============================================================================
// Mock Planner
// =============================================================================

/// Planner returning one scripted plan per call. The last plan repeats.
pub struct ScriptedPlanner {
    plans: Vec<Vec<Task>>,
    instructions: Mutex<Vec<String>>,
    failure: Option<String>,
}

impl ScriptedPlanner {
    pub fn new(plans: Vec<Vec<Task>>) -> Self {
        Self {
            plans,
            instructions: Mutex::new(Vec::new()),
            failure: None,
        }
    }

    /// Planner whose every call fails with a retryable error.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Instructions received so far.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.instructions.lock().unwrap().len()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn invoke(&self, query: &str, _context: &Context) -> Result<Vec<Task>> {
        let call = {
            let mut instructions = self.instructions.lock().unwrap();
            instructions.push(query.to_string());
            instructions.len() - 1
        };

        if let Some(message) = &self.failure {
            return Err(Error::external("planner", message.clone()));
        }

        let idx = call.min(self.plans.len().saturating_sub(1));
        self.plans
            .get(idx)
            .cloned()
            .ok_or_else(|| Error::plan_parse("no scripted plan"))
    }
}

// =============================================================================
// Mock Reflector
// =============================================================================

/// Reflector returning the same decision every time.
pub struct FixedReflector {
    reflection: Option<Reflection>,
    calls: Mutex<usize>,
}

impl FixedReflector {
    pub fn new(finished: bool, next_instruction: &str) -> Self {
        Self {
            reflection: Some(Reflection {
                finished,
                next_instruction: next_instruction.to_string(),
            }),
            calls: Mutex::new(0),
        }
    }

    /// Reflector whose every call fails.
    pub fn failing() -> Self {
        Self {
            reflection: None,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Reflector for FixedReflector {
    async fn reflect(&self, _instruction: &str, _memory: &Memory) -> Result<Reflection> {
        *self.calls.lock().unwrap() += 1;
        self.reflection
            .clone()
            .ok_or_else(|| Error::external("reflector", "unavailable"))
    }
}

// =============================================================================
// Mock Verifier / Extractor
// =============================================================================

/// Verifier returning a fixed statement, or failing when none is set.
pub struct FixedVerifier {
    statement: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FixedVerifier {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: Some(statement.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            statement: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Instructions the verifier was asked about.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StateVerifier for FixedVerifier {
    async fn verify(&self, instruction: &str, _memory: &Memory) -> Result<Option<String>> {
        self.calls.lock().unwrap().push(instruction.to_string());
        match &self.statement {
            Some(statement) => Ok(Some(statement.clone())),
            None => Err(Error::external("verifier", "unavailable")),
        }
    }
}

/// Extractor that always fails.
#[derive(Default)]
pub struct FailingExtractor {
    calls: Mutex<usize>,
}

impl FailingExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl EvidenceExtractor for FailingExtractor {
    async fn extract(&self, _instruction: &str, _evidence: &[String]) -> Result<Option<String>> {
        *self.calls.lock().unwrap() += 1;
        Err(Error::external("extractor", "unavailable"))
    }
}

// =============================================================================
// Mock Retriever
// =============================================================================

/// Retriever serving a fixed list of chunks.
pub struct StaticRetriever {
    chunks: Vec<Chunk>,
    queries: Mutex<Vec<String>>,
    failures_before_success: Mutex<usize>,
}

impl StaticRetriever {
    pub fn new(contents: Vec<&str>) -> Self {
        let chunks = contents
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                id: format!("doc-{}", i),
                content: content.to_string(),
                score: 1.0,
            })
            .collect();
        Self {
            chunks,
            queries: Mutex::new(Vec::new()),
            failures_before_success: Mutex::new(0),
        }
    }

    /// Fail the first `n` calls with a retryable error.
    pub fn flaky(mut self, n: usize) -> Self {
        self.failures_before_success = Mutex::new(n);
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        self.queries.lock().unwrap().push(query.to_string());
        {
            let mut remaining = self.failures_before_success.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::external("retrieval", "temporarily unavailable"));
            }
        }
        Ok(self.chunks.iter().take(top_k).cloned().collect())
    }
}
