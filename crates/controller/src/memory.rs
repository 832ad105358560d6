//! Run memory maintenance.
//!
//! The [`MemoryManager`] owns the [`Memory`] of one run and decides what gets
//! recorded after each iteration. Once an exact answer is known nothing else
//! is verified or extracted.

use async_trait::async_trait;
use std::sync::Arc;

use reasoner_core::{
    traits::{EvidenceExtractor, LlmClient, StateVerifier},
    Memory, Result, RetryPolicy,
};

/// Memory of one run plus the collaborators that maintain it.
pub struct MemoryManager {
    memory: Memory,
    verifier: Arc<dyn StateVerifier>,
    extractor: Arc<dyn EvidenceExtractor>,
    retry: RetryPolicy,
}

impl MemoryManager {
    pub fn new(verifier: Arc<dyn StateVerifier>, extractor: Arc<dyn EvidenceExtractor>) -> Self {
        Self {
            memory: Memory::new(),
            verifier,
            extractor,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Record the outcome of one iteration.
    ///
    /// A non-empty `candidate` is pushed onto the exact-answer stack and
    /// nothing else happens. Otherwise, unless the memory is already solved,
    /// the state verifier (skipped for the first instruction of the run) and
    /// the evidence extractor are consulted, and the instruction is recorded.
    pub async fn save_memory(&mut self, candidate: Option<&str>, evidence: &[String], instruction: &str) {
        if let Some(answer) = candidate.map(str::trim).filter(|a| !a.is_empty()) {
            tracing::info!(answer = %answer, "Exact answer recorded");
            self.memory.exact_answer.push(answer.to_string());
            return;
        }
        if self.memory.is_solved() {
            return;
        }

        if !self.memory.instruction_set.is_empty() {
            let verifier = &self.verifier;
            let memory = &self.memory;
            let statement = self
                .retry
                .run("state_verifier", move || async move {
                    verifier.verify(instruction, memory).await
                })
                .await;
            match statement {
                Ok(Some(s)) => push_unique(&mut self.memory.state_memory, s),
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "State verification skipped"),
            }
        }

        let extractor = &self.extractor;
        let extracted = self
            .retry
            .run("evidence_extractor", move || async move {
                extractor.extract(instruction, evidence).await
            })
            .await;
        match extracted {
            Ok(Some(e)) => push_unique(&mut self.memory.evidence_memory, e),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Evidence extraction skipped"),
        }

        self.memory.instruction_set.push(instruction.to_string());
    }

    /// Latest exact answer, if any.
    pub fn get_solved_answer(&self) -> Option<&str> {
        self.memory.solved_answer()
    }

    pub fn serialize_memory(&self) -> String {
        self.memory.serialize()
    }

    /// Forget everything recorded so far.
    pub fn refresh(&mut self) {
        self.memory.clear();
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn into_memory(self) -> Memory {
        self.memory
    }
}

fn push_unique(list: &mut Vec<String>, entry: String) {
    let entry = entry.trim().to_string();
    if !entry.is_empty() && !list.contains(&entry) {
        list.push(entry);
    }
}

// =============================================================================
// Verifier / Extractor implementations
// =============================================================================

/// Extractor that records the evidence text unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimExtractor;

#[async_trait]
impl EvidenceExtractor for VerbatimExtractor {
    async fn extract(&self, _instruction: &str, evidence: &[String]) -> Result<Option<String>> {
        let joined = evidence
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Ok((!joined.is_empty()).then_some(joined))
    }
}

/// Asks the model what is now known, given memory and the last instruction.
pub struct LlmStateVerifier {
    llm: Arc<dyn LlmClient>,
}

impl LlmStateVerifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl StateVerifier for LlmStateVerifier {
    async fn verify(&self, instruction: &str, memory: &Memory) -> Result<Option<String>> {
        let prompt = format!(
            "State in one sentence what is now known about the instruction, \
             based on the memory. Reply NONE if nothing is known.\n\n\
             {}\n\
             Instruction: {}",
            memory.serialize(),
            instruction
        );
        let reply = self.llm.complete(&prompt).await?.content;
        let reply = reply.trim();
        if reply.is_empty() || reply.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        Ok(Some(reply.to_string()))
    }
}

/// Asks the model to condense raw evidence.
pub struct LlmEvidenceExtractor {
    llm: Arc<dyn LlmClient>,
}

impl LlmEvidenceExtractor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl EvidenceExtractor for LlmEvidenceExtractor {
    async fn extract(&self, instruction: &str, evidence: &[String]) -> Result<Option<String>> {
        if evidence.iter().all(|e| e.trim().is_empty()) {
            return Ok(None);
        }
        let prompt = format!(
            "Extract the facts relevant to the instruction from the evidence. \
             Reply NONE if nothing is relevant.\n\n\
             Evidence:\n{}\n\
             Instruction: {}",
            evidence.join("\n"),
            instruction
        );
        let reply = self.llm.complete(&prompt).await?.content;
        let reply = reply.trim();
        if reply.is_empty() || reply.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        Ok(Some(reply.to_string()))
    }
}
