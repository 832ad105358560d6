//! Memory maintenance traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Memory;

/// Restates what is known so far after an instruction was executed.
#[async_trait]
pub trait StateVerifier: Send + Sync {
    /// Return a state statement, or `None` when nothing new is known.
    async fn verify(&self, instruction: &str, memory: &Memory) -> Result<Option<String>>;
}

/// Condenses raw evidence into a memory entry.
#[async_trait]
pub trait EvidenceExtractor: Send + Sync {
    async fn extract(&self, instruction: &str, evidence: &[String]) -> Result<Option<String>>;
}
