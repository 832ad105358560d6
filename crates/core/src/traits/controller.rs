//! Planning, reflection and answer generation traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Context, Memory, Task};

/// Turns an instruction into a plan of tasks.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Produce the next plan. `query` is the current instruction.
    async fn invoke(&self, query: &str, context: &Context) -> Result<Vec<Task>>;
}

/// Decision produced after each iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub finished: bool,
    pub next_instruction: String,
}

/// Decides whether a run is done or needs another plan.
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn reflect(&self, instruction: &str, memory: &Memory) -> Result<Reflection>;
}

/// Produces the final answer text. Never fails.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, query: &str, memory: &Memory) -> String;
}
