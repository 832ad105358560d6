//! Core traits for Reasoner.
//!
//! Traits are organized by the layer that consumes them:
//! - `controller`: Planner, Reflector, Generator
//! - `memory`: StateVerifier, EvidenceExtractor
//! - `skills`: Executor
//! - `store`: Retriever
//! - `llm`: LlmClient

pub mod controller;
pub mod llm;
pub mod memory;
pub mod skills;
pub mod store;

pub use controller::*;
pub use llm::*;
pub use memory::*;
pub use skills::*;
pub use store::*;
