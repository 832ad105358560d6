//! Reasoning controller.
//!
//! This crate provides plan parsing, dependency-ordered task dispatch,
//! run memory and the plan / execute / reflect loop.

pub mod builder;
pub mod dag;
pub mod executor;
pub mod generator;
pub mod memory;
pub mod parser;
pub mod planning;
pub mod reflection;
pub mod reflector;

pub use builder::ReflectionControllerBuilder;
pub use dag::plan_waves;
pub use executor::{PlanReport, TaskDispatcher};
pub use generator::{LlmGenerator, NO_ANSWER};
pub use memory::{LlmEvidenceExtractor, LlmStateVerifier, MemoryManager, VerbatimExtractor};
pub use parser::PlanParser;
pub use planning::LlmPlanner;
pub use reflection::{FinishReason, ReflectionController, ReflectionState, RunOutcome};
pub use reflector::LlmReflector;
