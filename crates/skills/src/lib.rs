//! Executors and the executor registry for Reasoner.
//!
//! This crate provides:
//! - The expression evaluator behind the `Math` capability
//! - Built-in executors for `Retrieval`, `Deduce` and `Output`
//! - A capability-keyed registry validated at startup

pub mod builtin;
pub mod math;
pub mod registry;

pub use builtin::{DeduceExecutor, OutputExecutor, RetrievalExecutor};
pub use math::{evaluate, FiniteSet, MathExecutor, MathValue, Scalar};
pub use registry::{ExecutorRegistry, ExecutorRegistryBuilder};
