//! Core data types for Reasoner.

mod context;
mod memory;
mod run;
mod task;

pub use context::*;
pub use memory::*;
pub use run::*;
pub use task::*;
