//! Core types, traits, and error definitions for Reasoner.
//!
//! This crate provides the foundational building blocks shared by the
//! controller, the executors, the retrieval backends and the service layer.

pub mod config;
pub mod error;
pub mod mocks;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use retry::{RetryConfig, RetryPolicy};
pub use traits::*;
pub use types::*;
