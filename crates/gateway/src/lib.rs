//! Service layer and HTTP entry point for the reasoner.
//!
//! Queries are accepted asynchronously, run on a bounded worker pool and
//! their results kept in a TTL cache for polling.

pub mod cache;
pub mod scheduler;
pub mod server;
pub mod service;

pub use cache::ResultCache;
pub use scheduler::WorkerPool;
pub use server::{GatewayServer, SubmitRequest, SubmitResponse};
pub use service::{QueryRunner, ReasonerService};
