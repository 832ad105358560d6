//! Retrieval backends for Reasoner.
//!
//! - [`InMemoryRetriever`]: keyword scoring over an in-process corpus
//! - [`HttpRetriever`]: client for a remote retrieval service

pub mod http;
pub mod keyword;

pub use http::HttpRetriever;
pub use keyword::{Document, InMemoryRetriever};
