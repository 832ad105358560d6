//! Retrieval traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A scored piece of retrieved text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub score: f32,
}

/// Document or graph retrieval backend.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `top_k` chunks, best first.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>>;
}
