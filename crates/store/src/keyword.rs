//! In-memory keyword retriever.
//!
//! Documents are scored by the fraction of query tokens they contain. It is a
//! reference implementation and local fallback for a real retrieval service.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use reasoner_core::{Chunk, Error, Result, Retriever};

/// A document record as stored in corpus files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
}

#[derive(Debug)]
struct IndexedDocument {
    content: String,
    tokens: HashSet<String>,
}

/// Simple in-memory keyword retriever.
#[derive(Debug, Default)]
pub struct InMemoryRetriever {
    documents: DashMap<String, IndexedDocument>,
}

impl InMemoryRetriever {
    /// Create an empty retriever.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Create a retriever seeded with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let retriever = Self::new();
        for document in documents {
            retriever.add(document);
        }
        retriever
    }

    /// Load a JSON array of `{id, content}` records.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Cannot read corpus {}: {}", path.display(), e))
        })?;
        let documents: Vec<Document> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), documents = documents.len(), "Loaded corpus");
        Ok(Self::with_documents(documents))
    }

    /// Insert or replace a document.
    pub fn add(&self, document: Document) {
        let tokens = tokenize(&document.content).collect();
        self.documents.insert(
            document.id,
            IndexedDocument {
                content: document.content,
                tokens,
            },
        );
    }

    pub fn remove(&self, id: &str) {
        self.documents.remove(id);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        let query_tokens: HashSet<String> = tokenize(query).collect();
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Chunk> = self
            .documents
            .iter()
            .filter_map(|entry| {
                let hits = query_tokens
                    .iter()
                    .filter(|t| entry.value().tokens.contains(*t))
                    .count();
                (hits > 0).then(|| Chunk {
                    id: entry.key().clone(),
                    content: entry.value().content.clone(),
                    score: hits as f32 / query_tokens.len() as f32,
                })
            })
            .collect();

        // Sort by score descending, then id ascending
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}
