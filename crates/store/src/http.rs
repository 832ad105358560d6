//! Client for a remote retrieval service.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use reasoner_core::{Chunk, Error, Result, Retriever};

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RetrieveResponse {
    Wrapped { chunks: Vec<Chunk> },
    Bare(Vec<Chunk>),
}

/// Retriever that POSTs `{query, top_k}` to an HTTP endpoint.
///
/// The endpoint answers with either a JSON array of chunks or an object with
/// a `chunks` array.
pub struct HttpRetriever {
    client: Client,
    endpoint: String,
}

impl HttpRetriever {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Chunk>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RetrieveRequest { query, top_k })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("retrieval request: {}", e))
                } else {
                    Error::external("retrieval", format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::external(
                "retrieval",
                format!("HTTP {}: {}", status.as_u16(), body),
            ));
        }

        let parsed: RetrieveResponse = serde_json::from_str(&body).map_err(|e| {
            Error::external("retrieval", format!("Failed to parse response: {}", e))
        })?;
        let mut chunks = match parsed {
            RetrieveResponse::Wrapped { chunks } => chunks,
            RetrieveResponse::Bare(chunks) => chunks,
        };
        chunks.truncate(top_k);

        tracing::debug!(endpoint = %self.endpoint, hits = chunks.len(), "Remote retrieval finished");
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        let bare: RetrieveResponse =
            serde_json::from_str(r#"[{"id": "1", "content": "a", "score": 0.5}]"#).unwrap();
        assert!(matches!(bare, RetrieveResponse::Bare(c) if c.len() == 1));

        let wrapped: RetrieveResponse =
            serde_json::from_str(r#"{"chunks": [{"id": "1", "content": "a"}]}"#).unwrap();
        assert!(matches!(wrapped, RetrieveResponse::Wrapped { chunks } if chunks[0].score == 0.0));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_call() {
        let retriever =
            HttpRetriever::new("http://127.0.0.1:9/retrieve", Duration::from_millis(500)).unwrap();
        let result = retriever.retrieve("q", 3).await;
        assert!(matches!(result, Err(Error::ExternalCall { .. })));
    }

    /// Accepts connections and never answers them.
    async fn silent_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_slow_endpoint_is_timeout() {
        let endpoint = format!("{}/retrieve", silent_endpoint().await);
        let retriever = HttpRetriever::new(endpoint, Duration::from_millis(100)).unwrap();
        let result = retriever.retrieve("q", 3).await;
        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(result.unwrap_err().is_retryable());
    }
}
