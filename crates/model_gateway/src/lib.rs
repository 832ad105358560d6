//! Language model gateway for Reasoner.
//!
//! This crate provides an [`LlmClient`](reasoner_core::LlmClient) for any
//! OpenAI-compatible chat completion server.

pub mod openai;

pub use openai::{OpenAiCompatClient, OpenAiCompatConfig};

use reasoner_core::config::LlmConfig;
use std::time::Duration;

/// Create an LLM client from configuration.
pub fn create_client_from_config(config: &LlmConfig) -> reasoner_core::Result<OpenAiCompatClient> {
    let mut client_config = OpenAiCompatConfig::new(&config.base_url, &config.model)
        .with_timeout(Duration::from_secs(config.timeout_secs.max(1)));
    if let Some(key) = &config.api_key {
        client_config = client_config.with_api_key(key.clone());
    }
    OpenAiCompatClient::new(client_config)
}
