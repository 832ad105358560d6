use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub controller: ControllerConfig,
    pub retry: RetryConfig,
    pub service: ServiceConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

/// How strictly the reflection step accepts an iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStrictness {
    /// Any iteration without a failed task finishes the run.
    Completion,
    /// The reflector must also agree.
    #[default]
    Reflective,
    /// Only a solved answer in memory finishes the run.
    ExactAnswer,
}

/// Per-run controller settings. Also accepted per request by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub max_reflect_time: u32,
    pub max_concurrency: usize,
    pub strictness: VerificationStrictness,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_reflect_time: 3,
            max_concurrency: 4,
            strictness: VerificationStrictness::Reflective,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub max_workers: usize,
    pub result_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<Secret<String>>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Remote retrieval service. Takes precedence over `corpus_path`.
    pub endpoint: Option<String>,
    /// JSON file of `{id, content}` records for the in-memory corpus.
    pub corpus_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("REASONER_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map REASONER__SERVER__PORT=3000 to server.port
            .add_source(Environment::with_prefix("REASONER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8080,
                allowed_origins: vec!["*".into()],
            },
            controller: ControllerConfig::default(),
            retry: RetryConfig::default(),
            service: ServiceConfig {
                max_workers: 8,
                result_ttl_secs: 3600,
                cleanup_interval_secs: 60,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".into(),
                model: "gpt-4o-mini".into(),
                api_key: None,
                timeout_secs: 60,
            },
            retrieval: RetrievalConfig {
                top_k: 5,
                endpoint: None,
                corpus_path: None,
            },
            logging: LoggingConfig {
                filter: "info".into(),
                json: false,
            },
        }
    }
}
