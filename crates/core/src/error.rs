//! Error types for Reasoner.

use thiserror::Error;

/// Result type alias using Reasoner's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Reasoner.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Executor registry error: {0}")]
    Registry(String),

    #[error("Invalid transition for task '{task_id}': {from} -> {to}")]
    InvalidTransition {
        task_id: String,
        from: String,
        to: String,
    },

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    // =========================================================================
    // Expression Evaluator Errors
    // =========================================================================
    #[error("Unsupported function: {0}")]
    UnsupportedFunction(String),

    #[error("Empty domain: {0}() requires a non-empty set")]
    EmptyDomain(String),

    #[error("Syntax error at position {position}: {message}")]
    ExpressionSyntax { position: usize, message: String },

    #[error("Unbound variable: {0}")]
    UnboundVariable(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Division by zero")]
    DivisionByZero,

    // =========================================================================
    // Controller Errors
    // =========================================================================
    #[error("Controller error: {0}")]
    Controller(String),

    #[error("Plan parse error: {0}")]
    PlanParse(String),

    // =========================================================================
    // External Collaborator Errors
    // =========================================================================
    #[error("External call '{operation}' failed after {attempts} attempt(s): {message}")]
    ExternalCall {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    // =========================================================================
    // Service Errors
    // =========================================================================
    #[error("Result not found or expired: {0}")]
    ExpiredOrUnknownTask(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an external call error for a single failed attempt.
    pub fn external(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCall {
            operation: operation.into(),
            attempts: 1,
            message: message.into(),
        }
    }

    /// Create a controller error.
    pub fn controller(msg: impl Into<String>) -> Self {
        Self::Controller(msg.into())
    }

    /// Create a plan parse error.
    pub fn plan_parse(msg: impl Into<String>) -> Self {
        Self::PlanParse(msg.into())
    }

    /// Create a syntax error at a byte offset of an expression.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::ExpressionSyntax {
            position,
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }

    /// Create a gateway error.
    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a failed backend call may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalCall { .. } | Self::Timeout(_) | Self::Other(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::external("planner", "connection reset").is_retryable());
        assert!(Error::Timeout("llm".into()).is_retryable());
        assert!(!Error::UnsupportedFunction("median".into()).is_retryable());
        assert!(!Error::plan_parse("empty plan").is_retryable());
        assert!(!Error::DivisionByZero.is_retryable());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = Error::UnsupportedFunction("unknownfn".into());
        assert!(err.to_string().contains("unknownfn"));

        let err = Error::EmptyDomain("average".into());
        assert!(err.to_string().contains("average()"));
    }
}
