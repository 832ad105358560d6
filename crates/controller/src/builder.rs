//! Builder for ReflectionController.

use std::sync::Arc;

use reasoner_core::{
    config::ControllerConfig,
    traits::{EvidenceExtractor, Generator, LlmClient, Planner, Reflector, StateVerifier},
    Error, Result, RetryPolicy,
};
use reasoner_skills::ExecutorRegistry;

use crate::executor::TaskDispatcher;
use crate::generator::LlmGenerator;
use crate::memory::{LlmEvidenceExtractor, LlmStateVerifier, VerbatimExtractor};
use crate::planning::LlmPlanner;
use crate::reflection::ReflectionController;
use crate::reflector::LlmReflector;

/// Builder for constructing a ReflectionController.
///
/// Collaborators not set explicitly default to the LLM-backed
/// implementations, which requires an LLM client. The evidence extractor
/// defaults to [`VerbatimExtractor`] when no LLM is configured.
pub struct ReflectionControllerBuilder {
    config: ControllerConfig,
    retry: RetryPolicy,
    llm: Option<Arc<dyn LlmClient>>,
    registry: Option<Arc<ExecutorRegistry>>,
    planner: Option<Arc<dyn Planner>>,
    reflector: Option<Arc<dyn Reflector>>,
    generator: Option<Arc<dyn Generator>>,
    verifier: Option<Arc<dyn StateVerifier>>,
    extractor: Option<Arc<dyn EvidenceExtractor>>,
}

impl ReflectionControllerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ControllerConfig::default(),
            retry: RetryPolicy::default(),
            llm: None,
            registry: None,
            planner: None,
            reflector: None,
            generator: None,
            verifier: None,
            extractor: None,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the retry policy shared by every backend call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the LLM client used by default collaborators.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Set the executor registry.
    pub fn with_registry(mut self, registry: Arc<ExecutorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_reflector(mut self, reflector: Arc<dyn Reflector>) -> Self {
        self.reflector = Some(reflector);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn StateVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn EvidenceExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the controller.
    pub fn build(self) -> Result<ReflectionController> {
        let registry = self
            .registry
            .ok_or_else(|| Error::controller("Executor registry is required"))?;
        let llm = self.llm;
        let retry = self.retry;

        let require_llm = |what: &str| -> Result<Arc<dyn LlmClient>> {
            llm.clone()
                .ok_or_else(|| Error::controller(format!("{} requires an LLM client", what)))
        };

        let planner = match self.planner {
            Some(p) => p,
            None => Arc::new(LlmPlanner::new(require_llm("Default planner")?).with_retry(retry)),
        };
        let reflector = match self.reflector {
            Some(r) => r,
            None => Arc::new(LlmReflector::new(require_llm("Default reflector")?).with_retry(retry)),
        };
        let generator = match self.generator {
            Some(g) => g,
            None => Arc::new(LlmGenerator::new(require_llm("Default generator")?).with_retry(retry)),
        };
        let verifier = match self.verifier {
            Some(v) => v,
            None => Arc::new(LlmStateVerifier::new(require_llm("Default state verifier")?)),
        };
        let extractor: Arc<dyn EvidenceExtractor> = match (self.extractor, &llm) {
            (Some(e), _) => e,
            (None, Some(llm)) => Arc::new(LlmEvidenceExtractor::new(llm.clone())),
            (None, None) => Arc::new(VerbatimExtractor),
        };

        Ok(ReflectionController {
            planner,
            dispatcher: TaskDispatcher::new(registry),
            reflector,
            generator,
            verifier,
            extractor,
            config: self.config,
            retry,
        })
    }
}

impl Default for ReflectionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reasoner_core::mocks::{FixedReflector, FixedVerifier, MockLlm, ScriptedPlanner};
    use reasoner_skills::{MathExecutor, OutputExecutor};
    use reasoner_core::Capability;

    fn registry() -> Arc<ExecutorRegistry> {
        Arc::new(
            ExecutorRegistry::builder()
                .with_executor(Arc::new(MathExecutor::new()))
                .with_executor(Arc::new(OutputExecutor::new()))
                .require([Capability::Math, Capability::Output])
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_registry_required() {
        let result = ReflectionControllerBuilder::new()
            .with_llm(Arc::new(MockLlm::constant("x")))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_llm_required_for_defaults() {
        let result = ReflectionControllerBuilder::new()
            .with_registry(registry())
            .with_planner(Arc::new(ScriptedPlanner::new(vec![])))
            .build();
        assert!(matches!(result, Err(Error::Controller(msg)) if msg.contains("reflector")));
    }

    #[test]
    fn test_llm_free_wiring() {
        let controller = ReflectionControllerBuilder::new()
            .with_registry(registry())
            .with_planner(Arc::new(ScriptedPlanner::new(vec![])))
            .with_reflector(Arc::new(FixedReflector::new(true, "")))
            .with_generator(Arc::new(LlmGenerator::new(Arc::new(MockLlm::constant("a")))))
            .with_verifier(Arc::new(FixedVerifier::new("s")))
            .build();
        assert!(controller.is_ok());
    }
}
