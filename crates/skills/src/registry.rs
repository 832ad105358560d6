//! Executor registry keyed by capability.

use std::collections::HashMap;
use std::sync::Arc;

use reasoner_core::{Capability, Error, Executor, Result};

/// Immutable capability -> executor table, built once at startup.
pub struct ExecutorRegistry {
    executors: HashMap<Capability, Arc<dyn Executor>>,
}

impl ExecutorRegistry {
    /// Start building a registry.
    pub fn builder() -> ExecutorRegistryBuilder {
        ExecutorRegistryBuilder::new()
    }

    /// Executor serving `capability`, if registered.
    pub fn get(&self, capability: Capability) -> Option<Arc<dyn Executor>> {
        self.executors.get(&capability).cloned()
    }

    /// Registered capabilities, sorted.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps: Vec<_> = self.executors.keys().copied().collect();
        caps.sort();
        caps
    }

    /// Get the number of registered executors.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Builder for [`ExecutorRegistry`].
///
/// Duplicate registrations and missing required capabilities are reported by
/// [`ExecutorRegistryBuilder::build`].
pub struct ExecutorRegistryBuilder {
    executors: HashMap<Capability, Arc<dyn Executor>>,
    duplicates: Vec<Capability>,
    required: Vec<Capability>,
}

impl ExecutorRegistryBuilder {
    /// Create a builder requiring every capability.
    pub fn new() -> Self {
        Self {
            executors: HashMap::new(),
            duplicates: Vec::new(),
            required: Capability::ALL.to_vec(),
        }
    }

    /// Register an executor under its own capability.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        let capability = executor.capability();
        if self.executors.contains_key(&capability) {
            self.duplicates.push(capability);
        } else {
            tracing::info!(capability = %capability, "Registering executor");
            self.executors.insert(capability, executor);
        }
        self
    }

    /// Replace the set of capabilities that must be present.
    pub fn require(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.required = capabilities.into_iter().collect();
        self
    }

    /// Validate and build the registry.
    pub fn build(self) -> Result<ExecutorRegistry> {
        if let Some(capability) = self.duplicates.first() {
            return Err(Error::Registry(format!(
                "Executor for '{}' is already registered",
                capability
            )));
        }

        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|c| !self.executors.contains_key(c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::Registry(format!(
                "Missing executors for: {}",
                missing.join(", ")
            )));
        }

        Ok(ExecutorRegistry {
            executors: self.executors,
        })
    }
}

impl Default for ExecutorRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
