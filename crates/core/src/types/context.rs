use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::task::{Task, TaskInput, TaskStatus};
use crate::error::{Error, Result};

/// Per-run execution context: task history plus named bindings.
///
/// A context belongs to exactly one run and is never shared across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Context {
    history: Vec<Task>,
    bindings: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a name to a value, replacing any previous binding.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bind a succeeded task's id to its result. Other tasks are ignored.
    pub fn bind_task(&mut self, task: &Task) {
        if task.status() == TaskStatus::Succeeded {
            if let Some(result) = task.result() {
                self.bindings.insert(task.id.clone(), result.clone());
            }
        }
    }

    /// Append a task to the run history and bind its result if it succeeded.
    pub fn record(&mut self, task: Task) {
        self.bind_task(&task);
        self.history.push(task);
    }

    /// Resolve an input to a value.
    pub fn resolve(&self, input: &TaskInput) -> Result<Value> {
        match input {
            TaskInput::Literal(value) => Ok(value.clone()),
            TaskInput::Ref(name) => self
                .bindings
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnresolvedReference(name.clone())),
        }
    }

    /// Resolve every input of a task, in order.
    pub fn resolve_all(&self, task: &Task) -> Result<Vec<Value>> {
        task.inputs.iter().map(|input| self.resolve(input)).collect()
    }

    pub fn history(&self) -> &[Task] {
        &self.history
    }

    /// Short textual summary of prior work, one line per task.
    pub fn summary(&self) -> String {
        self.history
            .iter()
            .map(|task| {
                let outcome = match task.status() {
                    TaskStatus::Succeeded => task.result().map(render_value).unwrap_or_default(),
                    TaskStatus::Failed => format!("failed: {}", task.error().unwrap_or("unknown")),
                    other => other.to_string(),
                };
                format!("[{}] {} {}: {}", task.id, task.capability, task.description, outcome)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Render a JSON value as plain text. Strings lose their quotes.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_literal_and_ref() {
        let mut ctx = Context::new();
        ctx.bind("X", json!(3));

        assert_eq!(ctx.resolve(&TaskInput::literal("abc")).unwrap(), json!("abc"));
        assert_eq!(ctx.resolve(&TaskInput::reference("X")).unwrap(), json!(3));
        assert!(matches!(
            ctx.resolve(&TaskInput::reference("Y")),
            Err(Error::UnresolvedReference(name)) if name == "Y"
        ));
    }

    #[test]
    fn test_record_binds_only_succeeded() {
        let mut ctx = Context::new();

        let mut ok = Task::new("t1", "Math");
        ok.start().unwrap();
        ok.succeed(json!(36)).unwrap();

        let mut failed = Task::new("t2", "Math");
        failed.start().unwrap();
        failed.fail("boom").unwrap();

        ctx.record(ok);
        ctx.record(failed);
        ctx.record(Task::new("t3", "Output"));

        assert_eq!(ctx.history().len(), 3);
        assert_eq!(ctx.binding("t1"), Some(&json!(36)));
        assert!(!ctx.is_bound("t2"));
        assert!(!ctx.is_bound("t3"));
        assert!(ctx.summary().contains("failed: boom"));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("plain")), "plain");
        assert_eq!(render_value(&json!(4)), "4");
        assert_eq!(render_value(&json!(["a", 1])), "[\"a\",1]");
        assert_eq!(render_value(&Value::Null), "");
    }
}
