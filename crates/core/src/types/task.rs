use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// =============================================================================
// Capability
// =============================================================================

/// Operator type a task requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Document / graph retrieval.
    Retrieval,
    /// Arithmetic and set evaluation.
    Math,
    /// Logical deduction over prior findings.
    Deduce,
    /// Final answer assembly.
    Output,
}

impl Capability {
    /// Every capability, in registry validation order.
    pub const ALL: [Capability; 4] = [
        Capability::Retrieval,
        Capability::Math,
        Capability::Deduce,
        Capability::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "Retrieval",
            Self::Math => "Math",
            Self::Deduce => "Deduce",
            Self::Output => "Output",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownCapability(s.to_string()))
    }
}

// =============================================================================
// Task Types
// =============================================================================

/// Lifecycle of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One input slot of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskInput {
    /// A literal value taken verbatim.
    Literal(Value),
    /// The output of a prior task, or any other name bound in the context.
    Ref(String),
}

impl TaskInput {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// The referenced name, if this input is a reference.
    pub fn as_ref_name(&self) -> Option<&str> {
        match self {
            Self::Ref(name) => Some(name),
            Self::Literal(_) => None,
        }
    }
}

/// Typed unit of work produced by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within its plan.
    pub id: String,
    /// Name of the executor that runs this task.
    pub capability: String,
    /// Sub-question this task answers.
    #[serde(default)]
    pub description: String,
    /// Ordered inputs.
    #[serde(default)]
    pub inputs: Vec<TaskInput>,
    status: TaskStatus,
    result: Option<Value>,
    error: Option<String>,
}

impl Task {
    /// Create a pending task.
    pub fn new(id: impl Into<String>, capability: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capability: capability.into(),
            description: String::new(),
            inputs: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input(mut self, input: TaskInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = TaskInput>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Names referenced by this task's inputs.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().filter_map(TaskInput::as_ref_name)
    }

    /// Pending -> Running.
    pub fn start(&mut self) -> Result<()> {
        self.transition(TaskStatus::Pending, TaskStatus::Running)
    }

    /// Running -> Succeeded, recording the result.
    pub fn succeed(&mut self, result: Value) -> Result<()> {
        self.transition(TaskStatus::Running, TaskStatus::Succeeded)?;
        self.result = Some(result);
        Ok(())
    }

    /// Running -> Failed, recording the error.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Running, TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, expected: TaskStatus, next: TaskStatus) -> Result<()> {
        if self.status != expected {
            return Err(Error::InvalidTransition {
                task_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capability_parse() {
        assert_eq!("Math".parse::<Capability>().unwrap(), Capability::Math);
        assert_eq!(" retrieval ".parse::<Capability>().unwrap(), Capability::Retrieval);
        assert!(matches!(
            "Teleport".parse::<Capability>(),
            Err(Error::UnknownCapability(name)) if name == "Teleport"
        ));
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut task = Task::new("t1", "Math");
        assert_eq!(task.status(), TaskStatus::Pending);

        task.start().unwrap();
        assert_eq!(task.status(), TaskStatus::Running);

        task.succeed(json!(42)).unwrap();
        assert_eq!(task.status(), TaskStatus::Succeeded);
        assert_eq!(task.result(), Some(&json!(42)));
        assert!(task.error().is_none());
    }

    #[test]
    fn test_failure_records_error() {
        let mut task = Task::new("t1", "Retrieval");
        task.start().unwrap();
        task.fail("backend down").unwrap();

        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some("backend down"));
        assert!(task.result().is_none());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut pending = Task::new("t1", "Math");
        assert!(pending.succeed(json!(1)).is_err());
        assert!(pending.fail("x").is_err());
        assert_eq!(pending.status(), TaskStatus::Pending);

        let mut done = Task::new("t2", "Math");
        done.start().unwrap();
        done.succeed(json!(1)).unwrap();
        assert!(matches!(done.start(), Err(Error::InvalidTransition { .. })));
        assert!(done.fail("late").is_err());
        assert!(done.succeed(json!(2)).is_err());
        assert_eq!(done.result(), Some(&json!(1)));

        let mut running = Task::new("t3", "Math");
        running.start().unwrap();
        assert!(running.start().is_err());
    }

    #[test]
    fn test_input_serde_shape() {
        let task: Task = serde_json::from_value(json!({
            "id": "t2",
            "capability": "Math",
            "description": "add",
            "inputs": [{"literal": "30 + 6 + t1"}, {"ref": "t1"}],
            "status": "Pending",
            "result": null,
            "error": null
        }))
        .unwrap();

        assert_eq!(task.inputs[0], TaskInput::literal("30 + 6 + t1"));
        assert_eq!(task.references().collect::<Vec<_>>(), vec!["t1"]);
    }
}
