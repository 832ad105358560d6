//! Strict parser for planner output.
//!
//! Accepts a JSON object, optionally wrapped in a single markdown code fence:
//!
//! ```text
//! {"tasks": [{"id": "t1", "capability": "Retrieval", "description": "...", "inputs": [...]}]}
//! ```
//!
//! Every failure is reported as [`Error::PlanParse`].

use serde::Deserialize;
use std::collections::HashSet;

use reasoner_core::{Error, Result, Task, TaskInput};

use crate::dag::plan_waves;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPlan {
    tasks: Vec<RawTask>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTask {
    id: String,
    capability: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    inputs: Vec<RawInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
enum RawInput {
    Literal(serde_json::Value),
    Ref(String),
}

/// Parser for planner replies.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanParser;

impl PlanParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a planner reply into pending tasks.
    pub fn parse(&self, response: &str) -> Result<Vec<Task>> {
        let body = strip_code_fence(response.trim())?;
        let raw: RawPlan = serde_json::from_str(body)
            .map_err(|e| Error::plan_parse(format!("invalid plan JSON: {}", e)))?;

        if raw.tasks.is_empty() {
            return Err(Error::plan_parse("plan contains no tasks"));
        }

        let mut ids = HashSet::new();
        let mut tasks = Vec::with_capacity(raw.tasks.len());
        for raw_task in raw.tasks {
            let id = raw_task.id.trim().to_string();
            if id.is_empty() {
                return Err(Error::plan_parse("task id must not be empty"));
            }
            if !ids.insert(id.clone()) {
                return Err(Error::plan_parse(format!("duplicate task id '{}'", id)));
            }
            if raw_task.capability.trim().is_empty() {
                return Err(Error::plan_parse(format!("task '{}' has no capability", id)));
            }

            let inputs: Vec<TaskInput> = raw_task
                .inputs
                .into_iter()
                .map(|input| match input {
                    RawInput::Literal(value) => TaskInput::Literal(value),
                    RawInput::Ref(name) => TaskInput::Ref(name),
                })
                .collect();
            if inputs.iter().any(|i| i.as_ref_name() == Some(id.as_str())) {
                return Err(Error::plan_parse(format!("task '{}' references itself", id)));
            }

            tasks.push(
                Task::new(id, raw_task.capability.trim())
                    .with_description(raw_task.description)
                    .with_inputs(inputs),
            );
        }

        plan_waves(&tasks).map_err(|e| Error::plan_parse(e.to_string()))?;
        Ok(tasks)
    }
}

/// Remove one surrounding ```` ``` ```` fence, with or without a language tag.
fn strip_code_fence(text: &str) -> Result<&str> {
    let Some(rest) = text.strip_prefix("```") else {
        return Ok(text);
    };
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
    let body = rest[body_start..]
        .trim_end()
        .strip_suffix("```")
        .ok_or_else(|| Error::plan_parse("unterminated code fence"))?;
    if body.contains("```") {
        return Err(Error::plan_parse("more than one code fence"));
    }
    Ok(body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PLAN: &str = r#"{"tasks": [
        {"id": "t1", "capability": "Retrieval", "description": "Find X", "inputs": []},
        {"id": "t2", "capability": "Math", "description": "Add", "inputs": [{"literal": "30 + 6 + t1"}, {"ref": "t1"}]},
        {"id": "t3", "capability": "Output", "description": "Answer", "inputs": [{"ref": "t2"}]}
    ]}"#;

    fn assert_plan_parse(input: &str) {
        assert!(
            matches!(PlanParser::new().parse(input), Err(Error::PlanParse(_))),
            "expected PlanParse for {}",
            input
        );
    }

    #[test]
    fn test_parse_plain_json() {
        let tasks = PlanParser::new().parse(PLAN).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].capability, "Math");
        assert_eq!(tasks[1].inputs[0], TaskInput::literal(json!("30 + 6 + t1")));
        assert_eq!(tasks[2].inputs[0], TaskInput::reference("t2"));
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", PLAN);
        assert_eq!(PlanParser::new().parse(&fenced).unwrap().len(), 3);

        let bare_fence = format!("```\n{}\n```\n", PLAN);
        assert_eq!(PlanParser::new().parse(&bare_fence).unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_malformed_plans() {
        assert_plan_parse("not json");
        assert_plan_parse(r#"{"tasks": []}"#);
        assert_plan_parse(r#"{"tasks": [{"id": "t1", "capability": "Math", "extra": 1}]}"#);
        assert_plan_parse(r#"{"tasks": [], "notes": "x"}"#);
        assert_plan_parse(r#"{"tasks": [{"id": " ", "capability": "Math"}]}"#);
        assert_plan_parse(
            r#"{"tasks": [{"id": "a", "capability": "Math"}, {"id": "a", "capability": "Output"}]}"#,
        );
        assert_plan_parse(
            r#"{"tasks": [{"id": "a", "capability": "Math", "inputs": [{"ref": "a"}]}]}"#,
        );
        assert_plan_parse(
            r#"{"tasks": [
                {"id": "a", "capability": "Math", "inputs": [{"ref": "b"}]},
                {"id": "b", "capability": "Math", "inputs": [{"ref": "a"}]}
            ]}"#,
        );
        assert_plan_parse(r#"{"tasks": [{"id": "a", "capability": "Math", "inputs": [{"var": "x"}]}]}"#);
        assert_plan_parse("```json\n{\"tasks\": []}");
        assert_plan_parse("```json\n{}\n```\n```json\n{}\n```");
    }

    #[test]
    fn test_unknown_capability_is_not_a_parse_error() {
        let tasks = PlanParser::new()
            .parse(r#"{"tasks": [{"id": "a", "capability": "Teleport"}]}"#)
            .unwrap();
        assert_eq!(tasks[0].capability, "Teleport");
    }
}
