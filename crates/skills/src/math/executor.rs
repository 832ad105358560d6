use async_trait::async_trait;
use serde_json::Value;

use reasoner_core::{Capability, Context, Error, Executor, Result, Task, TaskInput};

use super::{eval, parse, Bindings, MathValue};

/// Runs `Math` tasks through the expression evaluator.
///
/// The first literal string input is the expression. Every `ref` input binds
/// a variable of the same name, and a literal JSON object binds each of its
/// keys. Identifiers still unbound after that are looked up in the context.
#[derive(Debug, Default)]
pub struct MathExecutor;

impl MathExecutor {
    pub fn new() -> Self {
        Self
    }

    fn bindings(task: &Task, context: &Context) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        for input in &task.inputs {
            match input {
                TaskInput::Ref(name) => {
                    let value = context.resolve(input)?;
                    bindings.insert(name.clone(), MathValue::from_json(&value));
                }
                TaskInput::Literal(Value::Object(map)) => {
                    for (key, value) in map {
                        bindings.insert(key.clone(), MathValue::from_json(value));
                    }
                }
                TaskInput::Literal(_) => {}
            }
        }
        Ok(bindings)
    }
}

#[async_trait]
impl Executor for MathExecutor {
    fn capability(&self) -> Capability {
        Capability::Math
    }

    async fn invoke(&self, _query: &str, task: &mut Task, context: &Context) -> Result<()> {
        let expression = task
            .inputs
            .iter()
            .find_map(|input| match input {
                TaskInput::Literal(Value::String(s)) => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(|| Error::syntax(0, format!("task '{}' has no expression", task.id)))?;

        let expr = parse(&expression)?;
        let mut bindings = Self::bindings(task, context)?;
        for name in expr.variables() {
            if !bindings.contains_key(name) {
                if let Some(value) = context.binding(name) {
                    bindings.insert(name.to_string(), MathValue::from_json(value));
                }
            }
        }

        let value = eval(&expr, &bindings)?;
        tracing::debug!(task_id = %task.id, expression = %expression, "Math expression evaluated");
        task.succeed(value.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running(task: Task) -> Task {
        let mut task = task;
        task.start().unwrap();
        task
    }

    #[tokio::test]
    async fn test_ref_inputs_bind_variables() {
        let mut ctx = Context::new();
        ctx.bind("t1", json!(["x", "y", "z", "w", "v"]));

        let mut task = running(
            Task::new("t2", "Math")
                .with_input(TaskInput::literal("count(t1) + 100"))
                .with_input(TaskInput::reference("t1")),
        );

        MathExecutor::new().invoke("q", &mut task, &ctx).await.unwrap();
        assert_eq!(task.result(), Some(&json!(105)));
    }

    #[tokio::test]
    async fn test_object_literal_and_context_fallback() {
        let mut ctx = Context::new();
        ctx.bind("X", json!(4));

        let mut task = running(
            Task::new("t2", "Math")
                .with_input(TaskInput::literal("30 + 6 + X + bonus"))
                .with_input(TaskInput::literal(json!({"bonus": 0.5}))),
        );

        MathExecutor::new().invoke("q", &mut task, &ctx).await.unwrap();
        assert_eq!(task.result(), Some(&json!(40.5)));
    }

    #[tokio::test]
    async fn test_missing_expression_and_eval_errors() {
        let ctx = Context::new();

        let mut no_expr = running(Task::new("t1", "Math").with_input(TaskInput::literal(3)));
        assert!(MathExecutor::new().invoke("q", &mut no_expr, &ctx).await.is_err());

        let mut unbound = running(Task::new("t2", "Math").with_input(TaskInput::literal("Y * 2")));
        assert!(matches!(
            MathExecutor::new().invoke("q", &mut unbound, &ctx).await,
            Err(Error::UnboundVariable(_))
        ));
        assert!(unbound.result().is_none());
    }
}
