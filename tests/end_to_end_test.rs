//! Full pipeline: HTTP submit, LLM planning, executors, memory and polling.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use reasoner_controller::ReflectionControllerBuilder;
use reasoner_core::{
    config::{AppConfig, ControllerConfig},
    Capability, ChatMessage, LlmClient, LlmResponse, LlmUsage, Result, RetryPolicy,
};
use reasoner_gateway::{GatewayServer, ReasonerService};
use reasoner_skills::{
    DeduceExecutor, ExecutorRegistry, MathExecutor, OutputExecutor, RetrievalExecutor,
};
use reasoner_store::{Document, InMemoryRetriever};

const PLAN: &str = r#"```json
{"tasks": [
  {"id": "t1", "capability": "Retrieval", "description": "What is X?"},
  {"id": "t2", "capability": "Deduce", "description": "Value of X", "inputs": [{"ref": "t1"}]},
  {"id": "t3", "capability": "Math", "inputs": [{"literal": "30 + 6 + t2"}, {"ref": "t2"}]},
  {"id": "t4", "capability": "Output", "inputs": [{"ref": "t3"}]}
]}
```"#;

/// Answers each kind of prompt with a canned reply.
struct PromptRouter {
    plan: String,
    prompts: Mutex<Vec<String>>,
}

impl PromptRouter {
    fn new(plan: &str) -> Self {
        Self {
            plan: plan.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn count(&self, prefix: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl LlmClient for PromptRouter {
    async fn complete(&self, prompt: &str) -> Result<LlmResponse> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let content = if prompt.starts_with("Break the instruction") {
            self.plan.clone()
        } else if prompt.starts_with("Deduce") {
            "4".to_string()
        } else if prompt.starts_with("Decide whether") {
            r#"{"finished": false, "next_instruction": "Find X first"}"#.to_string()
        } else if prompt.starts_with("Answer the question") {
            "I could not work it out".to_string()
        } else {
            "NONE".to_string()
        };
        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage::default(),
        })
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.complete(&last).await
    }
}

fn app(llm: Arc<PromptRouter>) -> GatewayServer {
    let config = AppConfig::default();
    let retry = RetryPolicy::no_retry();
    let retriever = Arc::new(InMemoryRetriever::with_documents([
        Document {
            id: "d1".into(),
            content: "X equals 4".into(),
        },
        Document {
            id: "d2".into(),
            content: "Paris is in France".into(),
        },
    ]));

    let registry = Arc::new(
        ExecutorRegistry::builder()
            .with_executor(Arc::new(RetrievalExecutor::new(retriever, 2).with_retry(retry)))
            .with_executor(Arc::new(DeduceExecutor::new(llm.clone()).with_retry(retry)))
            .with_executor(Arc::new(MathExecutor::new()))
            .with_executor(Arc::new(OutputExecutor::new()))
            .require(Capability::ALL)
            .build()
            .unwrap(),
    );
    let controller = ReflectionControllerBuilder::new()
        .with_llm(llm)
        .with_registry(registry)
        .with_config(config.controller.clone())
        .with_retry(retry)
        .build()
        .unwrap();

    let service = Arc::new(ReasonerService::new(Arc::new(controller), &config.service));
    GatewayServer::new(config.server, service).with_tracing(false)
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn submit_and_wait(server: &GatewayServer, body: Value) -> Value {
    let (status, accepted) = call(
        server.build_router(),
        Request::builder()
            .method("POST")
            .uri("/v1/tasks")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let uri = format!("/v1/tasks/{}", accepted["task_id"].as_str().unwrap());
    for _ in 0..200 {
        let (_, run) = call(
            server.build_router(),
            Request::builder().uri(&uri).body(Body::empty()).unwrap(),
        )
        .await;
        if run["status"] == "completed" || run["status"] == "failed" {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run did not finish");
}

#[tokio::test]
async fn test_query_answered_in_one_iteration() {
    let llm = Arc::new(PromptRouter::new(PLAN));
    let server = app(llm.clone());

    let run = submit_and_wait(&server, json!({"query": "What is 30+6+X?"})).await;

    assert_eq!(run["status"], "completed");
    assert_eq!(run["result"]["answer"], "40");
    assert_eq!(run["result"]["iterations"], 1);
    assert_eq!(run["result"]["finish_reason"], "solved");

    assert_eq!(llm.count("Break the instruction"), 1);
    assert_eq!(llm.count("Deduce"), 1);
    // A solved run needs neither reflection nor generation by the model.
    assert_eq!(llm.count("Decide whether"), 0);
    assert_eq!(llm.count("Answer the question"), 0);
}

#[tokio::test]
async fn test_unparseable_plans_exhaust_budget() {
    let llm = Arc::new(PromptRouter::new("I would rather not plan"));
    let server = app(llm.clone());

    let config = ControllerConfig {
        max_reflect_time: 2,
        ..ControllerConfig::default()
    };
    let run = submit_and_wait(
        &server,
        json!({"query": "What is 30+6+X?", "config": config}),
    )
    .await;

    assert_eq!(run["status"], "completed");
    assert_eq!(run["result"]["iterations"], 2);
    assert_eq!(run["result"]["finish_reason"], "budget_exhausted");
    assert_eq!(run["result"]["answer"], "I could not work it out");

    assert_eq!(llm.count("Break the instruction"), 2);
    assert_eq!(llm.count("Decide whether"), 2);
    assert_eq!(llm.count("Deduce"), 0);
    // The second plan request follows the reflector's instruction.
    let prompts = llm.prompts.lock().unwrap().clone();
    let plans: Vec<&String> = prompts
        .iter()
        .filter(|p| p.starts_with("Break the instruction"))
        .collect();
    assert!(plans[1].ends_with("Instruction: Find X first"));
}
