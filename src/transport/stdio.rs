//! JSON-RPC 2.0 over stdio (§4.6).
//!
//! Line-delimited: one JSON object per line in, one per line out. Shares
//! the same `Emitter` contract as the HTTP transport — chunks become
//! `notifications/progress` notifications instead of SSE frames.

use crate::gateway::agent::Agent;
use crate::gateway::agents::orchestrator::Orchestrator;
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::{Emitter, ReferenceLink};
use crate::gateway::registry::AgentRegistry;
use crate::gateway::request::{AgentRequest, AgentRequestBody};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

pub struct StdioHost {
    pub registry: Arc<AgentRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

/// `Emitter` adapter that turns each chunk into a `notifications/progress`
/// line on stdout, tagged with the originating request id.
struct NotifyEmitter {
    request_id: Value,
    stdout: Arc<Mutex<tokio::io::Stdout>>,
}

impl NotifyEmitter {
    async fn write_notification(&self, method: &str, params: Value) {
        let line = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        write_line(&self.stdout, &line).await;
    }
}

#[async_trait]
impl Emitter for NotifyEmitter {
    async fn message(&self, chunk: &str) {
        self.write_notification(
            "notifications/progress",
            json!({"requestId": self.request_id, "content": chunk}),
        )
        .await;
    }

    async fn references(&self, refs: Vec<ReferenceLink>) {
        let payload: Vec<_> = refs.into_iter().map(|r| json!({"title": r.title, "url": r.url})).collect();
        self.write_notification(
            "notifications/references",
            json!({"requestId": self.request_id, "references": payload}),
        )
        .await;
    }

    async fn confirmation(&self, title: &str, message: &str) {
        self.write_notification(
            "notifications/confirmation",
            json!({"requestId": self.request_id, "title": title, "message": message}),
        )
        .await;
    }

    async fn done(&self) {
        self.write_notification("notifications/done", json!({"requestId": self.request_id}))
            .await;
    }
}

async fn write_line(stdout: &Arc<Mutex<tokio::io::Stdout>>, value: &Value) {
    let mut out = stdout.lock().await;
    let mut line = serde_json::to_vec(value).unwrap_or_default();
    line.push(b'\n');
    let _ = out.write_all(&line).await;
    let _ = out.flush().await;
}

impl StdioHost {
    pub fn new(registry: Arc<AgentRegistry>, orchestrator: Arc<Orchestrator>) -> Self {
        Self { registry, orchestrator }
    }

    /// Read one JSON-RPC request per line from `stdin` until it closes,
    /// dispatching each to `handle_request`. Closing stdin is this
    /// transport's cancellation signal (§4.6).
    pub async fn run(self) {
        let stdin = tokio::io::stdin();
        let stdout = Arc::new(Mutex::new(tokio::io::stdout()));
        let mut lines = BufReader::new(stdin).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let request: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(_) => {
                    write_line(
                        &stdout,
                        &json!({"jsonrpc": "2.0", "id": Value::Null, "error": {"code": -32700, "message": "parse error"}}),
                    )
                    .await;
                    continue;
                }
            };

            self.handle_request(request, stdout.clone()).await;
        }
    }

    async fn handle_request(&self, request: Value, stdout: Arc<Mutex<tokio::io::Stdout>>) {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");

        let result = match method {
            "initialize" => Ok(json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "iacgate", "version": env!("CARGO_PKG_VERSION")},
            })),
            "tools/list" => Ok(json!({
                "tools": self.registry.list_capabilities().iter().map(|c| json!({
                    "name": c.id,
                    "description": c.description,
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "messages": {"type": "array"},
                            "token": {"type": "string", "description": "Caller's GitHub token, for downstream LLM calls."},
                        },
                        "required": ["messages"],
                    },
                })).collect::<Vec<_>>(),
            })),
            "tools/call" => self.handle_tool_call(&request, id.clone(), stdout.clone()).await,
            other => Err((-32601, format!("method not found: {}", other))),
        };

        match result {
            Ok(value) => write_line(&stdout, &json!({"jsonrpc": "2.0", "id": id, "result": value})).await,
            Err((code, message)) => {
                write_line(
                    &stdout,
                    &json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}}),
                )
                .await
            }
        }
    }

    async fn handle_tool_call(
        &self,
        request: &Value,
        id: Value,
        stdout: Arc<Mutex<tokio::io::Stdout>>,
    ) -> Result<Value, (i64, String)> {
        let params = request.get("params").cloned().unwrap_or(Value::Null);
        let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let token = arguments.get("token").and_then(Value::as_str).map(str::to_string);
        let body: AgentRequestBody = serde_json::from_value(arguments)
            .map_err(|e| (-32602, format!("invalid arguments: {}", e)))?;
        let agent_request = AgentRequest::from_body(body, token);
        let emitter = NotifyEmitter { request_id: id, stdout };
        let ctx = RequestContext::new(uuid::Uuid::new_v4().to_string());

        if tool_name == "orchestrator" || tool_name.is_empty() {
            self.orchestrator
                .handle(&ctx, &agent_request, &emitter)
                .await
                .map_err(|e| (-32000, e.to_string()))?;
        } else {
            let agent = self
                .registry
                .get(tool_name)
                .ok_or_else(|| (-32602, format!("Agent '{}' is not registered.", tool_name)))?;
            let request = if agent.capabilities().needs_iac_input {
                agent_request.with_parsed_iac()
            } else {
                agent_request
            };
            agent
                .handle(&ctx, &request, &emitter)
                .await
                .map_err(|e| (-32000, e.to_string()))?;
            emitter.done().await;
        }

        Ok(json!({"content": [{"type": "text", "text": "done"}]}))
    }
}
