//! HTTP + SSE transport.
//!
//! Route handlers build on `axum`, with a thin `Emitter` adapter
//! (`SseEmitter`) that frames each agent chunk as a named SSE event and
//! pushes it down an unbounded channel fanned out over HTTP.

use crate::gateway::agent::Agent;
use crate::gateway::agents::orchestrator::Orchestrator;
use crate::gateway::cancellation::RequestContext;
use crate::gateway::config::EnvironmentConfig;
use crate::gateway::emitter::{Emitter, ReferenceLink};
use crate::gateway::registry::AgentRegistry;
use crate::gateway::request::{AgentRequest, AgentRequestBody};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::{Extension, Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tokio::sync::mpsc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;

const READ_TIMEOUT: Duration = Duration::from_secs(15);
const WRITE_TIMEOUT: Duration = Duration::from_secs(120);
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub registry: Arc<AgentRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .route("/agent", post(dispatch_orchestrator))
        .route("/agent/{id}", post(dispatch_agent))
        .route("/agents", get(list_agents))
        .route("/health", get(health))
        .layer(TimeoutLayer::new(WRITE_TIMEOUT))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(token_extraction_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), signature_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Attach `X-Request-ID` (reusing the caller's value if present, else a
/// fresh UUID) to the request extensions for downstream handlers and logs.
async fn request_id_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(request_id));
    next.run(req).await
}

#[derive(Clone)]
struct RequestId(String);

/// Read the caller's `X-GitHub-Token` into the request extensions, between
/// signature verification and the handler (§4.5 "Token extraction").
async fn token_extraction_middleware(mut req: Request<Body>, next: Next) -> Response {
    let token = req
        .headers()
        .get("X-GitHub-Token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    req.extensions_mut().insert(CallerToken(token));
    next.run(req).await
}

#[derive(Clone)]
struct CallerToken(Option<String>);

/// Bracket the handler call with a single structured log line carrying
/// `request_id`, the dispatched agent id where the route names one,
/// `intent` when the route is the orchestrator's, and `duration_ms`.
async fn logging_middleware(req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let agent_id = path.strip_prefix("/agent/").map(str::to_string);
    let intent = if path == "/agent" { Some("orchestrator") } else { None };
    let start = Instant::now();

    let response = next.run(req).await;

    log::info!(
        "request_id={} agent_id={} intent={} {} {} duration_ms={}",
        request_id,
        agent_id.as_deref().unwrap_or("-"),
        intent.unwrap_or("-"),
        method,
        path,
        start.elapsed().as_millis(),
    );
    response
}

/// `GET` is unconditionally allowed. For `POST`: dev/test with an empty
/// secret logs a warning and allows; prod with an empty secret is a 500;
/// otherwise the raw body must carry a valid `X-Hub-Signature-256` HMAC
/// (§4.5 "Signature verification").
async fn signature_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.method() == axum::http::Method::GET {
        return next.run(req).await;
    }

    let secret = match &state.config.webhook_secret {
        Some(s) if !s.is_empty() => s.clone(),
        _ => {
            if state.config.environment.is_prod() {
                return (StatusCode::INTERNAL_SERVER_ERROR, "webhook secret not configured").into_response();
            }
            log::warn!("accepting unsigned request: no webhook secret configured (dev mode)");
            return next.run(req).await;
        }
    };

    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, 10 * 1024 * 1024).await {
        Ok(b) => b,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    let signature = headers
        .get("X-Hub-Signature-256")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("sha256="));

    let valid = match signature {
        Some(sig_hex) => verify_signature(&secret, &bytes, sig_hex),
        None => false,
    };

    if !valid {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let rebuilt = Request::from_parts(parts, Body::from(bytes));
    next.run(rebuilt).await
}

fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    type HmacSha256 = Hmac<Sha256>;
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    let Ok(provided) = hex_decode(signature_hex) else {
        return false;
    };
    if provided.len() != expected.len() {
        return false;
    }
    bool::from(provided.as_slice().ct_eq(expected.as_slice()))
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ()> {
    if s.len() % 2 != 0 {
        return Err(());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
        .collect()
}

/// `Emitter` adapter that frames each call as a named SSE event matching
/// §4.5's event catalog, flushing after every frame by virtue of the
/// underlying channel send.
struct SseEmitter {
    tx: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl Emitter for SseEmitter {
    async fn message(&self, chunk: &str) {
        let payload = json!({
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": chunk}}]
        });
        let _ = self.tx.send(Event::default().event("copilot_message").json_data(payload).unwrap());
    }

    async fn references(&self, refs: Vec<ReferenceLink>) {
        let payload: Vec<_> = refs
            .into_iter()
            .map(|r| json!({"title": r.title, "url": r.url}))
            .collect();
        let _ = self.tx.send(Event::default().event("copilot_references").json_data(payload).unwrap());
    }

    async fn confirmation(&self, title: &str, message: &str) {
        let payload = json!({"title": title, "message": message});
        let _ = self.tx.send(Event::default().event("copilot_confirmation").json_data(payload).unwrap());
    }

    async fn done(&self) {
        let _ = self.tx.send(Event::default().event("copilot_done").json_data(json!({})).unwrap());
    }
}

/// A `futures_util::Stream` over the emitter's channel, handed to
/// `axum::response::sse::Sse`.
struct EventStream(mpsc::UnboundedReceiver<Event>);

impl futures_util::Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.poll_recv(cx).map(|opt| opt.map(Ok))
    }
}

async fn dispatch_orchestrator(
    State(state): State<Arc<AppState>>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    Json(body): Json<AgentRequestBody>,
) -> impl IntoResponse {
    let (tx, rx) = mpsc::unbounded_channel();
    let emitter = SseEmitter { tx };
    let request = AgentRequest::from_body(body, token);
    let orchestrator = state.orchestrator.clone();
    let ctx = RequestContext::new(uuid::Uuid::new_v4().to_string());

    tokio::spawn(async move {
        if let Err(e) = orchestrator.handle(&ctx, &request, &emitter).await {
            log::error!("orchestrator dispatch failed: {}", e);
            emitter.message(&format!("\n_Internal error: {}_\n", e)).await;
            emitter.done().await;
        }
    });

    Sse::new(EventStream(rx)).keep_alive(KeepAlive::new().interval(READ_TIMEOUT))
}

async fn dispatch_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Extension(CallerToken(token)): Extension<CallerToken>,
    Json(body): Json<AgentRequestBody>,
) -> impl IntoResponse {
    let Some(agent) = state.registry.get(&id) else {
        return (StatusCode::NOT_FOUND, format!("Agent '{}' is not registered.", id)).into_response();
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let emitter = SseEmitter { tx };
    let needs_iac = agent.capabilities().needs_iac_input;
    let mut request = AgentRequest::from_body(body, token);
    if needs_iac {
        request = request.with_parsed_iac();
    }
    let ctx = RequestContext::new(uuid::Uuid::new_v4().to_string());

    tokio::spawn(async move {
        if let Err(e) = agent.handle(&ctx, &request, &emitter).await {
            emitter.message(&format!("\n_Agent `{}` failed: {}_\n", id, e)).await;
        }
        emitter.done().await;
    });

    Sse::new(EventStream(rx)).keep_alive(KeepAlive::new().interval(READ_TIMEOUT)).into_response()
}

async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.registry.list_capabilities())
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "iacgate",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment.as_str(),
        "agents": state.registry.len(),
    }))
}

/// Run the HTTP server until SIGINT/SIGTERM, draining in-flight handlers
/// for up to [`SHUTDOWN_DRAIN`] before exiting (§4.5 "Timeouts & shutdown").
pub async fn serve(state: AppState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let port = state.config.port;
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("iacgate listening on 0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sig = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sig.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("shutdown signal received, draining in-flight requests for up to {:?}", SHUTDOWN_DRAIN);
    tokio::time::sleep(SHUTDOWN_DRAIN).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_a_known_hmac_vector() {
        let body = b"{\"hello\":\"world\"}";
        type HmacSha256 = Hmac<Sha256>;
        let mut mac = HmacSha256::new_from_slice(b"topsecret").unwrap();
        mac.update(body);
        let expected = mac.finalize().into_bytes();
        let hex: String = expected.iter().map(|b| format!("{:02x}", b)).collect();

        assert!(verify_signature("topsecret", body, &hex));
        assert!(!verify_signature("wrongsecret", body, &hex));
    }

    #[test]
    fn hex_decode_rejects_odd_length() {
        assert!(hex_decode("abc").is_err());
    }
}
