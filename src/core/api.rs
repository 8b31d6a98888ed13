//! HTTP + WebSocket wrapper around per-session runtimes
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /codex/validate - Validation report for the loaded codex
//! - POST /session/new - Create session (optional handshake overrides)
//! - GET /session/{id} - Current handshake header
//! - DELETE /session/{id} - Drop a session and close its telemetry stream
//! - POST /session/{id}/handshake - Apply a partial handshake update
//! - POST /session/{id}/evaluate - Run every decision for one response
//! - WS /ws/{id} - Live telemetry events

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::core::{anchor_required, validate, CodexRuntime, TelemetryEmitter};
use crate::types::{
    CodexDocument, DecayCounters, DecayStatus, FailureKind, FailureOutcome, FailureText,
    Handshake, HandshakeNormalization, HandshakeOverrides, HandshakePatch, ReflexReport,
    TelemetryEvent, ValidationReport,
};

/// Session state
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub runtime: CodexRuntime,
    pub events: broadcast::Sender<TelemetryEvent>,
}

/// App state
pub struct AppState {
    pub codex: Arc<CodexDocument>,
    pub report: ValidationReport,
    pub sessions: RwLock<HashMap<String, Session>>,
    next_session: AtomicU64,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    #[serde(default)]
    pub overrides: Option<HandshakeOverrides>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub handshake: Handshake,
    pub websocket_url: String,
}

/// Evaluate request: everything the caller measured for one response
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub confidence: f64,
    #[serde(default)]
    pub external_claim: bool,
    /// Reflex id → externally computed score
    #[serde(default)]
    pub scores: HashMap<String, f64>,
    #[serde(default)]
    pub turns_since_recap: u32,
    #[serde(default)]
    pub tokens_since_recap: u64,
    /// Input was ambiguous; ask for clarification
    #[serde(default)]
    pub ambiguous: bool,
    /// Raw user text, forwarded to telemetry (redactable)
    #[serde(default)]
    pub user_text: Option<String>,
}

/// Evaluate response
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub handshake: Handshake,
    pub cite: bool,
    pub anchor_required: bool,
    pub omission_scan: bool,
    pub meets_confidence: bool,
    pub reflexes: ReflexReport,
    pub blocked: bool,
    pub decay: DecayStatus,
    pub outcome: FailureOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureText>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub codex_version: String,
    pub codex_fingerprint: String,
    pub codex_valid: bool,
    pub sessions_active: usize,
}

/// Create the API router
pub fn create_router(codex: Arc<CodexDocument>) -> Router {
    let report = validate(&codex);
    let state = Arc::new(AppState {
        codex,
        report,
        sessions: RwLock::new(HashMap::new()),
        next_session: AtomicU64::new(1),
    });

    Router::new()
        .route("/health", get(health))
        .route("/codex/validate", get(codex_validate))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(delete_session))
        .route("/session/:id/handshake", post(update_handshake))
        .route("/session/:id/evaluate", post(evaluate))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        codex_version: state.codex.version.clone(),
        codex_fingerprint: state.codex.fingerprint(),
        codex_valid: state.report.ok,
        sessions_active: sessions.len(),
    })
}

/// Validation report of the loaded codex
async fn codex_validate(State(state): State<Arc<AppState>>) -> Json<ValidationReport> {
    Json(state.report.clone())
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<NewSessionRequest>>,
) -> Result<Json<NewSessionResponse>, StatusCode> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let session_id = generate_session_id(&state.next_session);
    let (tx, _) = broadcast::channel(100);

    let overrides = req.overrides.unwrap_or_default();
    let emitter = TelemetryEmitter::new(Arc::clone(&state.codex)).with_broadcast(tx.clone());
    let runtime = CodexRuntime::with_overrides(Arc::clone(&state.codex), &overrides)
        .with_telemetry(emitter);
    let handshake = runtime.handshake().clone();

    let session = Session {
        id: session_id.clone(),
        runtime,
        events: tx,
    };

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), session);
    tracing::info!(session = %session_id, handshake = %handshake.to_parseable_string(), "session created");

    Ok(Json(NewSessionResponse {
        session_id: session_id.clone(),
        handshake,
        websocket_url: format!("/ws/{}", session_id),
    }))
}

/// Get current handshake header
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Handshake>, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session.runtime.handshake().clone()))
}

/// Drop a session. Open WebSocket listeners end once the sender is gone.
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    let mut sessions = state.sessions.write().await;
    match sessions.remove(&id) {
        Some(_) => {
            tracing::info!(session = %id, "session closed");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Apply a partial handshake update
async fn update_handshake(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<HandshakePatch>,
) -> Result<Json<HandshakeNormalization>, StatusCode> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session.runtime.set_handshake(&patch)))
}

/// Run every decision for one response
async fn evaluate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rt = &session.runtime;

    let counters = DecayCounters::new(req.turns_since_recap, req.tokens_since_recap);
    let reflexes = rt.schedule_reflexes(&req.scores);
    let outcome = rt.classify(req.confidence);

    let failure = if req.ambiguous {
        Some(rt.failure_text(FailureKind::AskClarify))
    } else {
        outcome.kind().map(|kind| rt.failure_text(kind))
    };

    let response = EvaluateResponse {
        handshake: rt.handshake().clone(),
        cite: rt.decide_citation(req.confidence, req.external_claim),
        anchor_required: anchor_required(rt.codex()),
        omission_scan: rt.should_run_omission_scan(),
        meets_confidence: rt.meets_confidence(req.confidence),
        blocked: reflexes.blocked(),
        reflexes,
        decay: rt.decay_status(&counters),
        outcome,
        failure,
    };

    rt.emit(
        "response.evaluated",
        json!({
            "session": session.id,
            "confidence": req.confidence,
            "outcome": response.outcome,
            "cite": response.cite,
            "blocked": response.blocked,
            "triggered": response.reflexes.triggered(),
            "context_expired": response.decay.expired,
            "user_text": req.user_text,
        }),
    );

    Ok(Json(response))
}

/// WebSocket handler for live telemetry
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rx = session.events.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Handle WebSocket connection
async fn handle_websocket(mut socket: WebSocket, mut rx: broadcast::Receiver<TelemetryEvent>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "telemetry listener lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        if socket.send(Message::Text(json)).await.is_err() {
            break;
        }
    }
}

/// Generate session ID
fn generate_session_id(counter: &AtomicU64) -> String {
    let seq = counter.fetch_add(1, Ordering::Relaxed);
    format!("session_{:x}_{}", Utc::now().timestamp_millis(), seq)
}

/// Run the API server
pub async fn run_server(addr: &str, codex: Arc<CodexDocument>) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(codex);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr, "codex runtime API listening");
    println!("Codex runtime API running on {}", addr);
    println!("  GET  /health                - Health check");
    println!("  GET  /codex/validate        - Codex validation report");
    println!("  POST /session/new           - Create session");
    println!("  GET  /session/:id           - Current handshake");
    println!("  DELETE /session/:id         - Close session");
    println!("  POST /session/:id/handshake - Update handshake");
    println!("  POST /session/:id/evaluate  - Evaluate a response");
    println!("  WS   /ws/:id                - Live telemetry");
    axum::serve(listener, router).await?;
    Ok(())
}
