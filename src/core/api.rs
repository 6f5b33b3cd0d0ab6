//! HTTP + WebSocket API for facestate
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /session/new - Create session (optional engine config)
//! - GET /session/{id} - Session status
//! - POST /session/{id}/frame - Ingest one frame (candidate or detections)
//! - GET /session/{id}/report - Report so far
//! - DELETE /session/{id} - End session, return (and optionally save) report
//! - WS /ws/{id} - Live per-frame outputs
//!
//! Each session's engine sits behind the sessions write lock, so frames for a
//! session are ingested one at a time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::core::{save_report, EngineConfig, PriorityClassifier, ReportBuilder, SignalClassifier, StabilityEngine};
use crate::types::{
    Candidate, CounterValue, ExpressionTag, FrameDetections, ReasonCode, SessionReport, StateOutput,
};
use crate::StabilityError;

/// Live updates buffered per session before slow listeners lag
const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Session state
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub engine: StabilityEngine,
    pub classifier: PriorityClassifier,
    pub report: ReportBuilder,
    pub update_tx: broadcast::Sender<StateOutput>,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    /// Where ended sessions' reports are written, if anywhere
    pub report_dir: Option<String>,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    pub config: Option<EngineConfig>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
    pub state: ExpressionTag,
}

/// One frame: exactly one of `candidate` (tag or `null`) or `detections`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameRequest {
    #[serde(default)]
    pub detections: Option<FrameDetections>,
    /// Absent → `None`; explicit `null` → `Some(NoSignal)`
    #[serde(default, deserialize_with = "present")]
    pub candidate: Option<Candidate>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Candidate>, D::Error> {
    Candidate::deserialize(deserializer).map(Some)
}

impl FrameRequest {
    fn into_candidate(self, classifier: &PriorityClassifier) -> Result<Candidate, ApiError> {
        match (self.detections, self.candidate) {
            (Some(detections), None) => Ok(classifier.classify(&detections)),
            (None, Some(candidate)) => Ok(candidate),
            _ => Err(ApiError::unprocessable(
                "frame needs exactly one of 'candidate' or 'detections'",
            )),
        }
    }
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub state: ExpressionTag,
    pub frames: u64,
    pub no_signal_frames: u64,
    /// Reason reported for the last frame
    pub reason: ReasonCode,
    pub counters: Vec<CounterValue>,
    pub priority: Vec<ExpressionTag>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Ended session response
#[derive(Debug, Serialize)]
pub struct EndSessionResponse {
    pub report: SessionReport,
    pub saved_to: Option<String>,
}

/// Error body: `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", what),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<StabilityError> for ApiError {
    fn from(e: StabilityError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Create the API router
pub fn create_router(report_dir: Option<String>) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        report_dir,
    });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(end_session))
        .route("/session/:id/frame", post(add_frame))
        .route("/session/:id/report", get(get_report))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<NewSessionResponse>, ApiError> {
    let req: NewSessionRequest = if body.is_empty() {
        NewSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(StabilityError::from)?
    };
    let engine = StabilityEngine::new(req.config.unwrap_or_default())?;
    let session_id = generate_session_id();
    let (tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

    let session = Session {
        id: session_id.clone(),
        report: ReportBuilder::new(engine.state().clone()),
        classifier: PriorityClassifier::new(),
        update_tx: tx,
        engine,
    };
    let initial = session.engine.state().clone();

    state.sessions.write().await.insert(session_id.clone(), session);
    info!(session = %session_id, "session created");

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
        state: initial,
    }))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| ApiError::not_found("session"))?;
    let output = session.engine.current_output();

    Ok(Json(SessionStatusResponse {
        session_id: session.id.clone(),
        state: output.state,
        frames: session.engine.frame_count(),
        no_signal_frames: session.engine.no_signal_count(),
        reason: output.reason,
        counters: output.counters,
        priority: session.engine.config().priority.clone(),
    }))
}

/// Ingest one frame
async fn add_frame(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<FrameRequest>, JsonRejection>,
) -> Result<Json<StateOutput>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| ApiError::not_found("session"))?;

    let Json(req) = payload?;
    let candidate = req.into_candidate(&session.classifier)?;

    let output = session.engine.update(&candidate)?;
    session.report.record(&output);

    // No subscribers is not an error
    let _ = session.update_tx.send(output.clone());

    Ok(Json(output))
}

/// Report so far
async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionReport>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| ApiError::not_found("session"))?;
    Ok(Json(session.report.finish()))
}

/// End session
async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EndSessionResponse>, ApiError> {
    let session = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| ApiError::not_found("session"))?;

    let report = session.report.finish();
    let saved_to = match &state.report_dir {
        Some(dir) => Some(save_report(&report, dir)?),
        None => None,
    };
    info!(session = %id, frames = report.frames, "session ended");

    Ok(Json(EndSessionResponse { report, saved_to }))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| ApiError::not_found("session"))?;
    let rx = session.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, rx)))
}

/// Forward outputs until the session ends or the client goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<StateOutput>) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(output) => {
                    let Some(message) = update_message(&output) else {
                        continue;
                    };
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket listener lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Text frame for one output; None (logged) if it cannot be serialized
fn update_message(output: &StateOutput) -> Option<Message> {
    match serde_json::to_string(output) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!(error = %e, frame = output.frame, "could not serialize output");
            None
        }
    }
}

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate session ID
fn generate_session_id() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("session_{:x}_{}", nanos as u64, seq)
}

/// Run the API server
pub async fn run_server(addr: &str, report_dir: Option<String>) -> crate::Result<()> {
    let router = create_router(report_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "facestate API listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_message_is_full_output() {
        let mut engine = StabilityEngine::with_defaults();
        let output = engine.update(&Candidate::tag("smile")).unwrap();

        match update_message(&output) {
            Some(Message::Text(text)) => {
                assert!(!text.is_empty());
                let value: serde_json::Value = serde_json::from_str(&text).unwrap();
                assert_eq!(value["frame"], 1);
                assert_eq!(value["candidate"], "smile");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_frame_request_needs_exactly_one_field() {
        let classifier = PriorityClassifier::new();
        let null: FrameRequest = serde_json::from_str(r#"{"candidate": null}"#).unwrap();
        assert_eq!(null.into_candidate(&classifier).unwrap(), Candidate::NoSignal);

        let empty: FrameRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(
            empty.into_candidate(&classifier).unwrap_err().status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert!(serde_json::from_str::<FrameRequest>(r#"{"candidat": "smile"}"#).is_err());
    }
}
