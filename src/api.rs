//! REST API server for the research assistant
//!
//! Each client opens a session, then asks questions against it. Sessions keep
//! their own history; a failed turn answers with an apology and the session
//! carries on.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::AssistantError;
use crate::session::{SessionManager, APOLOGY};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryRequest {
    pub query: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiReply = (StatusCode, Json<ApiResponse>);

fn not_found(id: Uuid) -> ApiReply {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(format!("Session {} not found", id))),
    )
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub sessions: Arc<SessionManager>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(State(state): State<ApiState>) -> ApiReply {
    let id = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(ApiResponse::success(serde_json::json!({ "session_id": id }))),
    )
}

async fn ask(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<QueryRequest>,
) -> ApiReply {
    let Ok(session) = state.sessions.get(id).await else {
        return not_found(id);
    };

    info!(session_id = %id, query = %req.query, "Received query");

    let mut session = session.lock().await;
    match session.ask(&req.query).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "answer": outcome.answer,
                "rounds": outcome.rounds,
                "degraded": outcome.degraded,
                "strategy": outcome.strategy.to_string(),
                "invocations": outcome.invocations.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            }))),
        ),
        Err(AssistantError::Session(message)) => {
            (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message)))
        }
        Err(e) => {
            error!(session_id = %id, error = %e, "Error processing query");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(APOLOGY)))
        }
    }
}

async fn history(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    let Ok(session) = state.sessions.get(id).await else {
        return not_found(id);
    };

    let session = session.lock().await;
    (StatusCode::OK, Json(ApiResponse::success(session.state().messages())))
}

async fn turns(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    if state.sessions.get(id).await.is_err() {
        return not_found(id);
    }

    match state.sessions.audit().list_for_session(id).await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::success(records))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

async fn close_session(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    if state.sessions.remove(id).await {
        (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "session_id": id }))),
        )
    } else {
        not_found(id)
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(sessions: Arc<SessionManager>) -> Router {
    let state = ApiState { sessions };

    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", axum::routing::delete(close_session))
        .route("/api/sessions/:id/query", post(ask))
        .route("/api/sessions/:id/history", get(history))
        .route("/api/sessions/:id/turns", get(turns))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    sessions: Arc<SessionManager>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(sessions);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
