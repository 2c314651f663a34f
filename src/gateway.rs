//! Axum-based HTTP gateway: a thin shell over the shared `ChatEngine`.
//!
//! Body limits and request timeouts are enforced at the router layer; all
//! chat semantics live in the engine so the server and the CLI cannot drift.

use crate::engine::{ChatEngine, TurnOutcome, TurnRequest};
use crate::error::HiveError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB)
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (5 min) — a turn may span three completion round-trips,
/// each with its own retry budget.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

#[derive(Deserialize)]
pub struct ChatBody {
    pub user: String,
    pub message: String,
    #[serde(default)]
    pub authorized: bool,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub response: String,
    pub state: String,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub user: String,
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    100
}

#[must_use]
pub fn router(engine: Arc<ChatEngine>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/chat/{persona}", post(handle_chat))
        .route("/api/chat/{persona}/history", get(handle_history))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

pub async fn run_gateway(host: &str, port: u16, engine: Arc<ChatEngine>) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    run_gateway_with_listener(listener, engine).await
}

pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    engine: Arc<ChatEngine>,
) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "Gateway listening");
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_chat(
    State(state): State<AppState>,
    Path(persona): Path<String>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, (StatusCode, String)> {
    let outcome: TurnOutcome = state
        .engine
        .handle_turn(TurnRequest {
            user: body.user,
            persona,
            message: body.message,
            authorized: body.authorized,
        })
        .await
        .map_err(error_response)?;

    Ok(Json(ChatReply {
        response: outcome.reply,
        state: outcome.state.to_string(),
    }))
}

async fn handle_history(
    State(state): State<AppState>,
    Path(persona): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let turns = state
        .engine
        .history(&query.user, &persona, query.limit)
        .await
        .map_err(error_response)?;

    Ok(Json(serde_json::json!(turns)))
}

fn error_response(err: HiveError) -> (StatusCode, String) {
    let status = match &err {
        HiveError::PersonaNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
