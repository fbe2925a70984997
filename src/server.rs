//! HTTP responder serving the board rows as JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use tracing::{error, info};

use crate::cache::ScheduleCache;
use crate::config::BoardConfig;
use crate::display::display_rows;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub schedule: Arc<ScheduleCache>,
    pub board: Arc<BoardConfig>,
}

impl AppState {
    pub fn new(schedule: ScheduleCache, board: BoardConfig) -> Self {
        Self {
            schedule: Arc::new(schedule),
            board: Arc::new(board),
        }
    }
}

/// A failed request, answered with `500` and the error chain as plain text.
pub struct AppError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", self.0)).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(board_rows))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server started");
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

/// The current board as a bare JSON array of rows.
async fn board_rows(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let schedule = state.schedule.snapshot().await.context("schedule unavailable")?;
    let rows = display_rows(&schedule, &state.board, &Local::now())?;
    Ok(Json(rows))
}
