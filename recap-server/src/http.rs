//! Recap HTTP JSON API
//!
//! Axum-based HTTP server exposing meeting CRUD and transcript
//! summarization.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to an
//! inner function. The inner functions are directly testable without axum
//! dispatch machinery.
//!
//! Endpoints:
//! - GET    /health            — health check with DB status
//! - GET    /api/meetings      — list meetings with search + pagination
//! - POST   /api/meetings      — create a meeting
//! - GET    /api/meetings/:id  — full meeting record
//! - DELETE /api/meetings/:id  — delete a meeting
//! - POST   /summarize         — summarize a transcript and auto-save it

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use recap_core::models::meeting::NewMeeting;
use recap_core::summarizer::{SummarizerClient, SummarizerError};
use recap_core::{RecapConfig, RecapError};
use serde::Deserialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::store::{self, ListParams};

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: PgPool,
    pub config: RecapConfig,
    pub summarizer: SummarizerClient,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/meetings", get(list_handler).post(create_handler))
        .route("/api/meetings/:id", get(get_handler).delete(delete_handler))
        .route("/summarize", post(summarize_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    pool: PgPool,
    config: RecapConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let summarizer = SummarizerClient::new(config.summarizer.clone())?;
    let state = Arc::new(HttpState {
        pool,
        config,
        summarizer,
    });

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Recap HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateMeetingRequest {
    pub title: Option<String>,
    /// `YYYY-MM-DD`; anything else falls back to today.
    pub date: Option<String>,
    pub language: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SummarizeRequest {
    pub api_key: Option<String>,
    pub meeting_text: Option<String>,
    pub meeting_title: Option<String>,
    pub meeting_date: Option<String>,
}

// ============================================================================
// Error translation
// ============================================================================

/// Map an error kind to its HTTP status. Exhaustive by construction: a new
/// error kind must pick a status here.
pub fn error_status(err: &RecapError) -> StatusCode {
    match err {
        RecapError::Validation(_) => StatusCode::BAD_REQUEST,
        RecapError::NotFound(_) => StatusCode::NOT_FOUND,
        RecapError::Database(_) | RecapError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        RecapError::Summarizer(e) => match e {
            SummarizerError::MissingApiKey | SummarizerError::MissingTranscript => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

pub fn error_response(err: RecapError) -> (StatusCode, serde_json::Value) {
    (
        error_status(&err),
        serde_json::json!({ "error": err.to_string() }),
    )
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: &PgPool) -> (StatusCode, serde_json::Value) {
    match recap_core::db::health_check(pool).await {
        Ok(pg_ver) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "postgresql": pg_ver,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner list — search + pagination over the store.
pub async fn list_inner(pool: &PgPool, query: ListQuery) -> (StatusCode, serde_json::Value) {
    let params = ListParams {
        search: query.search,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(store::DEFAULT_PER_PAGE),
    };

    match store::list_meetings(pool, &params).await {
        Ok(page) => {
            let meetings: Vec<_> = page.items.iter().map(|m| m.preview()).collect();
            (
                StatusCode::OK,
                serde_json::json!({
                    "meetings": meetings,
                    "total": page.total,
                    "pages": page.pages,
                    "current_page": page.page,
                }),
            )
        }
        Err(e) => error_response(e),
    }
}

/// Inner get — full record for one id.
pub async fn get_inner(pool: &PgPool, id: i32) -> (StatusCode, serde_json::Value) {
    match store::get_meeting(pool, id).await {
        Ok(meeting) => (StatusCode::OK, serde_json::json!(meeting)),
        Err(e) => error_response(e),
    }
}

/// Inner create — applies field defaults and inserts.
pub async fn create_inner(
    pool: &PgPool,
    req: CreateMeetingRequest,
) -> (StatusCode, serde_json::Value) {
    let fields = NewMeeting::from_parts(req.title, req.date, req.language, req.transcript, req.summary);

    match store::create_meeting(pool, fields).await {
        Ok(meeting) => (
            StatusCode::CREATED,
            serde_json::json!({
                "success": true,
                "meeting": meeting,
                "message": "Meeting saved successfully",
            }),
        ),
        Err(e) => error_response(e),
    }
}

/// Inner delete.
pub async fn delete_inner(pool: &PgPool, id: i32) -> (StatusCode, serde_json::Value) {
    match store::delete_meeting(pool, id).await {
        Ok(()) => (
            StatusCode::OK,
            serde_json::json!({
                "success": true,
                "message": "Meeting deleted successfully",
            }),
        ),
        Err(e) => error_response(e),
    }
}

/// Inner summarize — calls the summarizer, then auto-saves the result.
///
/// A storage failure after a successful summarization must not discard the
/// computed summary: the response then carries a `database_error` field
/// instead of an overall failure.
pub async fn summarize_inner(
    pool: &PgPool,
    summarizer: &SummarizerClient,
    req: SummarizeRequest,
) -> (StatusCode, serde_json::Value) {
    let meeting_text = match req.meeting_text.as_deref() {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return error_response(RecapError::Validation("Meeting text required".to_string()));
        }
    };

    let outcome = match summarizer
        .summarize(
            meeting_text,
            req.meeting_title.as_deref(),
            req.meeting_date.as_deref(),
            req.api_key.as_deref(),
        )
        .await
    {
        Ok(o) => o,
        Err(e) => return error_response(RecapError::from(e)),
    };

    let title = req
        .meeting_title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| outcome.generated_title.clone());

    let fields = NewMeeting::from_parts(
        title,
        req.meeting_date.clone(),
        None,
        Some(meeting_text.to_string()),
        Some(outcome.summary.clone()),
    );

    let mut body = serde_json::json!({ "summary": outcome.summary });
    if let Some(t) = &outcome.generated_title {
        body["generated_title"] = serde_json::json!(t);
    }

    match store::create_meeting(pool, fields).await {
        Ok(meeting) => {
            body["meeting_id"] = serde_json::json!(meeting.id);
            body["saved_to_database"] = serde_json::json!(true);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Summary computed but could not be saved");
            body["database_error"] =
                serde_json::json!(format!("Could not save to database: {}", e));
        }
    }

    (StatusCode::OK, body)
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn list_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let (status, body) = list_inner(&state.pool, query).await;
    (status, Json(body))
}

pub async fn get_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let (status, body) = get_inner(&state.pool, id).await;
    (status, Json(body))
}

pub async fn create_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<CreateMeetingRequest>,
) -> impl IntoResponse {
    let (status, body) = create_inner(&state.pool, req).await;
    (status, Json(body))
}

pub async fn delete_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let (status, body) = delete_inner(&state.pool, id).await;
    (status, Json(body))
}

pub async fn summarize_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<SummarizeRequest>,
) -> impl IntoResponse {
    let (status, body) = summarize_inner(&state.pool, &state.summarizer, req).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — pure pieces that need neither a database nor an API
// ============================================================================
