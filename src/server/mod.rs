// src/server/mod.rs

//! HTTP surface. Thin handlers over [`TurnPipeline`]; all semantics live in
//! the pipeline and below.
//!
//! [`TurnPipeline`]: crate::turn::TurnPipeline

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::{AssemblyError, StoreError};
use crate::policy::{Question, Scope};
use crate::proposal::DraftOperation;
use crate::state::AppState;
use crate::turn::{TurnError, TurnOutcome};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/proposals/{id}/toggle", post(toggle))
        .route("/proposals/{id}/operations/{index}", put(edit))
        .route("/proposals/{id}/confirm", post(confirm))
        .route("/proposals/{id}/cancel", post(cancel))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Request/response shapes ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub scope: Scope,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChatReply {
    Questions {
        questions: Vec<Question>,
    },
    Proposal {
        proposal_id: String,
        summary: String,
        operations: Vec<DraftOperation>,
    },
    Message {
        content: String,
    },
}

impl From<TurnOutcome> for ChatReply {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Questions(questions) => ChatReply::Questions { questions },
            TurnOutcome::Proposal {
                proposal_id,
                summary,
                operations,
            } => ChatReply::Proposal {
                proposal_id,
                summary,
                operations,
            },
            TurnOutcome::Message(content) => ChatReply::Message { content },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub index: usize,
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let outcome = state
        .pipeline
        .handle_message(&request.user_id, &request.scope, &request.message)
        .await?;
    Ok(Json(outcome.into()))
}

async fn toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ToggleRequest>,
) -> Result<Json<Value>, ApiError> {
    let selected = state.pipeline.toggle(&id, request.index).await?;
    Ok(Json(json!({ "selected": selected })))
}

async fn edit(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(payload): Json<Value>,
) -> Result<Json<DraftOperation>, ApiError> {
    let operation = state.pipeline.edit(&id, index, payload).await?;
    Ok(Json(operation))
}

async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let report = state.pipeline.confirm(&id).await?;
    Ok(Json(json!({
        "summary": report.summary(),
        "success_count": report.success_count,
        "error_count": report.error_count,
        "lines": report.lines,
    })))
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.cancel(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Error mapping ─────────────────────────────────────────────────────

pub struct ApiError(TurnError);

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TurnError::Assembly(AssemblyError::Authorization { .. }) => StatusCode::FORBIDDEN,
            TurnError::Assembly(AssemblyError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            TurnError::UnknownProposal(_) | TurnError::UnknownOperation(_) => {
                StatusCode::NOT_FOUND
            }
            TurnError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            TurnError::Store(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            TurnError::Policy(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
