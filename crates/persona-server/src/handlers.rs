//! Route handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use persona_core::OrchestratorResult;
use persona_core::api::{ChatRequest, HealthResponse};
use persona_core::persona::PersonaSummary;
use tracing::Instrument;

use crate::error::ApiError;
use crate::router::AppState;

/// POST /chat/:persona_id
pub async fn chat(
    State(state): State<AppState>,
    Path(persona_id): Path<String>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<OrchestratorResult>, ApiError> {
    let persona = state
        .personas
        .find(&persona_id)
        .ok_or_else(|| ApiError::unknown_persona(&persona_id))?;
    let Json(request) = payload?;

    let span = tracing::info_span!("chat", persona = %persona.id, messages = request.messages.len());
    let result = state
        .orchestrator
        .run(&persona, &request.messages)
        .instrument(span)
        .await?;

    Ok(Json(result))
}

/// GET /personas
pub async fn list_personas(State(state): State<AppState>) -> Json<Vec<PersonaSummary>> {
    Json(state.personas.summaries())
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
