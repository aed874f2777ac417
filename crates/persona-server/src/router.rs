//! Router construction for the persona chat server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use persona_core::persona::PersonaRepository;
use persona_interaction::StepOrchestrator;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared, read-only state. Requests never share conversation state.
#[derive(Clone)]
pub struct AppState {
    pub personas: Arc<dyn PersonaRepository>,
    pub orchestrator: Arc<StepOrchestrator>,
}

/// Build the full axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat/:persona_id", post(handlers::chat))
        .route("/personas", get(handlers::list_personas))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
