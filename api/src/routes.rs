use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};
use rag_agent::AgentOrchestrator;
use tower_http::cors::CorsLayer;

use crate::auth::require_bearer;
use crate::query_payload::QueryPayload;
use crate::query_response::{HealthResponse, QueryResponse};

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentOrchestrator>,
    pub api_token: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/query", post(handle_query))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryPayload>,
) -> Json<QueryResponse> {
    let response = state.agent.handle(&payload.message).await;
    log::info!(
        "[{}] Answered query ({:?})",
        response.request_id,
        response.retrieval
    );
    Json(response.into())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.agent.config();
    Json(HealthResponse {
        status: "ok",
        model: config.model.clone(),
        corpus: config.corpus_resource_name(),
    })
}
