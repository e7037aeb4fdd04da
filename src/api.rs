//! HTTP surface consumed by the UI: health/status plus the two pipeline
//! entry points, `recommend` and the generator-free `search`.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::ApiError;
use crate::rag::store::SearchResult;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/search", post(search))
        .route("/api/recommend", post(recommend))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let products = state.store.count().await?;
    Ok(Json(json!({
        "status": "ok",
        "initialized": state.store.is_initialized(),
        "products": products,
    })))
}

async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let products = state.store.count().await?;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds();

    Ok(Json(json!({
        "products": products,
        "embedding_model": state.store.embedding_model(),
        "llm_model": state.settings.llm_model,
        "uptime_secs": uptime_secs,
    })))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    k: Option<usize>,
    min_score: Option<f32>,
    /// Also return the markdown rendering used by display callers.
    #[serde(default)]
    display: bool,
}

#[derive(Debug, Serialize)]
struct SearchResultPayload {
    name: String,
    price: String,
    link: String,
    description: String,
    score: f32,
}

impl From<SearchResult> for SearchResultPayload {
    fn from(result: SearchResult) -> Self {
        SearchResultPayload {
            name: result.document.metadata.name,
            price: result.document.metadata.price,
            link: result.document.metadata.link,
            description: result.document.content,
            score: result.score,
        }
    }
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let results = state
        .recommender
        .raw_search(query, request.k, request.min_score)
        .await?;

    let display = request
        .display
        .then(|| state.recommender.formatter().format_for_display(&results));

    let payload: Vec<SearchResultPayload> =
        results.into_iter().map(SearchResultPayload::from).collect();

    Ok(Json(json!({
        "results": payload,
        "display": display,
    })))
}

#[derive(Debug, Deserialize)]
struct RecommendRequest {
    query: String,
    k: Option<usize>,
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let outcome = state.recommender.recommend(query, request.k).await?;
    Ok(Json(outcome))
}
