use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{ApiError, Operation};
use crate::models::{
    CreativeSuggestionsRequest, CreativeSuggestionsResponse, GenerateChapterRequest,
    GenerateChapterResponse, SummarizeChapterRequest, SummarizeChapterResponse,
};
use crate::services::story::StoryService;

pub const SERVICE_NAME: &str = "TaleSeed API";

#[derive(Clone)]
pub struct AppState {
    pub story: StoryService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/generate-chapter", post(generate_chapter))
        .route("/creative-suggestions", post(creative_suggestions))
        .route("/summarize-chapter", post(summarize_chapter))
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(AllowMethods::any())
                    .allow_headers(AllowHeaders::any()),
            ),
        )
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online"
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME
    }))
}

async fn generate_chapter(
    State(state): State<AppState>,
    payload: Result<Json<GenerateChapterRequest>, JsonRejection>,
) -> Result<Json<GenerateChapterResponse>, ApiError> {
    let Json(request) = payload?;
    state
        .story
        .generate_chapter(&request)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_service(err, Operation::GenerateChapter))
}

async fn creative_suggestions(
    State(state): State<AppState>,
    payload: Result<Json<CreativeSuggestionsRequest>, JsonRejection>,
) -> Result<Json<CreativeSuggestionsResponse>, ApiError> {
    let Json(request) = payload?;
    state
        .story
        .creative_suggestions(&request)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_service(err, Operation::CreativeSuggestions))
}

async fn summarize_chapter(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeChapterRequest>, JsonRejection>,
) -> Result<Json<SummarizeChapterResponse>, ApiError> {
    let Json(request) = payload?;
    state
        .story
        .summarize_chapter(&request)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_service(err, Operation::SummarizeChapter))
}
