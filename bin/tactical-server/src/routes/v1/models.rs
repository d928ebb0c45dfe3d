//! Model catalog and genre listing.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tactical_core::Genre;
use tracing::debug;
use utoipa::OpenApi;

use crate::schemas::v1::models::{GenreListResponse, ModelCatalogResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_models, list_genres),
    components(schemas(ModelCatalogResponse, GenreListResponse))
)]
pub struct ModelsApi;

/// Register catalog routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/models", get(list_models))
        .route("/genres", get(list_genres))
}

/// Free vision-capable models (`GET /v1/models`).
///
/// Always succeeds: when the remote catalog cannot be read the built-in
/// fallback list is returned instead.
#[utoipa::path(
    get,
    path = "/v1/models",
    tag = "catalog",
    responses(
        (status = 200, description = "Selectable models, best first", body = ModelCatalogResponse),
    )
)]
pub async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelCatalogResponse> {
    let resolution = state.catalog.get().await;
    debug!(fallback = resolution.is_fallback(), "serving model catalog");
    Json(ModelCatalogResponse {
        models: resolution.selectable(),
    })
}

/// Genre choices (`GET /v1/genres`).
#[utoipa::path(
    get,
    path = "/v1/genres",
    tag = "catalog",
    responses(
        (status = 200, description = "Genre labels", body = GenreListResponse),
    )
)]
pub async fn list_genres() -> Json<GenreListResponse> {
    Json(GenreListResponse {
        genres: Genre::labels(),
    })
}
