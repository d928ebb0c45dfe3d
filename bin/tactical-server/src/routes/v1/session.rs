use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tactical_core::Session;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ServerError;
use crate::schemas::v1::session::{
    CreateSessionRequest, MessageResponse, SessionResponse, UpdateSelectionRequest, parse_genre,
    parse_model,
};
use crate::state::{AppState, SharedSession};

#[derive(OpenApi)]
#[openapi(
    paths(create_session, get_session, update_selection, delete_session, list_session_messages),
    components(schemas(
        CreateSessionRequest,
        UpdateSelectionRequest,
        SessionResponse,
        MessageResponse
    ))
)]
pub struct SessionApi;

/// Register session routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/selection", put(update_selection))
        .route("/sessions/{id}/messages", get(list_session_messages))
}

pub(crate) async fn lookup(state: &AppState, id: &Uuid) -> Result<SharedSession, ServerError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ServerError::NotFound(format!("session {id} not found")))
}

// ── Session handlers ──────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/v1/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Unknown genre"),
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    let genre = match req.genre.as_deref() {
        Some(raw) => parse_genre(raw)?,
        None => Default::default(),
    };
    let model = match parse_model(req.model) {
        Some(model) => Some(model),
        // Preselect the best entry, as the selector does.
        None => state.catalog.get().await.selectable().into_iter().next(),
    };

    let session = Session::new(model, genre);
    let response = SessionResponse::from(&session);
    state.sessions.insert(session).await;
    info!(
        session_id = %response.id,
        model = ?response.model,
        genre = %response.genre,
        "session created"
    );
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 404, description = "No such session"),
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ServerError> {
    let shared = lookup(&state, &id).await?;
    let session = shared.lock().await;
    Ok(Json(SessionResponse::from(&*session)))
}

/// Change the session's model and/or genre.
///
/// Waits for an in-flight turn to finish first.
#[utoipa::path(
    put,
    path = "/v1/sessions/{id}/selection",
    tag = "sessions",
    request_body = UpdateSelectionRequest,
    responses(
        (status = 200, description = "Selection updated", body = SessionResponse),
        (status = 400, description = "Unknown genre"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn update_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSelectionRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    let genre = req.genre.as_deref().map(parse_genre).transpose()?;
    let shared = lookup(&state, &id).await?;
    let mut session = shared.lock().await;
    if let Some(model) = parse_model(req.model) {
        session.model = Some(model);
    }
    if let Some(genre) = genre {
        session.genre = genre;
    }
    Ok(Json(SessionResponse::from(&*session)))
}

#[utoipa::path(
    delete,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    responses(
        (status = 200, description = "Session discarded", body = serde_json::Value),
        (status = 404, description = "No such session"),
    )
)]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if !state.sessions.remove(&id).await {
        return Err(ServerError::NotFound(format!("session {id} not found")));
    }
    info!(session_id = %id, "session discarded");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/messages",
    tag = "sessions",
    responses(
        (status = 200, description = "Transcript, oldest first", body = Vec<MessageResponse>),
        (status = 404, description = "No such session"),
    )
)]
pub async fn list_session_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let shared = lookup(&state, &id).await?;
    let session = shared.lock().await;
    Ok(Json(session.transcript.iter().map(MessageResponse::from).collect()))
}
