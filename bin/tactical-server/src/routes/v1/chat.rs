//! Chat turns.
//!
//! A turn is submitted as a multipart form (`prompt` plus an optional
//! `image` file) and answered with a server-sent-event stream. The turn runs
//! in its own task holding the session lock, so a session has at most one
//! turn in flight and the reply is committed even if the client goes away.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::Router;
use futures::{Stream, StreamExt};
use tactical_core::{ImageAttachment, TurnEvent, TurnInput};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{Instrument, debug};
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ServerError;
use crate::routes::v1::session::lookup;
use crate::schemas::v1::chat::TurnUpload;
use crate::state::AppState;

/// Maximum allowed prompt length in bytes.
const MAX_PROMPT_BYTES: usize = 32 * 1024;

#[derive(OpenApi)]
#[openapi(paths(submit_turn), components(schemas(TurnUpload)))]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sessions/{id}/turns", post(submit_turn))
}

/// Submit one turn (`POST /v1/sessions/{id}/turns`).
///
/// Emits `token` events (`delta`, `display`), then exactly one `completed`
/// (`content`) or `failed` (`error`, `hint`) event.
#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/turns",
    tag = "chat",
    request_body(content = TurnUpload, content_type = "multipart/form-data"),
    responses(
        (
            status = 200,
            description = "SSE stream of turn events",
            content_type = "text/event-stream"
        ),
        (status = 400, description = "Empty prompt or unsupported image"),
        (status = 404, description = "No such session"),
    )
)]
pub async fn submit_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let shared = lookup(&state, &id).await?;
    let input = read_turn(multipart).await?;
    debug!(
        session_id = %id,
        prompt_len = input.prompt.len(),
        image = input.image.is_some(),
        "turn submitted"
    );

    let (tx, rx) = mpsc::unbounded_channel::<TurnEvent>();
    let assembler = state.assembler.clone();
    tokio::spawn(
        async move {
            let mut session = shared.lock_owned().await;
            assembler
                .run_turn(&mut session, input, |event| {
                    // The receiver is gone only if the client disconnected.
                    let _ = tx.send(event);
                })
                .await;
        }
        .instrument(tracing::Span::current()),
    );

    let events =
        UnboundedReceiverStream::new(rx).map(|event| Ok::<Event, Infallible>(to_sse(&event)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn read_turn(mut multipart: Multipart) -> Result<TurnInput, ServerError> {
    let mut prompt: Option<String> = None;
    let mut image: Option<ImageAttachment> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("prompt") => prompt = Some(field.text().await?),
            Some("image") => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    image = Some(ImageAttachment::from_upload(
                        file_name.as_deref().filter(|n| !n.is_empty()),
                        bytes.to_vec(),
                    )?);
                }
            }
            _ => {}
        }
    }

    let prompt = prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("prompt must not be empty".into()))?;
    if prompt.len() > MAX_PROMPT_BYTES {
        return Err(ServerError::BadRequest(format!(
            "prompt too large ({} bytes); maximum is {MAX_PROMPT_BYTES} bytes",
            prompt.len()
        )));
    }
    Ok(TurnInput { prompt, image })
}

fn to_sse(event: &TurnEvent) -> Event {
    let kind = match event {
        TurnEvent::Token { .. } => "token",
        TurnEvent::Completed { .. } => "completed",
        TurnEvent::Failed { .. } => "failed",
    };
    match Event::default().event(kind).json_data(event) {
        Ok(ev) => ev,
        Err(e) => Event::default().event("failed").data(e.to_string()),
    }
}
