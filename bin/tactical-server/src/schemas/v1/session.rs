use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tactical_core::{Genre, Message, Role, Session};
use utoipa::ToSchema;

use crate::error::ServerError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Model identifier to start with.
    #[serde(default)]
    pub model: Option<String>,
    /// Genre label or slug, e.g. `"MOBA / Strategy"` or `"moba-strategy"`.
    #[serde(default)]
    pub genre: Option<String>,
}

/// Body of `PUT /v1/sessions/{id}/selection`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateSelectionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub id: String,
    pub model: Option<String>,
    pub genre: String,
    pub message_count: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl From<&Session> for SessionResponse {
    fn from(s: &Session) -> Self {
        SessionResponse {
            id: s.id.to_string(),
            model: s.model.clone(),
            genre: s.genre.to_string(),
            message_count: s.transcript.len(),
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

impl From<&Message> for MessageResponse {
    fn from(m: &Message) -> Self {
        let role = match m.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        MessageResponse {
            role: role.to_owned(),
            content: m.text(),
        }
    }
}

/// Parse a genre label or slug from a request body.
pub fn parse_genre(raw: &str) -> Result<Genre, ServerError> {
    Genre::from_str(raw.trim()).map_err(|_| {
        ServerError::BadRequest(format!(
            "unknown genre '{raw}'; expected one of: {}",
            Genre::labels().join(", ")
        ))
    })
}

/// Normalise an optional model field: blank means "not chosen".
pub fn parse_model(raw: Option<String>) -> Option<String> {
    raw.map(|m| m.trim().to_owned()).filter(|m| !m.is_empty())
}
