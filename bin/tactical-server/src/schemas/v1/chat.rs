use utoipa::ToSchema;

/// Multipart form accepted by `POST /v1/sessions/{id}/turns`.
#[allow(dead_code)]
#[derive(Debug, ToSchema)]
pub struct TurnUpload {
    /// The user's question or command.
    pub prompt: String,
    /// Optional screenshot (`.png`, `.jpg`, `.jpeg`).
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}
