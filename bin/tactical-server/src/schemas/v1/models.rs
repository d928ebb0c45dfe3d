use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `GET /v1/models`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelCatalogResponse {
    /// Selectable model identifiers, best first.
    pub models: Vec<String>,
}

/// Response body for `GET /v1/genres`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GenreListResponse {
    /// Genre labels in selector order.
    pub genres: Vec<String>,
}
