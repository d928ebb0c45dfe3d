use thiserror::Error;

/// Errors produced by tactical-core operations.
#[derive(Debug, Error)]
pub enum CoachError {
    /// An HTTP request failed at the transport level (connect, TLS, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body or stream chunk was not the JSON we expected.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The remote service answered with a non-2xx status.
    #[error("remote service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The reply stream was not valid server-sent events.
    #[error("malformed event stream: {0}")]
    Stream(String),

    /// The remote service reported an error inside an otherwise successful stream.
    #[error("remote error: {0}")]
    Remote(String),

    /// No API key in the environment nor in the secrets store.
    #[error("API key not found: set OPENROUTER_API_KEY or add it to the secrets file")]
    MissingApiKey,

    /// The secrets store exists but could not be read or parsed.
    #[error("secrets store error: {0}")]
    Secrets(String),

    /// The uploaded file is not one of the accepted image types.
    #[error("unsupported image upload: {0}")]
    UnsupportedImage(String),

    /// A turn was submitted before a model was chosen for the session.
    #[error("no model selected for this session")]
    NoModelSelected,
}
