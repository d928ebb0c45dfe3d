//! API key resolution: process environment first, then the secrets file.

use std::path::Path;

use tracing::debug;

use crate::error::CoachError;

/// Name of the key in both the environment and the secrets file.
pub const API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Resolve the API key using the real process environment.
pub fn resolve_api_key(secrets_file: &Path) -> Result<String, CoachError> {
    resolve_api_key_with(|k| std::env::var(k).ok(), secrets_file)
}

/// Resolve the API key with an injectable environment lookup.
///
/// An empty value counts as absent. A missing secrets file is not an error
/// by itself; only the absence of the key everywhere is.
pub fn resolve_api_key_with<F>(env: F, secrets_file: &Path) -> Result<String, CoachError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = env(API_KEY_VAR).filter(|k| !k.trim().is_empty()) {
        debug!("API key taken from environment");
        return Ok(key);
    }

    if !secrets_file.exists() {
        return Err(CoachError::MissingApiKey);
    }
    let raw = std::fs::read_to_string(secrets_file)
        .map_err(|e| CoachError::Secrets(format!("{}: {e}", secrets_file.display())))?;
    let table: toml::Table = toml::from_str(&raw)
        .map_err(|e| CoachError::Secrets(format!("{}: {e}", secrets_file.display())))?;

    match table.get(API_KEY_VAR).and_then(|v| v.as_str()) {
        Some(key) if !key.trim().is_empty() => {
            debug!(path = %secrets_file.display(), "API key taken from secrets file");
            Ok(key.to_owned())
        }
        _ => Err(CoachError::MissingApiKey),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
