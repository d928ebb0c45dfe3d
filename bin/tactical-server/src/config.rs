//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use tactical_core::client::{DEFAULT_BASE_URL, DEFAULT_REFERER, DEFAULT_TITLE};

/// Runtime configuration for tactical-server.
///
/// Every field has a default; only the API key (resolved separately, see
/// [`tactical_core::secrets`]) must be provided.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"127.0.0.1:8501"`).
    pub bind_address: String,

    /// Base URL of the OpenRouter-compatible API.
    pub api_base: String,

    /// `HTTP-Referer` header identifying this app to the API.
    pub referer: String,

    /// `X-Title` header identifying this app to the API.
    pub title: String,

    /// Secrets file consulted when `OPENROUTER_API_KEY` is not set.
    pub secrets_file: PathBuf,

    /// How long a resolved model catalog is reused.
    pub catalog_ttl: Duration,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS allow-list; wildcard when unset.
    pub cors_allowed_origins: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_owned());
        Self {
            bind_address: or("TACOPS_BIND", "127.0.0.1:8501"),
            api_base: or("TACOPS_API_BASE", DEFAULT_BASE_URL),
            referer: or("TACOPS_REFERER", DEFAULT_REFERER),
            title: or("TACOPS_TITLE", DEFAULT_TITLE),
            secrets_file: PathBuf::from(or("TACOPS_SECRETS_FILE", ".tacops/secrets.toml")),
            catalog_ttl: Duration::from_secs(
                get("TACOPS_CATALOG_TTL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3600),
            ),
            log_level: or("TACOPS_LOG", "info"),
            log_json: get("TACOPS_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            cors_allowed_origins: get("TACOPS_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
