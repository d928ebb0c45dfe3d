//! Model catalog resolution.
//!
//! The remote listing is narrowed to free, vision-capable models and ranked
//! so the strongest vision families come first. Any failure yields
//! [`FALLBACK_MODELS`] instead of an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::client::CatalogSource;

/// Suffix marking a free-tier model identifier.
pub const FREE_MARKER: &str = ":free";

/// Substrings that mark an identifier as vision-capable.
pub const VISION_KEYWORDS: [&str; 3] = ["vision", "vl", "gemini"];

/// Known-good vision models used whenever the catalog cannot be read.
pub const FALLBACK_MODELS: [&str; 3] = [
    "qwen/qwen-2.5-vl-72b-instruct:free",
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.2-11b-vision-instruct:free",
];

/// How long a resolved catalog is reused before the next fetch.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Keep free identifiers that mention a vision keyword, in input order.
pub fn filter_vision_models<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    ids.into_iter()
        .filter(|id| id.ends_with(FREE_MARKER))
        .filter(|id| VISION_KEYWORDS.iter().any(|k| id.contains(k)))
        .map(str::to_owned)
        .collect()
}

/// Stable ranking: `qwen` identifiers first, then `llama`, then the rest.
pub fn rank_models(ids: &mut [String]) {
    ids.sort_by_key(|id| (!id.contains("qwen"), !id.contains("llama")));
}

/// Outcome of one catalog resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResolution {
    /// The remote listing was read; holds the filtered, ranked identifiers.
    Fetched(Vec<String>),
    /// The listing could not be read; holds [`FALLBACK_MODELS`].
    Fallback { models: Vec<String>, reason: String },
}

impl CatalogResolution {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::Fallback {
            models: FALLBACK_MODELS.iter().map(|m| (*m).to_owned()).collect(),
            reason: reason.into(),
        }
    }

    pub fn models(&self) -> &[String] {
        match self {
            Self::Fetched(models) | Self::Fallback { models, .. } => models,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Identifiers to offer in a selector; never empty.
    ///
    /// A successful fetch with no matching entries still offers the fallback
    /// list, so a user always has something to pick.
    pub fn selectable(&self) -> Vec<String> {
        match self.models() {
            [] => FALLBACK_MODELS.iter().map(|m| (*m).to_owned()).collect(),
            models => models.to_vec(),
        }
    }
}

/// Fetch, filter and rank the catalog. Never fails.
pub async fn resolve(source: &dyn CatalogSource) -> CatalogResolution {
    match source.list_models().await {
        Ok(descriptors) => {
            let total = descriptors.len();
            let mut models = filter_vision_models(descriptors.iter().map(|d| d.id.as_str()));
            rank_models(&mut models);
            info!(total, matched = models.len(), "model catalog resolved");
            CatalogResolution::Fetched(models)
        }
        Err(e) => {
            warn!(error = %e, "model catalog unavailable; falling back to built-in list");
            CatalogResolution::fallback(e.to_string())
        }
    }
}

/// Time-windowed memo of [`resolve`].
///
/// The first call after the window expires refreshes the entry; concurrent
/// callers wait for that single fetch.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    ttl: Duration,
    entry: Mutex<Option<(Instant, CatalogResolution)>>,
}

impl std::fmt::Debug for CatalogCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub async fn get(&self) -> CatalogResolution {
        let mut entry = self.entry.lock().await;
        if let Some((fetched_at, resolution)) = entry.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return resolution.clone();
            }
        }
        let resolution = resolve(self.source.as_ref()).await;
        *entry = Some((Instant::now(), resolution.clone()));
        resolution
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
