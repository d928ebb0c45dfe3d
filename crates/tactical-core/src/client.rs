//! Remote model service: the two capabilities the core depends on, and the
//! OpenRouter implementation of both.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoachError;
use crate::message::Message;
use crate::sse;

/// Lazy, finite, non-restartable sequence of text increments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, CoachError>> + Send>>;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_REFERER: &str = "http://localhost:8501";
pub const DEFAULT_TITLE: &str = "GameBot";

/// One entry of the remote model listing. Only `id` is relied upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelDescriptor>,
}

/// Body of a chat-completions request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn streaming(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: true,
        }
    }
}

/// Source of the remote model catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, CoachError>;
}

/// Remote chat-completion capability with incremental delivery.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Submit `request` and return its reply as a stream of text increments.
    ///
    /// Errors before the first increment (connect failure, non-2xx status)
    /// are returned directly; later ones arrive as stream items.
    async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, CoachError>;
}

/// HTTP client for the OpenRouter API.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    referer: String,
    title: String,
}

impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("referer", &self.referer)
            .field("title", &self.title)
            .finish()
    }
}

impl OpenRouterClient {
    /// Create a client against the public endpoint using the default app identity.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            referer: DEFAULT_REFERER.to_owned(),
            title: DEFAULT_TITLE.to_owned(),
        }
    }

    /// Override the API base URL (default: [`DEFAULT_BASE_URL`]).
    pub fn set_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Value sent as `HTTP-Referer` (default: [`DEFAULT_REFERER`]).
    pub fn set_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    /// Value sent as `X-Title` (default: [`DEFAULT_TITLE`]).
    pub fn set_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, CoachError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(CoachError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl CatalogSource for OpenRouterClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, CoachError> {
        let url = format!("{}/models", self.base_url);
        debug!(%url, "fetching model catalog");
        let resp = Self::check_status(self.http.get(&url).send().await?).await?;
        let body = resp.bytes().await?;
        let list: ModelList = serde_json::from_slice(&body)?;
        Ok(list.data)
    }
}

#[async_trait]
impl ChatCompletion for OpenRouterClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, CoachError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            %url,
            model = %request.model,
            messages = request.messages.len(),
            "submitting chat completion"
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&request)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(sse::decode(resp.bytes_stream()))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::{get, post};
    use futures::StreamExt;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    const REPLY_EVENTS: &str = ": OPENROUTER PROCESSING\n\n\
        data: {\"choices\":[{\"delta\":{\"content\":\"Smoke \"}}]}\n\n\
        data: {\"choices\":[{\"delta\":{\"content\":\"the choke.\"}}]}\n\n\
        data: [DONE]\n\n";

    /// Serve `router` on an ephemeral local port and return its `/api/v1` base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api/v1")
    }

    fn client(base_url: &str) -> OpenRouterClient {
        OpenRouterClient::new("sk-or-test")
            .set_base_url(base_url)
            .set_referer("http://localhost:8501")
            .set_title("GameBot")
    }

    #[test]
    fn model_list_parses_data_ids() {
        let body = r#"{"data":[{"id":"a/b:free","name":"B","context_length":8192},{"id":"c/d"}]}"#;
        let list: ModelList = serde_json::from_str(body).unwrap();
        let ids: Vec<&str> = list.data.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a/b:free", "c/d"]);
    }

    #[test]
    fn chat_request_serializes_stream_flag() {
        let req = ChatRequest::streaming("m:free", vec![Message::user("hi")]);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], "m:free");
        assert_eq!(v["stream"], true);
        assert_eq!(v["messages"][0]["content"], "hi");
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let c = OpenRouterClient::new("k").set_base_url("http://localhost:9/api/v1/");
        assert_eq!(c.base_url(), "http://localhost:9/api/v1");
    }

    #[test]
    fn debug_output_hides_key() {
        let c = OpenRouterClient::new("sk-or-secret");
        assert!(!format!("{c:?}").contains("sk-or-secret"));
    }

    #[tokio::test]
    async fn chat_request_carries_identity_headers_and_streams_tokens() {
        let seen: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                *captured.lock().unwrap() = Some((headers, body));
                ([(header::CONTENT_TYPE, "text/event-stream")], REPLY_EVENTS)
            }),
        );
        let base = serve(router).await;

        let request = ChatRequest::streaming(
            "qwen/qwen-2.5-vl-72b-instruct:free",
            vec![Message::system("coach"), Message::user("where to smoke?")],
        );
        let stream = client(&base).stream_chat(request).await.unwrap();
        let tokens: Vec<String> = stream.map(|t| t.unwrap()).collect().await;
        assert_eq!(tokens, vec!["Smoke ", "the choke."]);

        let (headers, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-or-test");
        assert_eq!(headers["http-referer"], "http://localhost:8501");
        assert_eq!(headers["x-title"], "GameBot");
        assert_eq!(
            body,
            json!({
                "model": "qwen/qwen-2.5-vl-72b-instruct:free",
                "messages": [
                    { "role": "system", "content": "coach" },
                    { "role": "user", "content": "where to smoke?" }
                ],
                "stream": true
            })
        );
    }

    #[tokio::test]
    async fn rejected_chat_request_is_status_error() {
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, r#"{"error":"bad key"}"#) }),
        );
        let base = serve(router).await;

        let request = ChatRequest::streaming("m:free", vec![Message::user("hi")]);
        match client(&base).stream_chat(request).await {
            Err(CoachError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            Err(e) => panic!("expected status error, got {e}"),
            Ok(_) => panic!("expected status error, got a stream"),
        }
    }

    #[tokio::test]
    async fn catalog_is_read_from_models_endpoint() {
        let router = Router::new().route(
            "/api/v1/models",
            get(|| async {
                Json(json!({
                    "data": [ { "id": "google/gemini-2.0-flash-exp:free" }, { "id": "x/y" } ]
                }))
            }),
        );
        let base = serve(router).await;

        let models = client(&base).list_models().await.unwrap();
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["google/gemini-2.0-flash-exp:free", "x/y"]);
    }

    #[tokio::test]
    async fn unreachable_catalog_is_http_error() {
        let c = OpenRouterClient::new("k").set_base_url("http://127.0.0.1:9");
        assert!(matches!(c.list_models().await, Err(CoachError::Http(_))));
    }
}
