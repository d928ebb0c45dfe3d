//! One conversation turn, from payload to committed reply.
//!
//! Per turn the assembler moves `Idle → PayloadBuilt → Streaming →
//! {Completed | Failed} → Idle`. The user message is committed as soon as the
//! payload is built; the assistant message only after the reply stream has
//! been fully consumed.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attachment::ImageAttachment;
use crate::client::{ChatCompletion, ChatRequest};
use crate::error::CoachError;
use crate::message::Message;
use crate::payload::build_payload;
use crate::session::Session;

/// Marker appended to the in-progress reply while tokens are arriving.
pub const CURSOR: &str = "▌";

/// Remediation shown alongside a failed turn.
pub const RETRY_HINT: &str = "Try selecting a different model from the dropdown on the left!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    PayloadBuilt,
    Streaming,
    Completed,
    Failed,
}

/// What the user submitted for this turn.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub prompt: String,
    pub image: Option<ImageAttachment>,
}

impl TurnInput {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: ImageAttachment) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
        }
    }
}

/// Progress notifications for whoever renders the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A new increment arrived. `display` is the whole reply so far plus [`CURSOR`].
    Token { delta: String, display: String },
    /// The stream ended; `content` is the final reply, without the cursor.
    Completed { content: String },
    /// The turn failed; nothing was committed for the assistant.
    Failed { error: String, hint: String },
}

#[derive(Debug)]
pub enum TurnOutcome {
    Completed(Message),
    Failed(CoachError),
}

impl TurnOutcome {
    pub fn state(&self) -> TurnState {
        match self {
            Self::Completed(_) => TurnState::Completed,
            Self::Failed(_) => TurnState::Failed,
        }
    }
}

fn advance(state: &mut TurnState, next: TurnState) {
    debug!(from = ?state, to = ?next, "turn state");
    *state = next;
}

/// Drives turns against a chat-completion capability.
#[derive(Clone)]
pub struct ConversationAssembler {
    client: Arc<dyn ChatCompletion>,
}

impl std::fmt::Debug for ConversationAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationAssembler").finish_non_exhaustive()
    }
}

impl ConversationAssembler {
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        Self { client }
    }

    /// Run one turn for `session`, reporting progress through `on_event`.
    ///
    /// Never returns early with an error: failures are reported as a
    /// [`TurnEvent::Failed`] and a [`TurnOutcome::Failed`], and leave the
    /// transcript with only the user message added.
    pub async fn run_turn<F>(
        &self,
        session: &mut Session,
        input: TurnInput,
        mut on_event: F,
    ) -> TurnOutcome
    where
        F: FnMut(TurnEvent) + Send,
    {
        let mut state = TurnState::Idle;

        let messages = build_payload(
            &session.transcript,
            session.genre,
            &input.prompt,
            input.image.as_ref(),
        );
        advance(&mut state, TurnState::PayloadBuilt);
        session.transcript.push(Message::user(input.prompt));

        advance(&mut state, TurnState::Streaming);
        let reply = self
            .stream_reply(session.model.clone(), messages, &mut on_event)
            .await;
        let outcome = match reply {
            Ok(content) => {
                info!(session_id = %session.id, reply_len = content.len(), "turn completed");
                on_event(TurnEvent::Completed {
                    content: content.clone(),
                });
                let reply = Message::assistant(content);
                session.transcript.push(reply.clone());
                TurnOutcome::Completed(reply)
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "turn failed");
                on_event(TurnEvent::Failed {
                    error: e.to_string(),
                    hint: RETRY_HINT.to_owned(),
                });
                TurnOutcome::Failed(e)
            }
        };
        advance(&mut state, outcome.state());
        advance(&mut state, TurnState::Idle);
        outcome
    }

    async fn stream_reply<F>(
        &self,
        model: Option<String>,
        messages: Vec<Message>,
        on_event: &mut F,
    ) -> Result<String, CoachError>
    where
        F: FnMut(TurnEvent) + Send,
    {
        let model = model.ok_or(CoachError::NoModelSelected)?;
        let mut stream = self
            .client
            .stream_chat(ChatRequest::streaming(model, messages))
            .await?;

        let mut buffer = String::new();
        while let Some(delta) = stream.next().await {
            let delta = delta?;
            if delta.is_empty() {
                continue;
            }
            buffer.push_str(&delta);
            on_event(TurnEvent::Token {
                delta,
                display: format!("{buffer}{CURSOR}"),
            });
        }
        Ok(buffer)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TokenStream;
    use crate::message::{MessageContent, Role};
    use crate::session::Genre;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Tokens(Vec<&'static str>),
        RejectSubmit,
        BreakAfter(Vec<&'static str>),
    }

    struct ScriptedClient {
        script: Script,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedClient {
        async fn stream_chat(&self, request: ChatRequest) -> Result<TokenStream, CoachError> {
            self.requests.lock().unwrap().push(request);
            let items: Vec<Result<String, CoachError>> = match &self.script {
                Script::RejectSubmit => {
                    return Err(CoachError::Status {
                        status: 404,
                        body: "No endpoints found".into(),
                    });
                }
                Script::Tokens(t) => t.iter().map(|s| Ok((*s).to_owned())).collect(),
                Script::BreakAfter(t) => t
                    .iter()
                    .map(|s| Ok((*s).to_owned()))
                    .chain(std::iter::once(Err(CoachError::Remote("stream reset".into()))))
                    .collect(),
            };
            Ok(futures::stream::iter(items).boxed())
        }
    }

    fn session() -> Session {
        Session::new(Some("qwen/qwen-2.5-vl-72b-instruct:free".into()), Genre::FpsCompetitive)
    }

    async fn run(
        client: Arc<ScriptedClient>,
        s: &mut Session,
        input: TurnInput,
    ) -> (TurnOutcome, Vec<TurnEvent>) {
        let assembler = ConversationAssembler::new(client);
        let mut events = Vec::new();
        let outcome = assembler.run_turn(s, input, |e| events.push(e)).await;
        (outcome, events)
    }

    #[tokio::test]
    async fn completed_turn_appends_user_and_assistant() {
        let client = ScriptedClient::new(Script::Tokens(vec!["Hold ", "", "angles."]));
        let mut s = session();
        let input = TurnInput::text("how to defend B?");
        let (outcome, events) = run(client.clone(), &mut s, input).await;

        assert_eq!(outcome.state(), TurnState::Completed);
        assert_eq!(s.transcript.len(), 2);
        assert_eq!(s.transcript.as_slice()[0], Message::user("how to defend B?"));
        assert_eq!(s.transcript.as_slice()[1], Message::assistant("Hold angles."));
        assert_eq!(
            events,
            vec![
                TurnEvent::Token {
                    delta: "Hold ".into(),
                    display: "Hold ▌".into(),
                },
                TurnEvent::Token {
                    delta: "angles.".into(),
                    display: "Hold angles.▌".into(),
                },
                TurnEvent::Completed {
                    content: "Hold angles.".into(),
                },
            ]
        );

        let requests = client.requests.lock().unwrap();
        assert!(requests[0].stream);
        assert_eq!(requests[0].model, "qwen/qwen-2.5-vl-72b-instruct:free");
    }

    #[tokio::test]
    async fn rejected_submission_commits_only_user_message() {
        let client = ScriptedClient::new(Script::RejectSubmit);
        let mut s = session();
        s.transcript.push(Message::user("earlier"));
        s.transcript.push(Message::assistant("reply"));
        let before = s.transcript.len();

        let (outcome, events) = run(client, &mut s, TurnInput::text("and now?")).await;

        assert!(matches!(outcome, TurnOutcome::Failed(CoachError::Status { status: 404, .. })));
        assert_eq!(s.transcript.len(), before + 1);
        assert_eq!(s.transcript.as_slice().last().unwrap().role, Role::User);
        match &events[..] {
            [TurnEvent::Failed { error, hint }] => {
                assert!(error.contains("404"));
                assert_eq!(hint, RETRY_HINT);
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[tokio::test]
    async fn mid_stream_failure_discards_partial_reply() {
        let client = ScriptedClient::new(Script::BreakAfter(vec!["Rotate ", "to "]));
        let mut s = session();
        let (outcome, events) = run(client, &mut s, TurnInput::text("where next?")).await;

        assert_eq!(outcome.state(), TurnState::Failed);
        assert_eq!(s.transcript.len(), 1);
        assert!(matches!(events.last(), Some(TurnEvent::Failed { .. })));
        assert_eq!(events.iter().filter(|e| matches!(e, TurnEvent::Token { .. })).count(), 2);
    }

    #[tokio::test]
    async fn missing_model_fails_without_calling_remote() {
        let client = ScriptedClient::new(Script::Tokens(vec!["unused"]));
        let mut s = Session::new(None, Genre::default());
        let (outcome, _) = run(client.clone(), &mut s, TurnInput::text("hi")).await;
        assert!(matches!(outcome, TurnOutcome::Failed(CoachError::NoModelSelected)));
        assert!(client.requests.lock().unwrap().is_empty());
        assert_eq!(s.transcript.len(), 1);
    }

    #[tokio::test]
    async fn image_turn_is_sent_structured_but_recorded_as_text() {
        let client = ScriptedClient::new(Script::Tokens(vec!["Go top."]));
        let mut s = session();
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let image = ImageAttachment::from_upload(Some("minimap.jpg"), jpeg).unwrap();
        run(client.clone(), &mut s, TurnInput::with_image("best rotation?", image)).await;

        let requests = client.requests.lock().unwrap();
        let sent = requests[0].messages.last().unwrap();
        assert!(matches!(sent.content, MessageContent::Parts(ref p) if p.len() == 2));
        assert_eq!(s.transcript.as_slice()[0], Message::user("best rotation?"));
    }

    #[tokio::test]
    async fn history_window_applies_to_prior_turns() {
        let client = ScriptedClient::new(Script::Tokens(vec!["ok"]));
        let mut s = session();
        for i in 0..6 {
            s.transcript.push(Message::user(format!("u{i}")));
        }
        run(client.clone(), &mut s, TurnInput::text("latest")).await;

        let requests = client.requests.lock().unwrap();
        let texts: Vec<String> = requests[0].messages.iter().map(|m| m.text()).collect();
        assert_eq!(texts.len(), 6);
        assert!(texts[0].contains("Genre: FPS / Competitive"));
        assert_eq!(&texts[1..], &["u2", "u3", "u4", "u5", "latest"]);
    }
}
