//! Server-sent-events decoding for streamed chat completions.
//!
//! The remote service answers a `stream: true` request with events whose
//! `data` is a JSON completion chunk, ending with `data: [DONE]`. Event framing
//! (line endings, multi-line `data`, `:` keep-alive comments) is handled by
//! [`eventsource_stream`]; this module only interprets the payloads.

use std::fmt::Display;

use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use crate::client::TokenStream;
use crate::error::CoachError;

const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: String,
}

/// What one event's `data` means for the reply.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Delta(String),
    Skip,
    Done,
}

fn parse_data(data: &str) -> Result<Frame, CoachError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(Frame::Skip);
    }
    if data == DONE_MARKER {
        return Ok(Frame::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    if let Some(err) = chunk.error {
        return Err(CoachError::Remote(err.message));
    }
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map_or(Frame::Skip, Frame::Delta))
}

fn stream_error<E>(err: EventStreamError<E>) -> CoachError
where
    E: Into<CoachError> + Display,
{
    match err {
        EventStreamError::Transport(e) => e.into(),
        other => CoachError::Stream(other.to_string()),
    }
}

/// Turn a raw SSE byte stream into a stream of content deltas.
///
/// Ends at `[DONE]`, at the end of the body, or after the first error.
pub fn decode<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<CoachError> + Display + Send + 'static,
{
    let frames = body
        .eventsource()
        .map(|item| item.map_err(stream_error).and_then(|event| parse_data(&event.data)));

    futures::stream::unfold((Box::pin(frames), false), |(mut frames, ended)| async move {
        if ended {
            return None;
        }
        loop {
            match frames.next().await? {
                Ok(Frame::Delta(delta)) => return Some((Ok(delta), (frames, false))),
                Ok(Frame::Skip) => continue,
                Ok(Frame::Done) => return None,
                Err(e) => return Some((Err(e), (frames, true))),
            }
        }
    })
    .boxed()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
