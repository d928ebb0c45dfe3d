//! tactical-core – model discovery and conversation assembly for the
//! Tactical Ops gaming coach.
//!
//! The crate has two halves:
//!
//! - [`catalog`] resolves the list of free, vision-capable models from the
//!   remote catalog, caching the result and falling back to a fixed list.
//! - [`assembler`] owns the per-turn flow: build the bounded payload, stream
//!   the completion, and commit the reply to the session transcript.
//!
//! [`client::OpenRouterClient`] is the only type that talks to the network;
//! everything else is driven through the [`client::CatalogSource`] and
//! [`client::ChatCompletion`] traits so it can be exercised without one.

pub mod assembler;
pub mod attachment;
pub mod catalog;
pub mod client;
pub mod error;
pub mod message;
pub mod payload;
pub mod secrets;
pub mod session;
pub mod sse;

pub use assembler::{ConversationAssembler, TurnEvent, TurnInput, TurnOutcome, TurnState};
pub use attachment::ImageAttachment;
pub use catalog::{CatalogCache, CatalogResolution, FALLBACK_MODELS};
pub use client::{CatalogSource, ChatCompletion, ChatRequest, OpenRouterClient, TokenStream};
pub use error::CoachError;
pub use message::{ContentPart, ImageUrl, Message, MessageContent, Role};
pub use session::{Genre, Session, Transcript};
