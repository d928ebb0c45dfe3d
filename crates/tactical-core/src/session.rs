//! Per-session conversation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::message::Message;

/// Game genre the coach is framed around.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize,
    Deserialize,
)]
pub enum Genre {
    #[default]
    #[strum(to_string = "RPG / Open World", serialize = "rpg-open-world")]
    #[serde(rename = "RPG / Open World", alias = "rpg-open-world")]
    RpgOpenWorld,
    #[strum(to_string = "FPS / Competitive", serialize = "fps-competitive")]
    #[serde(rename = "FPS / Competitive", alias = "fps-competitive")]
    FpsCompetitive,
    #[strum(to_string = "MOBA / Strategy", serialize = "moba-strategy")]
    #[serde(rename = "MOBA / Strategy", alias = "moba-strategy")]
    MobaStrategy,
    #[strum(to_string = "Puzzle / Logic", serialize = "puzzle-logic")]
    #[serde(rename = "Puzzle / Logic", alias = "puzzle-logic")]
    PuzzleLogic,
    #[strum(to_string = "Retro / Arcade", serialize = "retro-arcade")]
    #[serde(rename = "Retro / Arcade", alias = "retro-arcade")]
    RetroArcade,
}

impl Genre {
    /// Display labels of every genre, in selector order.
    pub fn labels() -> Vec<String> {
        Genre::iter().map(|g| g.to_string()).collect()
    }
}

/// Append-only, chronologically ordered message history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages (fewer if the transcript is shorter), oldest first.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

impl FromIterator<Message> for Transcript {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

/// Everything one user session owns: its selections and its transcript.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub model: Option<String>,
    pub genre: Genre,
    pub transcript: Transcript,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(model: Option<String>, genre: Genre) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            genre,
            transcript: Transcript::new(),
            created_at: Utc::now(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
