//! Request payload construction for one turn.

use crate::attachment::ImageAttachment;
use crate::message::Message;
use crate::session::{Genre, Transcript};

/// Number of prior transcript entries carried into each request.
pub const HISTORY_WINDOW: usize = 4;

/// The coach persona, parameterised by genre.
pub fn system_prompt(genre: Genre) -> String {
    format!(
        "You are an elite eSports Coach and Game Guide expert. Genre: {genre}. \
         Analyze the image and text to provide strategic advice. Be concise and tactical."
    )
}

/// Build the ordered message list for a turn.
///
/// `history` is the transcript *before* the current turn. The result is the
/// system message, the last [`HISTORY_WINDOW`] history entries verbatim, then
/// the current user turn. With an attachment the current turn is a structured
/// message holding the prompt text followed by the image.
pub fn build_payload(
    history: &Transcript,
    genre: Genre,
    prompt: &str,
    attachment: Option<&ImageAttachment>,
) -> Vec<Message> {
    let recent = history.recent(HISTORY_WINDOW);
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::system(system_prompt(genre)));
    messages.extend_from_slice(recent);
    messages.push(match attachment {
        Some(image) => Message::user_with_image(prompt, image.to_data_uri()),
        None => Message::user(prompt),
    });
    messages
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentPart, MessageContent, Role};

    fn history(len: usize) -> Transcript {
        (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{i}"))
                } else {
                    Message::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    fn jpeg() -> ImageAttachment {
        ImageAttachment::from_upload(Some("shot.jpg"), vec![0xFF, 0xD8, 0xFF, 0xE0]).unwrap()
    }

    #[test]
    fn system_prompt_embeds_genre() {
        let p = system_prompt(Genre::FpsCompetitive);
        assert!(p.starts_with("You are an elite eSports Coach"));
        assert!(p.contains("Genre: FPS / Competitive."));
    }

    #[test]
    fn long_history_is_cut_to_last_four_in_order() {
        let h = history(7);
        let payload = build_payload(&h, Genre::default(), "next?", None);
        assert_eq!(payload.len(), 1 + HISTORY_WINDOW + 1);
        assert_eq!(payload[0].role, Role::System);
        assert_eq!(&payload[1..5], h.recent(4));
        let texts: Vec<String> = payload[1..5].iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["a3", "q4", "a5", "q6"]);
    }

    #[test]
    fn short_history_is_carried_whole() {
        let h = history(2);
        let payload = build_payload(&h, Genre::default(), "next?", None);
        assert_eq!(payload.len(), 4);
        assert_eq!(&payload[1..3], h.as_slice());
    }

    #[test]
    fn text_turn_is_plain_user_string() {
        let prompt = "what's the counter to aggro decks?";
        let payload = build_payload(&Transcript::new(), Genre::default(), prompt, None);
        let last = payload.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, MessageContent::Text(prompt.into()));
    }

    #[test]
    fn image_turn_is_text_then_jpeg_data_uri() {
        let image = jpeg();
        let payload = build_payload(
            &history(3),
            Genre::MobaStrategy,
            "best rotation?",
            Some(&image),
        );
        let last = payload.last().unwrap();
        assert_eq!(last.role, Role::User);
        let MessageContent::Parts(parts) = &last.content else {
            panic!("expected structured content");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0],
            ContentPart::Text {
                text: "best rotation?".into()
            }
        );
        match &parts[1] {
            ContentPart::ImageUrl { image_url } => {
                assert!(image_url.url.starts_with("data:image/jpeg;base64,"))
            }
            other => panic!("expected image part, got {other:?}"),
        }
        // No plain-text duplicate of the current turn precedes it.
        assert_eq!(payload.len(), 1 + 3 + 1);
    }

    #[test]
    fn building_twice_is_identical() {
        let h = history(9);
        let image = jpeg();
        let a = build_payload(&h, Genre::PuzzleLogic, "hint", Some(&image));
        let b = build_payload(&h, Genre::PuzzleLogic, "hint", Some(&image));
        assert_eq!(a, b);
    }
}
