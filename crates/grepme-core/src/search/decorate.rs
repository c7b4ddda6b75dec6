//! Rewrites applied to a matched message before it is rendered.
//!
//! The filter only reports where a message matched; turning that span into
//! `-o` output or a highlighted line happens here.

use crate::groupme::models::Message;
use crate::search::filter::{MatchConfig, MatchSpan};

/// Escape sequence starting a highlighted match.
pub const HIGHLIGHT_START: &str = "\x1b[31m";
/// Escape sequence ending a highlighted match.
pub const HIGHLIGHT_END: &str = "\x1b[0m";

/// Rewrite the text of a matched message in place.
///
/// With `only_matching` the text is cut down to the matched part. With
/// `highlight` (and not in reverse mode) the match is wrapped in terminal
/// color codes. Messages without text, or with an [`MatchSpan::Empty`]
/// span, are left alone.
pub fn decorate_match(message: &mut Message, span: &MatchSpan, config: &MatchConfig, highlight: bool) {
    let (Some(text), MatchSpan::Bytes(range)) = (message.text.as_mut(), span) else {
        return;
    };
    let Some(matched) = text.get(range.clone()) else {
        log::debug!("match span {range:?} out of bounds for message {}", message.id);
        return;
    };

    let mut range = range.clone();
    if config.only_matching {
        *text = matched.to_string();
        range = 0..text.len();
    }
    if highlight && !config.reverse {
        text.insert_str(range.end, HIGHLIGHT_END);
        text.insert_str(range.start, HIGHLIGHT_START);
    }
}

/// Text to print for a message: its text followed by one `image: <url>` line
/// per image attachment.
///
/// Returns `None` for messages with neither text nor images.
#[must_use]
pub fn display_text(message: &Message) -> Option<String> {
    let images: Vec<&str> = message
        .attachments
        .iter()
        .filter_map(|attachment| attachment.image_url())
        .collect();

    let mut out = match (&message.text, images.is_empty()) {
        (None, true) => return None,
        (Some(text), true) => return Some(text.clone()),
        (Some(text), false) => format!("{text}\n"),
        (None, false) => String::new(),
    };
    for url in images {
        out.push_str("\nimage: ");
        out.push_str(url);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupme::models::Attachment;
    use crate::search::filter::{MatchResult, compile_alternation, filter_message};
    use crate::test_support::message;

    fn decorated(text: &str, pattern: &str, only_matching: bool, highlight: bool) -> String {
        let mut config = MatchConfig::new(compile_alternation(&[pattern], false).expect("pattern"));
        config.only_matching = only_matching;
        let mut msg = message("1", text);
        let MatchResult::Match(span) = filter_message(&msg, &config) else {
            panic!("expected a match");
        };
        decorate_match(&mut msg, &span, &config, highlight);
        msg.text.expect("text")
    }

    fn image(url: &str) -> Attachment {
        Attachment {
            kind: "image".to_string(),
            url: Some(url.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn highlight_wraps_span() {
        assert_eq!(
            decorated("say hello there", "hello", false, true),
            "say \x1b[31mhello\x1b[0m there"
        );
        assert_eq!(decorated("say hello there", "hello", false, false), "say hello there");
    }

    #[test]
    fn only_matching_keeps_span() {
        assert_eq!(decorated("say hello there", "hel+o", true, false), "hello");
        assert_eq!(
            decorated("say hello there", "hel+o", true, true),
            "\x1b[31mhello\x1b[0m"
        );
    }

    #[test]
    fn reverse_and_empty_spans_are_untouched() {
        let mut config = MatchConfig::new(compile_alternation(&["x"], false).expect("pattern"));
        config.reverse = true;
        let mut msg = message("1", "abc");
        decorate_match(&mut msg, &MatchSpan::Empty, &config, true);
        decorate_match(&mut msg, &MatchSpan::Bytes(0..1), &config, true);
        assert_eq!(msg.text.as_deref(), Some("abc"));
    }

    #[test]
    fn images_are_appended() {
        let mut msg = message("1", "look");
        msg.attachments = vec![image("https://i.groupme.com/a.png")];
        assert_eq!(
            display_text(&msg).as_deref(),
            Some("look\n\nimage: https://i.groupme.com/a.png")
        );

        msg.text = None;
        assert_eq!(
            display_text(&msg).as_deref(),
            Some("\nimage: https://i.groupme.com/a.png")
        );
    }

    #[test]
    fn display_text_does_not_accumulate() {
        let mut msg = message("1", "look");
        msg.attachments = vec![image("u")];
        assert_eq!(display_text(&msg), display_text(&msg));
        assert_eq!(msg.text.as_deref(), Some("look"));
    }

    #[test]
    fn nothing_to_display() {
        let mut msg = message("1", "");
        msg.text = None;
        assert_eq!(display_text(&msg), None);
        assert_eq!(display_text(&message("1", "plain")).as_deref(), Some("plain"));
    }
}
