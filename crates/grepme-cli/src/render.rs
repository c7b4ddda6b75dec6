//! Terminal and JSON-lines output.

use std::io::Write;

use chrono::DateTime;
use grepme_core::search::{MatchConfig, MatchSink, context_window, display_text};
use grepme_core::{Conversation, CoreError, Message};

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const PURPLE: &str = "\x1b[35m";
const RESET: &str = "\x1b[0m";

/// What to show for each message.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Emit ANSI color codes.
    pub color: bool,
    /// One JSON object per line instead of text.
    pub json: bool,
    /// Prefix messages with their send time.
    pub date: bool,
    /// Prefix messages with the author name.
    pub show_users: bool,
}

/// Writes conversation headers and matches to `out`.
#[derive(Debug)]
pub struct TerminalRenderer<W> {
    out: W,
    options: RenderOptions,
}

impl<W: Write> TerminalRenderer<W> {
    pub const fn new(out: W, options: RenderOptions) -> Self {
        Self { out, options }
    }

    /// Print one line for a conversation in `--list` output.
    pub fn list_conversation(&mut self, conversation: &Conversation) -> Result<(), CoreError> {
        if self.options.json {
            let line = serde_json::to_string(conversation)
                .map_err(|e| CoreError::Serialization(format!("serializing conversation: {e}")))?;
            writeln!(self.out, "{line}")?;
        } else {
            writeln!(self.out, "{}", conversation.name)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CoreError> {
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn write_message(&mut self, message: &Message) -> Result<(), CoreError> {
        if self.options.json {
            let line = serde_json::to_string(message)
                .map_err(|e| CoreError::Serialization(format!("serializing message: {e}")))?;
            writeln!(self.out, "{line}")?;
            return Ok(());
        }

        if self.options.date {
            if self.options.color {
                write!(self.out, "{GREEN}")?;
            }
            match DateTime::from_timestamp(message.created_at, 0) {
                Some(sent) => write!(self.out, "{}: ", sent.format("%c"))?,
                None => write!(self.out, "{}: ", message.created_at)?,
            }
        }
        if self.options.show_users {
            if self.options.color {
                write!(self.out, "{PURPLE}")?;
            }
            write!(self.out, "{}: ", message.author_name)?;
        }
        if self.options.color {
            write!(self.out, "{RESET}")?;
        }
        writeln!(self.out, "{}", display_text(message).unwrap_or_default())?;
        Ok(())
    }
}

impl<W: Write> MatchSink for TerminalRenderer<W> {
    fn begin_conversation(&mut self, conversation: &Conversation) -> Result<(), CoreError> {
        if self.options.json {
            return Ok(());
        }
        if self.options.color {
            writeln!(self.out, "{YELLOW}--- {} ---{RESET}", conversation.name)?;
        } else {
            writeln!(self.out, "--- {} ---", conversation.name)?;
        }
        Ok(())
    }

    fn emit(&mut self, page: &[Message], index: usize, config: &MatchConfig) -> Result<(), CoreError> {
        for message in context_window(page, index, config.context) {
            self.write_message(message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grepme_core::search::compile_alternation;
    use grepme_core::{ContextWindow, ConversationKind};
    use serde_json::{Value, json};

    fn message(id: &str, text: &str, author: &str) -> Message {
        serde_json::from_value(json!({
            "id": id,
            "text": text,
            "name": author,
            "created_at": 0,
            "favorited_by": [],
            "attachments": [],
            "group_id": "1"
        }))
        .expect("message")
    }

    fn render(options: RenderOptions, page: &[Message], index: usize, context: ContextWindow) -> String {
        let mut config = MatchConfig::new(compile_alternation(&["x"], false).expect("pattern"));
        config.context = context;
        let mut renderer = TerminalRenderer::new(Vec::new(), options);
        renderer.emit(page, index, &config).expect("emit");
        String::from_utf8(renderer.into_inner()).expect("utf8")
    }

    fn plain() -> RenderOptions {
        RenderOptions {
            show_users: true,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn text_output_with_context() {
        let page = [
            message("3", "newest", "Ada"),
            message("2", "match", "Grace"),
            message("1", "oldest", "Alan"),
        ];
        let out = render(plain(), &page, 1, ContextWindow { before: 1, after: 1 });
        assert_eq!(out, "Alan: oldest\nGrace: match\nAda: newest\n");
    }

    #[test]
    fn quiet_date_and_color() {
        let page = [message("1", "hi", "Ada")];
        let options = RenderOptions {
            color: true,
            date: true,
            ..RenderOptions::default()
        };
        let out = render(options, &page, 0, ContextWindow::default());
        assert_eq!(out, "\x1b[32mThu Jan  1 00:00:00 1970: \x1b[0mhi\n");
    }

    #[test]
    fn json_lines_keep_server_fields() {
        let page = [message("1", "hi", "Ada")];
        let options = RenderOptions {
            json: true,
            ..plain()
        };
        let out = render(options, &page, 0, ContextWindow::default());
        let value: Value = serde_json::from_str(out.trim_end()).expect("json line");
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["group_id"], "1");
    }

    #[test]
    fn headers() {
        let conversation = Conversation {
            id: "1".to_string(),
            name: "ACM".to_string(),
            kind: ConversationKind::Group,
        };

        let mut renderer = TerminalRenderer::new(Vec::new(), plain());
        renderer.begin_conversation(&conversation).expect("header");
        assert_eq!(renderer.into_inner(), b"--- ACM ---\n");

        let colored = RenderOptions {
            color: true,
            ..plain()
        };
        let mut renderer = TerminalRenderer::new(Vec::new(), colored);
        renderer.begin_conversation(&conversation).expect("header");
        assert_eq!(renderer.into_inner(), b"\x1b[33m--- ACM ---\x1b[0m\n");

        let json = RenderOptions {
            json: true,
            ..plain()
        };
        let mut renderer = TerminalRenderer::new(Vec::new(), json);
        renderer.begin_conversation(&conversation).expect("header");
        renderer.list_conversation(&conversation).expect("list");
        let out = String::from_utf8(renderer.into_inner()).expect("utf8");
        assert_eq!(out, "{\"id\":\"1\",\"name\":\"ACM\",\"kind\":\"group\"}\n");
    }
}
