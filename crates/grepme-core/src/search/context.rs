//! Selection of the messages printed around a match.

use crate::groupme::models::Message;

/// How many messages to show on each side of a match.
///
/// `before` counts messages sent before the match, `after` those sent after.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextWindow {
    /// Older messages to include.
    pub before: usize,
    /// Newer messages to include.
    pub after: usize,
}

impl ContextWindow {
    /// Combine `-b`, `-a` and `-c`; `context` overrides both sides.
    #[must_use]
    pub fn resolve(before: usize, after: usize, context: Option<usize>) -> Self {
        context.map_or(Self { before, after }, |n| Self {
            before: n,
            after: n,
        })
    }
}

/// Messages around `page[index]` in chronological order.
///
/// `page` is newest-first, so newer messages sit at smaller indices. The
/// window is clamped to the page; messages on neighbouring pages are not
/// included. An out-of-range `index` gives an empty window.
#[must_use]
pub fn context_window(page: &[Message], index: usize, window: ContextWindow) -> Vec<&Message> {
    if index >= page.len() {
        return Vec::new();
    }
    let start = index.saturating_sub(window.after);
    let end = index.saturating_add(window.before).min(page.len() - 1);
    page[start..=end].iter().rev().collect()
}
