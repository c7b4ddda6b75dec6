//! Matching messages of one conversation, page by page.

use crate::CoreError;
use crate::groupme::models::{Conversation, Message};
use crate::groupme::transport::Transport;
use crate::search::decorate::decorate_match;
use crate::search::filter::{MatchConfig, MatchResult, MatchSpan, filter_message};
use crate::search::paginate::{MessagePages, Paginator};
use crate::session::Session;

/// A matched message together with the page it was found on.
///
/// The page is newest-first and serves as the buffer for context.
#[derive(Debug)]
pub struct Hit<'p> {
    /// Page containing the match, already decorated.
    pub page: &'p [Message],
    /// Index of the matched message within `page`.
    pub index: usize,
    /// Where the text matched, before decoration.
    pub span: MatchSpan,
}

/// Lazy search over the history of one conversation.
///
/// A new page is requested only once every message of the current one has
/// been checked.
#[derive(Debug)]
pub struct MessageSearch<'s, T: Transport> {
    pages: Paginator<MessagePages<'s, T>>,
    config: &'s MatchConfig,
    highlight: bool,
    page: Vec<Message>,
    position: usize,
}

impl<'s, T: Transport> MessageSearch<'s, T> {
    /// Search `conversation` with `config`. `highlight` colors the matches.
    pub const fn new(
        session: &'s Session<T>,
        conversation: &'s Conversation,
        config: &'s MatchConfig,
        highlight: bool,
    ) -> Self {
        Self {
            pages: Paginator::new(MessagePages::new(session, conversation)),
            config,
            highlight,
            page: Vec::new(),
            position: 0,
        }
    }

    /// Next matching message, newest first.
    ///
    /// # Errors
    ///
    /// Returns the transport error if a page cannot be fetched.
    pub async fn next_hit(&mut self) -> Result<Option<Hit<'_>>, CoreError> {
        loop {
            while self.position < self.page.len() {
                let index = self.position;
                self.position += 1;
                if let MatchResult::Match(span) = filter_message(&self.page[index], self.config) {
                    decorate_match(&mut self.page[index], &span, self.config, self.highlight);
                    return Ok(Some(Hit {
                        page: &self.page,
                        index,
                        span,
                    }));
                }
            }

            match self.pages.next_page().await? {
                Some(page) => {
                    self.page = page;
                    self.position = 0;
                }
                None => return Ok(None),
            }
        }
    }
}
