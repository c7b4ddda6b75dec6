//! The retrieval and filtering pipeline.
//!
//! Conversations named by the `-g` patterns are resolved, then each one's
//! history is walked back page by page. Every message goes through
//! [`filter_message`]; matches are decorated and handed to a [`MatchSink`]
//! together with their page, which is the buffer context is taken from.

pub mod context;
pub mod decorate;
pub mod filter;
pub mod messages;
pub mod paginate;
pub mod resolve;

use std::collections::HashSet;

use regex::Regex;

pub use context::{ContextWindow, context_window};
pub use decorate::{HIGHLIGHT_END, HIGHLIGHT_START, decorate_match, display_text};
pub use filter::{
    FavoriteFilter, MatchConfig, MatchResult, MatchSpan, compile_alternation, compile_user_pattern,
    filter_message,
};
pub use messages::{Hit, MessageSearch};
pub use paginate::{ConversationPages, MessagePages, PageSource, Paginator};
pub use resolve::ConversationResolver;

use crate::CoreError;
use crate::groupme::models::{Conversation, Message};
use crate::groupme::transport::Transport;
use crate::session::Session;

/// Receives search results as they are found.
pub trait MatchSink {
    /// Called when a conversation is about to be searched, matches or not.
    ///
    /// # Errors
    ///
    /// Implementations return an error if output fails.
    fn begin_conversation(&mut self, conversation: &Conversation) -> Result<(), CoreError>;

    /// Called for every match; `page[index]` is the matched message.
    ///
    /// # Errors
    ///
    /// Implementations return an error if output fails.
    fn emit(&mut self, page: &[Message], index: usize, config: &MatchConfig) -> Result<(), CoreError>;
}

/// Parameters of one search run.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Conversation name patterns, searched in order.
    pub conversations: Vec<Regex>,
    /// Message filter.
    pub match_config: MatchConfig,
    /// Color the matched text.
    pub highlight: bool,
    /// Consider direct-message threads as well as groups.
    pub include_direct_messages: bool,
}

/// What a search run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSummary {
    /// Conversations searched.
    pub conversations: usize,
    /// Matches emitted.
    pub matches: usize,
    /// Conversation patterns that matched nothing.
    pub unmatched_patterns: Vec<String>,
}

/// Search every conversation matched by `request` and feed hits to `sink`.
///
/// Conversations are searched one at a time and each is searched once even
/// if several patterns match it. A pattern matching no conversation is
/// logged and skipped.
///
/// # Errors
///
/// Returns the first transport or sink error; the run stops there.
pub async fn search_all<T: Transport, K: MatchSink>(
    session: &Session<T>,
    request: &SearchRequest,
    sink: &mut K,
) -> Result<SearchSummary, CoreError> {
    let mut summary = SearchSummary::default();
    let mut seen = HashSet::new();

    for pattern in &request.conversations {
        let mut resolver =
            ConversationResolver::new(session, Some(pattern), request.include_direct_messages);
        loop {
            let conversation = match resolver.next().await {
                Ok(Some(conversation)) => conversation,
                Ok(None) => break,
                Err(CoreError::NotFound(pattern)) => {
                    log::warn!("no conversation matches '{pattern}'");
                    summary.unmatched_patterns.push(pattern);
                    break;
                }
                Err(e) => return Err(e),
            };
            if !seen.insert((conversation.kind, conversation.id.clone())) {
                log::debug!("already searched {}", conversation.name);
                continue;
            }

            log::info!("searching {}", conversation.name);
            summary.conversations += 1;
            sink.begin_conversation(&conversation)?;

            let mut search =
                MessageSearch::new(session, &conversation, &request.match_config, request.highlight);
            while let Some(hit) = search.next_hit().await? {
                summary.matches += 1;
                sink.emit(hit.page, hit.index, &request.match_config)?;
            }
        }
    }

    Ok(summary)
}
