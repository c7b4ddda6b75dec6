//! Cursor-driven, page-at-a-time traversal of paginated endpoints.

use std::collections::VecDeque;
use std::future::Future;

use crate::CoreError;
use crate::groupme::api;
use crate::groupme::models::{Conversation, ConversationKind, Message};
use crate::groupme::transport::{Fetched, Transport};
use crate::session::Session;

/// Something that can be fetched one page at a time.
pub trait PageSource {
    /// Element type of a page.
    type Item;
    /// Position of the next page.
    type Cursor: PartialEq + std::fmt::Debug;

    /// Fetch the page at `cursor`, or the first page for `None`.
    fn fetch(
        &mut self,
        cursor: Option<&Self::Cursor>,
    ) -> impl Future<Output = Result<Fetched<Vec<Self::Item>>, CoreError>>;

    /// Cursor for the page following `page`, which was fetched at `previous`.
    ///
    /// Only called with non-empty pages.
    fn cursor_after(&self, previous: Option<&Self::Cursor>, page: &[Self::Item])
    -> Option<Self::Cursor>;
}

/// Lazy sequence over a [`PageSource`].
///
/// Pages are fetched only when the previous one has been consumed. The
/// sequence ends at the first empty page or end-of-stream signal, after which
/// the source is never called again.
pub struct Paginator<S: PageSource> {
    source: S,
    cursor: Option<S::Cursor>,
    buffer: VecDeque<S::Item>,
    exhausted: bool,
}

impl<S: PageSource> std::fmt::Debug for Paginator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl<S: PageSource> Paginator<S> {
    /// Start paginating from the first page of `source`.
    pub const fn new(source: S) -> Self {
        Self {
            source,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Fetch the next whole page, or `None` once the sequence has ended.
    ///
    /// Items buffered by [`Paginator::next`] are not included.
    ///
    /// # Errors
    ///
    /// Returns the transport error. The paginator is finished afterwards.
    pub async fn next_page(&mut self) -> Result<Option<Vec<S::Item>>, CoreError> {
        if self.exhausted {
            return Ok(None);
        }

        let fetched = match self.source.fetch(self.cursor.as_ref()).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.exhausted = true;
                return Err(e);
            }
        };
        let page = match fetched {
            Fetched::Data(page) if !page.is_empty() => page,
            Fetched::Data(_) | Fetched::EndOfStream => {
                self.exhausted = true;
                return Ok(None);
            }
        };

        let next = self.source.cursor_after(self.cursor.as_ref(), &page);
        match next {
            Some(next) if self.cursor.as_ref() != Some(&next) => self.cursor = Some(next),
            Some(next) => {
                log::warn!("pagination cursor did not advance past {next:?}, stopping");
                self.exhausted = true;
            }
            None => self.exhausted = true,
        }
        Ok(Some(page))
    }

    /// Next single item, fetching a new page when the buffer runs dry.
    ///
    /// # Errors
    ///
    /// Returns the transport error. The paginator is finished afterwards.
    pub async fn next(&mut self) -> Result<Option<S::Item>, CoreError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(page) => self.buffer.extend(page),
                None => return Ok(None),
            }
        }
    }
}

/// Message history of one conversation, newest page first.
#[derive(Debug)]
pub struct MessagePages<'s, T> {
    session: &'s Session<T>,
    conversation: &'s Conversation,
}

impl<'s, T: Transport> MessagePages<'s, T> {
    /// Pages of `conversation`, walking back from the newest message.
    pub const fn new(session: &'s Session<T>, conversation: &'s Conversation) -> Self {
        Self {
            session,
            conversation,
        }
    }
}

impl<T: Transport> PageSource for MessagePages<'_, T> {
    type Item = Message;
    type Cursor = String;

    async fn fetch(&mut self, cursor: Option<&String>) -> Result<Fetched<Vec<Message>>, CoreError> {
        api::message_page(
            self.session.transport(),
            self.conversation,
            cursor.map(String::as_str),
            self.session.page_size(),
        )
        .await
    }

    fn cursor_after(&self, _previous: Option<&String>, page: &[Message]) -> Option<String> {
        page.last().map(|message| message.id.clone())
    }
}

/// Listing of all conversations of one kind.
#[derive(Debug)]
pub struct ConversationPages<'s, T> {
    session: &'s Session<T>,
    kind: ConversationKind,
}

impl<'s, T: Transport> ConversationPages<'s, T> {
    /// Pages of group chats or of direct-message threads.
    pub const fn new(session: &'s Session<T>, kind: ConversationKind) -> Self {
        Self { session, kind }
    }
}

impl<T: Transport> PageSource for ConversationPages<'_, T> {
    type Item = Conversation;
    type Cursor = u32;

    async fn fetch(&mut self, cursor: Option<&u32>) -> Result<Fetched<Vec<Conversation>>, CoreError> {
        api::conversation_page(
            self.session.transport(),
            self.kind,
            cursor.copied().unwrap_or(1),
            self.session.page_size(),
        )
        .await
    }

    fn cursor_after(&self, previous: Option<&u32>, _page: &[Conversation]) -> Option<u32> {
        Some(previous.map_or(2, |page| page + 1))
    }
}
