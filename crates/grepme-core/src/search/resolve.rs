//! Finding the conversations a `-g` pattern refers to.

use regex::Regex;

use crate::CoreError;
use crate::groupme::models::{Conversation, ConversationKind};
use crate::groupme::transport::Transport;
use crate::search::paginate::{ConversationPages, Paginator};
use crate::session::Session;

/// Lazily enumerates conversations whose name matches a pattern.
///
/// Direct messages are listed before groups, each in API order.
#[derive(Debug)]
pub struct ConversationResolver<'s, T: Transport> {
    session: &'s Session<T>,
    pattern: Option<&'s Regex>,
    remaining: Vec<ConversationKind>,
    current: Option<Paginator<ConversationPages<'s, T>>>,
    matched: usize,
}

impl<'s, T: Transport> ConversationResolver<'s, T> {
    /// Resolve `pattern` against every conversation; `None` lists them all.
    pub fn new(session: &'s Session<T>, pattern: Option<&'s Regex>, include_dms: bool) -> Self {
        // popped from the back
        let mut remaining = vec![ConversationKind::Group];
        if include_dms {
            remaining.push(ConversationKind::DirectMessage);
        }
        Self {
            session,
            pattern,
            remaining,
            current: None,
            matched: 0,
        }
    }

    /// Next matching conversation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] at the end if a pattern was given and
    /// nothing matched it, or the transport error if a listing fails.
    pub async fn next(&mut self) -> Result<Option<Conversation>, CoreError> {
        loop {
            if self.current.is_none() {
                let Some(kind) = self.remaining.pop() else {
                    return self.finish();
                };
                self.current = Some(Paginator::new(ConversationPages::new(self.session, kind)));
            }
            let Some(paginator) = self.current.as_mut() else {
                continue;
            };

            match paginator.next().await? {
                Some(conversation) if self.admits(&conversation) => {
                    self.matched += 1;
                    return Ok(Some(conversation));
                }
                Some(_) => {}
                None => self.current = None,
            }
        }
    }

    fn admits(&self, conversation: &Conversation) -> bool {
        self.pattern
            .is_none_or(|pattern| pattern.is_match(&conversation.name))
    }

    fn finish(&mut self) -> Result<Option<Conversation>, CoreError> {
        match self.pattern {
            Some(pattern) if self.matched == 0 => {
                // only report once
                self.matched = usize::MAX;
                Err(CoreError::NotFound(pattern.as_str().to_string()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use serde_json::json;

    fn session() -> Session<FakeTransport> {
        let transport = FakeTransport::default();
        transport.respond(
            "/chats?page=1&per_page=100",
            json!([
                {"other_user": {"id": "55", "name": "Grace Hopper"}},
                {"other_user": {"id": "56", "name": "Alan"}}
            ]),
        );
        transport.respond(
            "/groups?omit=memberships&page=1&per_page=100",
            json!([{"id": "1", "name": "ACM"}, {"id": "2", "name": "ACM Officers"}]),
        );
        transport.respond(
            "/groups?omit=memberships&page=2&per_page=100",
            json!([]),
        );
        Session::new(transport, 100)
    }

    async fn collect<T: Transport>(
        resolver: &mut ConversationResolver<'_, T>,
    ) -> Result<Vec<String>, CoreError> {
        let mut names = Vec::new();
        while let Some(conversation) = resolver.next().await? {
            names.push(conversation.name);
        }
        Ok(names)
    }

    #[tokio::test]
    async fn direct_messages_come_first() {
        let session = session();
        let mut resolver = ConversationResolver::new(&session, None, true);
        assert_eq!(
            collect(&mut resolver).await.expect("list"),
            ["Grace Hopper", "Alan", "ACM", "ACM Officers"]
        );
    }

    #[tokio::test]
    async fn pattern_search_is_unanchored() {
        let session = session();
        let pattern = Regex::new("CM").expect("regex");
        let mut resolver = ConversationResolver::new(&session, Some(&pattern), true);
        assert_eq!(
            collect(&mut resolver).await.expect("resolve"),
            ["ACM", "ACM Officers"]
        );
    }

    #[tokio::test]
    async fn direct_messages_can_be_skipped() {
        let session = session();
        let pattern = Regex::new("Grace").expect("regex");
        let mut resolver = ConversationResolver::new(&session, Some(&pattern), false);
        let err = collect(&mut resolver).await.expect_err("not found");
        assert!(matches!(err, CoreError::NotFound(ref p) if p == "Grace"));
        assert!(
            !session
                .transport()
                .request_keys()
                .iter()
                .any(|key| key.starts_with("/chats"))
        );
    }

    #[tokio::test]
    async fn unmatched_pattern_is_not_found() {
        let session = session();
        let pattern = Regex::new("Chess").expect("regex");
        let mut resolver = ConversationResolver::new(&session, Some(&pattern), true);
        assert!(matches!(resolver.next().await, Err(CoreError::NotFound(_))));
        assert_eq!(resolver.next().await.expect("done"), None);
    }
}
