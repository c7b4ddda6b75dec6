//! Typed GroupMe endpoints on top of a [`Transport`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::CoreError;
use crate::groupme::models::{ChatRecord, Conversation, ConversationKind, GroupRecord, Message, UserRecord};
use crate::groupme::transport::{ApiRequest, Fetched, Transport};

/// Fetch one page of messages older than `before_id` (newest-first).
///
/// Only pages anchored at a `before_id` are cacheable; the newest page is
/// always fetched live.
///
/// # Errors
///
/// Returns an error if the request fails or the payload is malformed.
pub async fn message_page<T: Transport>(
    transport: &T,
    conversation: &Conversation,
    before_id: Option<&str>,
    limit: u32,
) -> Result<Fetched<Vec<Message>>, CoreError> {
    let (request, field) = match conversation.kind {
        ConversationKind::Group => (
            ApiRequest::new(format!(
                "/groups/{}/messages",
                urlencoding::encode(&conversation.id)
            )),
            "messages",
        ),
        ConversationKind::DirectMessage => (
            ApiRequest::new("/direct_messages").param("other_user_id", &conversation.id),
            "direct_messages",
        ),
    };
    let request = request
        .param_opt("before_id", before_id)
        .param("limit", limit)
        .cacheable(before_id.is_some());

    let fetched = transport.get(&request).await?;
    match fetched {
        Fetched::Data(mut payload) => {
            let messages = payload.get_mut(field).map(Value::take).unwrap_or_default();
            parse_list(messages, field).map(Fetched::Data)
        }
        Fetched::EndOfStream => Ok(Fetched::EndOfStream),
    }
}

/// Fetch one page (1-based) of group chats or direct-message threads.
///
/// # Errors
///
/// Returns an error if the request fails or the payload is malformed.
pub async fn conversation_page<T: Transport>(
    transport: &T,
    kind: ConversationKind,
    page: u32,
    per_page: u32,
) -> Result<Fetched<Vec<Conversation>>, CoreError> {
    let request = match kind {
        ConversationKind::Group => ApiRequest::new("/groups").param("omit", "memberships"),
        ConversationKind::DirectMessage => ApiRequest::new("/chats"),
    }
    .param("page", page)
    .param("per_page", per_page);

    match transport.get(&request).await? {
        Fetched::Data(payload) => {
            let conversations = match kind {
                ConversationKind::Group => parse_list::<GroupRecord>(payload, "groups")?
                    .into_iter()
                    .map(Conversation::from)
                    .collect(),
                ConversationKind::DirectMessage => parse_list::<ChatRecord>(payload, "chats")?
                    .into_iter()
                    .map(Conversation::from)
                    .collect(),
            };
            Ok(Fetched::Data(conversations))
        }
        Fetched::EndOfStream => Ok(Fetched::EndOfStream),
    }
}

/// Look up the user ID behind the current access token.
///
/// # Errors
///
/// Returns an error if the request fails or returns no user.
pub async fn current_user_id<T: Transport>(transport: &T) -> Result<String, CoreError> {
    match transport.get(&ApiRequest::new("/users/me")).await? {
        Fetched::Data(payload) => {
            let user: UserRecord = serde_json::from_value(payload)
                .map_err(|e| CoreError::Serialization(format!("parsing current user: {e}")))?;
            log::debug!("logged in as {} ({})", user.name, user.id);
            Ok(user.id)
        }
        Fetched::EndOfStream => Err(CoreError::Api("could not get current user".to_string())),
    }
}

fn parse_list<T: DeserializeOwned>(payload: Value, what: &str) -> Result<Vec<T>, CoreError> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(payload)
        .map_err(|e| CoreError::Serialization(format!("parsing {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeTransport, group, message_json};
    use serde_json::json;

    #[tokio::test]
    async fn newest_page_is_not_cacheable() {
        let transport = FakeTransport::default();
        transport.respond(
            "/groups/7/messages?limit=100",
            json!({"count": 1, "messages": [message_json("10", "hi", "Ada")]}),
        );

        let page = message_page(&transport, &group("7", "ACM"), None, 100)
            .await
            .expect("page");
        let Fetched::Data(messages) = page else {
            panic!("expected data");
        };
        assert_eq!(messages.len(), 1);
        assert!(!transport.requests()[0].cacheable);
    }

    #[tokio::test]
    async fn older_pages_are_cacheable_and_anchored() {
        let transport = FakeTransport::default();
        transport.respond(
            "/groups/7/messages?before_id=10&limit=50",
            json!({"messages": []}),
        );

        let page = message_page(&transport, &group("7", "ACM"), Some("10"), 50)
            .await
            .expect("page");
        assert_eq!(page, Fetched::Data(Vec::new()));
        assert!(transport.requests()[0].cacheable);
    }

    #[tokio::test]
    async fn direct_messages_use_other_user_id() {
        let transport = FakeTransport::default();
        transport.respond(
            "/direct_messages?limit=100&other_user_id=55",
            json!({"direct_messages": [message_json("3", "yo", "Grace")]}),
        );
        let dm = Conversation {
            id: "55".to_string(),
            name: "Grace".to_string(),
            kind: ConversationKind::DirectMessage,
        };

        let page = message_page(&transport, &dm, None, 100).await.expect("page");
        assert!(matches!(page, Fetched::Data(ref m) if m[0].author_name == "Grace"));
    }

    #[tokio::test]
    async fn chats_become_direct_message_conversations() {
        let transport = FakeTransport::default();
        transport.respond(
            "/chats?page=1&per_page=100",
            json!([{"other_user": {"id": "55", "name": "Grace"}}]),
        );

        let page = conversation_page(&transport, ConversationKind::DirectMessage, 1, 100)
            .await
            .expect("page");
        assert_eq!(
            page,
            Fetched::Data(vec![Conversation {
                id: "55".to_string(),
                name: "Grace".to_string(),
                kind: ConversationKind::DirectMessage,
            }])
        );
    }

    #[tokio::test]
    async fn missing_user_is_an_error() {
        let transport = FakeTransport::default();
        let err = current_user_id(&transport).await.expect_err("no user");
        assert!(matches!(err, CoreError::Api(_)));
    }
}
