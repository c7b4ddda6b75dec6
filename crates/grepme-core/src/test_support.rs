//! In-memory transport and fixtures shared by the unit tests.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::{Value, json};

use crate::CoreError;
use crate::groupme::{ApiRequest, Conversation, ConversationKind, Fetched, Message, Transport};

/// Serves canned payloads keyed by [`ApiRequest::cache_key`] and records
/// every request. Unknown requests answer with end-of-stream, like a 304.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: RefCell<HashMap<String, Value>>,
    failures: RefCell<HashMap<String, u16>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn respond(&self, key: &str, payload: Value) {
        self.responses.borrow_mut().insert(key.to_string(), payload);
    }

    pub fn fail(&self, key: &str, status: u16) {
        self.failures.borrow_mut().insert(key.to_string(), status);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_keys(&self) -> Vec<String> {
        self.requests.borrow().iter().map(ApiRequest::cache_key).collect()
    }
}

impl Transport for FakeTransport {
    async fn get(&self, request: &ApiRequest) -> Result<Fetched<Value>, CoreError> {
        self.requests.borrow_mut().push(request.clone());
        let key = request.cache_key();
        if let Some(status) = self.failures.borrow().get(&key) {
            return Err(CoreError::Status {
                status: *status,
                url: key,
                body: String::new(),
            });
        }
        Ok(self
            .responses
            .borrow()
            .get(&key)
            .cloned()
            .map_or(Fetched::EndOfStream, Fetched::Data))
    }
}

pub fn group(id: &str, name: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        name: name.to_string(),
        kind: ConversationKind::Group,
    }
}

pub fn message_json(id: &str, text: &str, author: &str) -> Value {
    json!({
        "id": id,
        "text": text,
        "name": author,
        "created_at": 1_500_000_000,
        "favorited_by": [],
        "attachments": []
    })
}

pub fn message(id: &str, text: &str) -> Message {
    serde_json::from_value(message_json(id, text, "Ada")).expect("fixture message")
}

/// A newest-first page of messages with IDs counting down from `first_id`.
pub fn page_json(first_id: u64, texts: &[&str]) -> Value {
    let messages: Vec<Value> = texts
        .iter()
        .zip((0..).map(|offset| first_id - offset))
        .map(|(text, id)| message_json(&id.to_string(), text, "Ada"))
        .collect();
    json!({ "count": messages.len(), "messages": messages })
}
