//! GroupMe API access.
//!
//! This module provides:
//! - Wire models for messages, groups and direct-message chats
//! - The [`Transport`] seam and its HTTPS implementation
//! - Typed endpoint helpers
//! - Access token storage and prompting

pub mod api;
pub mod auth;
pub mod client;
pub mod models;
pub mod storage;
pub mod transport;

pub use auth::{API_KEY_ENV, AuthManager};
pub use client::GroupMeClient;
pub use models::{Attachment, Conversation, ConversationKind, Message};
pub use storage::TokenStorage;
pub use transport::{ApiRequest, Fetched, Transport};
