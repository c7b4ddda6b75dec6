//! grepme: grep for GroupMe.
//!
//! The binary is a thin shell over this crate. [`search_all`] resolves
//! conversations by name, walks their history newest-first one page at a
//! time, and hands every matching message to a [`MatchSink`]. Everything
//! network-facing sits behind the [`Transport`] trait so the pipeline can be
//! driven from memory in tests.

pub mod cache;
pub mod config;
pub mod error;
pub mod groupme;
pub mod paths;
pub mod schema;
pub mod search;
pub mod session;

#[cfg(test)]
mod test_support;

pub use cache::ResponseCache;
pub use config::{ApiConfig, AppConfig, CacheConfig, LogLevel, LoggingConfig, PathsConfig, SearchConfig};
pub use error::{CoreError, Result};
pub use groupme::{
    ApiRequest, Attachment, AuthManager, Conversation, ConversationKind, Fetched, GroupMeClient,
    Message, TokenStorage, Transport,
};
pub use paths::AppPaths;
pub use schema::{generate_example_config, generate_schema};
pub use search::{
    ContextWindow, FavoriteFilter, Hit, MatchConfig, MatchResult, MatchSink, MatchSpan,
    SearchRequest, SearchSummary, context_window, display_text, filter_message, search_all,
};
pub use session::Session;

/// Binary name, and the directory name under each XDG base directory.
pub const APP_NAME: &str = "grepme";

/// Project homepage, referenced in bug-report hints.
pub const HOMEPAGE: &str = "https://github.com/jyn514/grepme";

/// Prefix for settings overrides, e.g. `GREPME__API__PAGE_SIZE`.
#[must_use]
pub fn env_prefix() -> String {
    APP_NAME.to_ascii_uppercase().replace('-', "_")
}
