//! Per-run state shared by the search pipeline.

use tokio::sync::OnceCell;

use crate::CoreError;
use crate::groupme::api;
use crate::groupme::transport::Transport;

/// An authenticated API session.
///
/// Holds the transport, the page size used for every list request and the
/// ID of the logged-in user, which is looked up at most once.
#[derive(Debug)]
pub struct Session<T> {
    transport: T,
    page_size: u32,
    user_id: OnceCell<String>,
}

impl<T: Transport> Session<T> {
    /// Create a session over `transport`.
    pub fn new(transport: T, page_size: u32) -> Self {
        Self {
            transport,
            page_size,
            user_id: OnceCell::new(),
        }
    }

    /// The underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of items requested per page.
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// ID of the user the token belongs to, fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails. A failed lookup is retried on
    /// the next call.
    pub async fn logged_in_user(&self) -> Result<&str, CoreError> {
        self.user_id
            .get_or_try_init(|| api::current_user_id(&self.transport))
            .await
            .map(String::as_str)
    }
}
