//! The error type shared by the grepme library and binary.

use thiserror::Error;

/// Everything that can stop a search.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reading or writing a local file, or stdout, failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON from the API or for `--json` output could not be produced.
    #[error("could not (de)serialize: {0}")]
    Serialization(String),

    /// Missing or rejected credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No conversation name matched the requested pattern.
    #[error("no conversation matches '{0}'")]
    NotFound(String),

    /// The API answered with a status code we do not know how to handle.
    #[error("got bad status code {status} when querying {url}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Final request URL (without credentials).
        url: String,
        /// Response body, possibly empty.
        body: String,
    },

    /// Connection, TLS or envelope failures talking to GroupMe.
    #[error("GroupMe request failed: {0}")]
    Api(String),

    /// A search pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The on-disk response cache failed.
    #[error("cache error: {0}")]
    Cache(String),
}

/// Shorthand for results carrying a [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
