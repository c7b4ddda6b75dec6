//! The seam between the search pipeline and the network.

use std::future::Future;

use serde_json::Value;

use crate::CoreError;

/// Outcome of a fetch: data, or the server telling us there is nothing more.
///
/// End of history is an ordinary value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    /// The request produced data.
    Data(T),
    /// HTTP 304 or a `null` payload: pagination is over.
    EndOfStream,
}

impl<T> Fetched<T> {
    /// Transform the payload, keeping end-of-stream as is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Self::Data(data) => Fetched::Data(f(data)),
            Self::EndOfStream => Fetched::EndOfStream,
        }
    }
}

/// A GET request against the API, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Endpoint path, e.g. `/groups/123/messages`.
    pub path: String,
    /// Query parameters in insertion order.
    pub query: Vec<(&'static str, String)>,
    /// Whether the response may be served from or stored in the cache.
    pub cacheable: bool,
}

impl ApiRequest {
    /// A non-cacheable request without parameters.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            cacheable: false,
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    /// Append a query parameter if a value is present.
    #[must_use]
    pub fn param_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Mark the request as cacheable or not.
    #[must_use]
    pub const fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// Stable key identifying this request in the response cache.
    ///
    /// Parameters are sorted so that insertion order does not matter.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut pairs: Vec<_> = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        pairs.sort_unstable();
        format!("{}?{}", self.path, pairs.join("&"))
    }
}

/// Authenticated read access to the API.
///
/// Implementations return the unwrapped `response` payload of the JSON
/// envelope.
pub trait Transport {
    /// Perform a GET request.
    fn get(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<Fetched<Value>, CoreError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_ignores_parameter_order() {
        let a = ApiRequest::new("/groups/1/messages")
            .param("before_id", "99")
            .param("limit", 100);
        let b = ApiRequest::new("/groups/1/messages")
            .param("limit", 100)
            .param("before_id", "99");
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), "/groups/1/messages?before_id=99&limit=100");
    }

    #[test]
    fn cache_key_escapes_values() {
        let request = ApiRequest::new("/direct_messages").param("other_user_id", "a b&c");
        assert_eq!(
            request.cache_key(),
            "/direct_messages?other_user_id=a%20b%26c"
        );
    }

    #[test]
    fn optional_params_are_skipped() {
        let request = ApiRequest::new("/groups/1/messages").param_opt("before_id", None::<&str>);
        assert!(request.query.is_empty());
    }
}
