//! GroupMe API client over HTTPS.
//!
//! Every request is a GET against the v3 REST API, authenticated with the
//! `X-Access-Token` header. Responses come wrapped in a `{"response": ...}`
//! envelope which is unwrapped here.
//!
//! Status handling:
//! 1. 2xx: parse the envelope (a `null` payload means end of data)
//! 2. 304 Not Modified: end of data
//! 3. 401: the token was rejected
//! 4. anything else: surfaced with the URL so it can be reported

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::ResponseCache;
use crate::config::ApiConfig;
use crate::groupme::transport::{ApiRequest, Fetched, Transport};
use crate::{CoreError, HOMEPAGE};

/// GroupMe API client.
pub struct GroupMeClient {
    http_client: Client,
    base_url: String,
    token: String,
    cache: Option<ResponseCache>,
}

impl std::fmt::Debug for GroupMeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupMeClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Value,
}

/// How a response status is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusClass {
    Success,
    EndOfStream,
    Unauthorized,
    Unexpected,
}

const fn classify(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        304 => StatusClass::EndOfStream,
        401 => StatusClass::Unauthorized,
        _ => StatusClass::Unexpected,
    }
}

impl GroupMeClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(
        api: &ApiConfig,
        token: String,
        cache: Option<ResponseCache>,
    ) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(api.timeout.max(1)))
            .user_agent(concat!("grepme/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Api(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            token,
            cache,
        })
    }

    async fn cached(&self, request: &ApiRequest) -> Option<Value> {
        let cache = self.cache.as_ref().filter(|_| request.cacheable)?;
        match cache.get(&request.cache_key()).await {
            Ok(hit) => hit,
            Err(e) => {
                log::warn!("ignoring unreadable response cache: {e}");
                None
            }
        }
    }

    async fn store(&self, request: &ApiRequest, payload: &Value) {
        let Some(cache) = self.cache.as_ref().filter(|_| request.cacheable) else {
            return;
        };
        if !worth_caching(payload) {
            return;
        }
        if let Err(e) = cache.put(&request.cache_key(), payload).await {
            log::warn!("could not write response cache: {e}");
        }
    }

    async fn fetch(&self, request: &ApiRequest) -> Result<Fetched<Value>, CoreError> {
        let url = format!("{}{}", self.base_url, request.path);
        log::debug!("GET {url} {:?}", request.query);

        let response = self
            .http_client
            .get(&url)
            .header("X-Access-Token", &self.token)
            .query(&request.query)
            .send()
            .await
            .map_err(|e| CoreError::Api(format!("request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Api(format!("reading response from {final_url}: {e}")))?;
        interpret(status, &final_url, &body)
    }
}

/// Turn a finished response into a payload or an error.
fn interpret(status: u16, url: &str, body: &str) -> Result<Fetched<Value>, CoreError> {
    match classify(status) {
        StatusClass::Success => {
            if status != 200 {
                log::warn!(
                    "unexpected status code {status} when querying {url}. \
                     Please open an issue at {HOMEPAGE}/issues/new"
                );
            }
            let envelope: Envelope = serde_json::from_str(body)
                .map_err(|e| CoreError::Serialization(format!("parsing response: {e}")))?;
            if envelope.response.is_null() {
                return Ok(Fetched::EndOfStream);
            }
            Ok(Fetched::Data(envelope.response))
        }
        StatusClass::EndOfStream => Ok(Fetched::EndOfStream),
        StatusClass::Unauthorized => Err(CoreError::Auth(
            "permission denied. Maybe you typed your token wrong? \
             Try changing it with -D."
                .to_string(),
        )),
        StatusClass::Unexpected => Err(CoreError::Status {
            status,
            url: url.to_string(),
            body: body.to_string(),
        }),
    }
}

/// An empty message page may still fill in later, so it is not kept.
fn worth_caching(payload: &Value) -> bool {
    payload
        .get("messages")
        .and_then(Value::as_array)
        .is_none_or(|messages| !messages.is_empty())
}

impl Transport for GroupMeClient {
    async fn get(&self, request: &ApiRequest) -> Result<Fetched<Value>, CoreError> {
        if let Some(hit) = self.cached(request).await {
            log::debug!("cache hit for {}", request.cache_key());
            return Ok(Fetched::Data(hit));
        }

        let fetched = self.fetch(request).await?;
        if let Fetched::Data(ref payload) = fetched {
            self.store(request, payload).await;
        }
        Ok(fetched)
    }
}
