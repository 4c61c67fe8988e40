//! Core `RequestBuilder` structures and base functionality
//!
//! Holds the builder state and the per-request scheduling options (priority,
//! tag, caching, retry) shared by every terminal method.

use std::fmt;

use bytes::Bytes;
use quarry_client::config::RetryConfig;
use quarry_client::http::{Headers, Method, Priority, Request, ResponseHandler};

/// Content type enumeration for the body helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// application/json content type
    ApplicationJson,
    /// application/x-www-form-urlencoded content type
    ApplicationFormUrlEncoded,
    /// application/octet-stream content type
    ApplicationOctetStream,
    /// text/plain content type
    TextPlain,
}

impl ContentType {
    /// Convert content type to string representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::ApplicationJson => "application/json",
            ContentType::ApplicationFormUrlEncoded => "application/x-www-form-urlencoded",
            ContentType::ApplicationOctetStream => "application/octet-stream",
            ContentType::TextPlain => "text/plain",
        }
    }
}

impl From<&str> for ContentType {
    fn from(s: &str) -> Self {
        match s {
            "application/x-www-form-urlencoded" => ContentType::ApplicationFormUrlEncoded,
            "application/octet-stream" => ContentType::ApplicationOctetStream,
            "text/plain" => ContentType::TextPlain,
            _ => ContentType::ApplicationJson,
        }
    }
}

/// State marker indicating no body has been set
#[derive(Debug, Clone, Copy)]
pub struct BodyNotSet;

/// State marker indicating a body has been set
#[derive(Debug, Clone, Copy)]
pub struct BodySet;

/// Fluent builder producing queue-ready [`Request`]s
///
/// Type parameter `S` tracks the body state:
/// - `BodyNotSet`: body methods and `get`/`head`/`delete` available
/// - `BodySet`: only `post`/`put`/`patch` available
#[derive(Clone)]
pub struct RequestBuilder<S = BodyNotSet> {
    pub(crate) headers: Headers,
    pub(crate) content_type: ContentType,
    pub(crate) body: Option<Bytes>,
    pub(crate) priority: Priority,
    pub(crate) tag: Option<String>,
    pub(crate) should_cache: bool,
    pub(crate) cache_key: Option<String>,
    pub(crate) retry: RetryConfig,
    pub(crate) debug_enabled: bool,
    pub(crate) state: S,
}

impl Default for RequestBuilder<BodyNotSet> {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder<BodyNotSet> {
    /// Start building a request with default scheduling options
    #[must_use]
    pub fn new() -> Self {
        Self {
            headers: Headers::new(),
            content_type: ContentType::ApplicationJson,
            body: None,
            priority: Priority::Normal,
            tag: None,
            should_cache: true,
            cache_key: None,
            retry: RetryConfig::default(),
            debug_enabled: false,
            state: BodyNotSet,
        }
    }

    /// Shorthand for a JSON request
    #[must_use]
    pub fn json() -> Self {
        Self::new().content_type(ContentType::ApplicationJson)
    }

    /// Shorthand for a form-urlencoded request
    #[must_use]
    pub fn form_urlencoded() -> Self {
        Self::new().content_type(ContentType::ApplicationFormUrlEncoded)
    }
}

impl<S> RequestBuilder<S> {
    /// Log each built request at debug level
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.debug_enabled = true;
        self
    }

    /// Set the body content type
    #[must_use]
    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Scheduling priority; higher priorities are dispatched first
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Tag used by [`RequestQueue::cancel_all_tagged`](quarry_client::RequestQueue::cancel_all_tagged)
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Skip the cache entirely: no lookup, no staging, no write
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.should_cache = false;
        self
    }

    /// Override the cache key derived from method and URL
    #[must_use]
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Replace the whole retry configuration
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set retry attempts for failed requests
    ///
    /// # Arguments
    /// * `attempts` - Number of retry attempts (0 disables retries)
    #[must_use]
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_retries = attempts;
        self
    }

    /// Timeout of the first attempt in milliseconds
    #[must_use]
    pub fn timeout_ms(mut self, millis: u64) -> Self {
        self.retry.initial_timeout_ms = millis;
        self
    }

    pub(crate) fn with_state<T>(self, body: Option<Bytes>, state: T) -> RequestBuilder<T> {
        RequestBuilder {
            headers: self.headers,
            content_type: self.content_type,
            body,
            priority: self.priority,
            tag: self.tag,
            should_cache: self.should_cache,
            cache_key: self.cache_key,
            retry: self.retry,
            debug_enabled: self.debug_enabled,
            state,
        }
    }

    /// Assemble the request for `method` and `url`.
    pub(crate) fn build<H: ResponseHandler>(self, method: Method, url: &str, handler: H) -> Request {
        if self.debug_enabled {
            tracing::debug!(
                target: "quarry::request",
                method = %method,
                url,
                priority = ?self.priority,
                should_cache = self.should_cache,
                body_len = self.body.as_ref().map_or(0, Bytes::len),
                "Built request"
            );
        }

        let mut request = Request::new(method, url, handler)
            .with_headers(self.headers)
            .with_priority(self.priority)
            .with_should_cache(self.should_cache)
            .with_retry_policy(self.retry.policy());

        if let Some(body) = self.body {
            request = request.with_body(body, self.content_type.as_str());
        }
        if let Some(tag) = self.tag {
            request = request.with_tag(tag);
        }
        if let Some(key) = self.cache_key {
            request = request.with_cache_key(key);
        }
        request
    }
}

impl<S> fmt::Debug for RequestBuilder<S>
where
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("headers", &self.headers)
            .field("content_type", &self.content_type)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .field("priority", &self.priority)
            .field("tag", &self.tag)
            .field("should_cache", &self.should_cache)
            .field("retry", &self.retry)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_client::http::FnHandler;

    #[test]
    fn test_defaults_carry_into_request() {
        let request =
            RequestBuilder::new().build(Method::GET, "http://a/", FnHandler::bytes(|_| {}, |_| {}));
        assert_eq!(request.priority(), Priority::Normal);
        assert!(request.should_cache());
        assert_eq!(request.tag(), None);
        assert_eq!(request.timeout().as_millis(), 2500);
        assert_eq!(request.cache_key(), "http://a/");
    }

    #[test]
    fn test_scheduling_options() {
        let request = RequestBuilder::new()
            .priority(Priority::High)
            .tag("feed")
            .no_cache()
            .cache_key("custom")
            .timeout_ms(900)
            .retry_attempts(2)
            .build(Method::GET, "http://a/", FnHandler::bytes(|_| {}, |_| {}));

        assert_eq!(request.priority(), Priority::High);
        assert_eq!(request.tag(), Some("feed"));
        assert!(!request.should_cache());
        assert_eq!(request.cache_key(), "custom");
        assert_eq!(request.timeout().as_millis(), 900);
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!(ContentType::from("text/plain"), ContentType::TextPlain);
        assert_eq!(ContentType::from("whatever"), ContentType::ApplicationJson);
    }
}
