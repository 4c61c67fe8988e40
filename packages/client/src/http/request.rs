//! The request type shared between caller, queues, dispatchers and delivery
//!
//! A `Request` is created by the caller, handed to
//! [`RequestQueue::add`](crate::queue::RequestQueue::add) and from then on moves
//! between stages as an `Arc<Request>`. Everything the pipeline mutates after
//! submission lives behind an atomic or a mutex, so a hand-off is just moving
//! the `Arc`.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use serde::{Deserialize, Serialize};

use super::handler::{ErasedHandler, ResponseHandler};
use super::response::{NetworkResponse, Payload, Response};
use super::Headers;
use crate::cache::CacheEntry;
use crate::error::Error;
use crate::queue::QueueState;
use crate::retry::{DefaultRetryPolicy, RetryPolicy};
use crate::telemetry::MarkerLog;

/// Requests that live longer than this get their marker log at debug level.
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(3000);

const DEFAULT_BODY_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Scheduling priority. Higher variants are served first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Immediate,
}

/// A unit of work resolved by the queue
pub struct Request {
    method: Method,
    url: String,
    redirect_url: Mutex<Option<String>>,
    cache_key: Option<String>,
    priority: Priority,
    sequence: AtomicU64,
    should_cache: bool,
    tag: Option<String>,
    headers: Headers,
    body: Option<Bytes>,
    body_content_type: Option<String>,

    canceled: AtomicBool,
    delivered: AtomicBool,
    finished: AtomicBool,

    retry_policy: Mutex<Box<dyn RetryPolicy>>,
    cache_entry: Mutex<Option<CacheEntry>>,
    markers: MarkerLog,
    queue: OnceLock<Weak<QueueState>>,
    handler: Box<dyn ErasedHandler>,
}

impl Request {
    pub fn new<H>(method: Method, url: impl Into<String>, handler: H) -> Self
    where
        H: ResponseHandler,
    {
        Self {
            method,
            url: url.into(),
            redirect_url: Mutex::new(None),
            cache_key: None,
            priority: Priority::Normal,
            sequence: AtomicU64::new(0),
            should_cache: true,
            tag: None,
            headers: Headers::new(),
            body: None,
            body_content_type: None,
            canceled: AtomicBool::new(false),
            delivered: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            retry_policy: Mutex::new(Box::new(DefaultRetryPolicy::default())),
            cache_entry: Mutex::new(None),
            markers: MarkerLog::new(),
            queue: OnceLock::new(),
            handler: Box::new(handler),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_should_cache(mut self, should_cache: bool) -> Self {
        self.should_cache = should_cache;
        self
    }

    /// Override the derived cache key
    #[must_use]
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.body_content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Mutex::new(Box::new(policy));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The URL to hit next: the redirect target once one was recorded,
    /// otherwise the URL the request was created with.
    pub fn url(&self) -> String {
        lock(&self.redirect_url)
            .clone()
            .unwrap_or_else(|| self.url.clone())
    }

    pub fn origin_url(&self) -> &str {
        &self.url
    }

    pub fn set_redirect_url(&self, url: impl Into<String>) {
        *lock(&self.redirect_url) = Some(url.into());
    }

    /// Identity used for caching and request coalescing.
    ///
    /// GET requests are keyed by URL alone; other methods are prefixed with the
    /// method name so a POST never collides with a GET of the same URL.
    pub fn cache_key(&self) -> String {
        match (&self.cache_key, &self.method) {
            (Some(key), _) => key.clone(),
            (None, method) if *method == Method::GET => self.url.clone(),
            (None, method) => format!("{}-{}", method.as_str(), self.url),
        }
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    pub(crate) fn set_sequence(&self, sequence: u64) {
        self.sequence.store(sequence, Ordering::Release);
    }

    pub fn should_cache(&self) -> bool {
        self.should_cache
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn body_content_type(&self) -> &str {
        self.body_content_type
            .as_deref()
            .unwrap_or(DEFAULT_BODY_CONTENT_TYPE)
    }

    /// Mark this request canceled. Delivery will never happen afterwards.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub fn mark_delivered(&self) {
        self.delivered.store(true, Ordering::Release);
    }

    pub fn has_had_response_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Per-attempt timeout from the retry policy
    pub fn timeout(&self) -> Duration {
        self.retry_policy().current_timeout()
    }

    pub fn retry_policy(&self) -> MutexGuard<'_, Box<dyn RetryPolicy>> {
        lock(&self.retry_policy)
    }

    pub fn cache_entry(&self) -> Option<CacheEntry> {
        lock(&self.cache_entry).clone()
    }

    pub fn set_cache_entry(&self, entry: Option<CacheEntry>) {
        *lock(&self.cache_entry) = entry;
    }

    pub fn add_marker(&self, name: impl Into<String>) {
        self.markers.add(name);
    }

    pub fn markers(&self) -> &MarkerLog {
        &self.markers
    }

    pub(crate) fn bind(&self, queue: Weak<QueueState>) {
        if self.queue.set(queue).is_err() {
            tracing::warn!(
                target: "quarry::request",
                url = %self.url,
                "Request added to a queue twice, keeping the first binding"
            );
        }
    }

    /// Canceled, or claimed by the handler's intercept hook.
    pub(crate) fn is_discarded(&self) -> bool {
        self.is_canceled() || self.handler.erased_intercept()
    }

    /// Terminate the request. Only the first call has an effect.
    pub fn finish(self: &Arc<Self>, tag: &str) {
        if self.finished.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                target: "quarry::request",
                url = %self.url,
                tag,
                "Request finished twice"
            );
            return;
        }

        self.markers.add(tag);

        if let Some(queue) = self.queue.get().and_then(Weak::upgrade) {
            queue.finish(self);
        }

        let elapsed = self.markers.elapsed();
        if elapsed >= SLOW_REQUEST_THRESHOLD {
            tracing::debug!(
                target: "quarry::request",
                url = %self.url,
                elapsed_ms = elapsed.as_millis() as u64,
                markers = %self.markers,
                "Slow request finished"
            );
        } else {
            tracing::trace!(
                target: "quarry::request",
                url = %self.url,
                elapsed_ms = elapsed.as_millis() as u64,
                markers = %self.markers,
                "Request finished"
            );
        }
    }

    pub(crate) fn parse_network_response(&self, response: &NetworkResponse) -> Response<Payload> {
        self.handler.erased_parse(response)
    }

    pub(crate) fn parse_network_error(&self, error: Error) -> Error {
        self.handler.erased_parse_error(error)
    }

    pub(crate) fn deliver_response(&self, payload: Payload) {
        self.handler.erased_deliver(payload);
    }

    pub(crate) fn deliver_error(&self, error: Error) {
        self.handler.erased_deliver_error(error);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("priority", &self.priority)
            .field("sequence", &self.sequence())
            .field("canceled", &self.is_canceled())
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FnHandler;

    fn request(method: Method, url: &str) -> Request {
        Request::new(method, url, FnHandler::bytes(|_| {}, |_| {}))
    }

    #[test]
    fn test_cache_key_derivation() {
        assert_eq!(request(Method::GET, "http://a/x").cache_key(), "http://a/x");
        assert_eq!(
            request(Method::POST, "http://a/x").cache_key(),
            "POST-http://a/x"
        );
        assert_eq!(
            request(Method::POST, "http://a/x")
                .with_cache_key("custom")
                .cache_key(),
            "custom"
        );
    }

    #[test]
    fn test_priority_order() {
        assert!(Priority::Immediate > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_redirect_changes_url_but_not_key() {
        let req = request(Method::GET, "http://a/old");
        req.set_redirect_url("http://a/new");
        assert_eq!(req.url(), "http://a/new");
        assert_eq!(req.origin_url(), "http://a/old");
        assert_eq!(req.cache_key(), "http://a/old");
    }

    #[test]
    fn test_finish_is_exactly_once() {
        let req = Arc::new(request(Method::GET, "http://a/x"));
        req.finish("done");
        req.finish("done-again");
        assert!(req.is_finished());
        assert_eq!(req.markers().names(), vec!["done".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let req = request(Method::GET, "http://a/x");
        assert!(req.should_cache());
        assert!(!req.is_canceled());
        assert_eq!(req.timeout(), Duration::from_millis(2500));
        assert!(req.body_content_type().starts_with("application/x-www-form-urlencoded"));
    }
}
