//! Network response envelope and parsed response

use std::any::Any;
use std::time::Duration;

use bytes::Bytes;

use super::{Headers, header_value};
use crate::cache::CacheEntry;
use crate::error::Error;

/// Type-erased parse result carried between dispatchers and delivery
pub type Payload = Box<dyn Any + Send>;

/// Raw response as returned by a [`Network`](crate::network::Network)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkResponse {
    pub status_code: u16,
    pub data: Bytes,
    pub headers: Headers,
    /// True when the server answered 304 and `data` was taken from the cache
    pub not_modified: bool,
    pub network_time: Duration,
}

impl NetworkResponse {
    pub fn new(status_code: u16, data: Bytes) -> Self {
        Self {
            status_code,
            data,
            ..Self::default()
        }
    }

    /// Envelope used to parse a cache hit as if it were a fresh 200.
    pub fn from_cache(data: Bytes, headers: Headers) -> Self {
        Self {
            status_code: 200,
            data,
            headers,
            not_modified: false,
            network_time: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Result of parsing a [`NetworkResponse`] for delivery.
#[derive(Debug)]
pub struct Response<T = Payload> {
    pub result: Result<T, Error>,
    /// Entry to write back to the cache, `None` when the response is not cacheable
    pub cache_entry: Option<CacheEntry>,
    /// Set for a soft-expired cache hit that will be followed by a refresh
    pub intermediate: bool,
}

impl<T> Response<T> {
    pub fn success(value: T, cache_entry: Option<CacheEntry>) -> Self {
        Self {
            result: Ok(value),
            cache_entry,
            intermediate: false,
        }
    }

    pub fn error(error: Error) -> Self {
        Self {
            result: Err(error),
            cache_entry: None,
            intermediate: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            result: self.result.map(f),
            cache_entry: self.cache_entry,
            intermediate: self.intermediate,
        }
    }
}
