//! Network layer
//!
//! [`Network`] is what the dispatchers call. [`BasicNetwork`] implements it
//! on top of an [`HttpStack`], the pluggable transport, and adds status
//! handling, conditional request headers, redirects and retries.

use std::io;
use std::time::Duration;

use bytes::Bytes;

pub mod basic;

pub use basic::BasicNetwork;

use crate::cache::CacheEntry;
use crate::cache::http_date::format_http_date;
use crate::error::Error;
use crate::http::{Headers, NetworkResponse, Request};

/// Performs a request and returns the raw response.
///
/// Implementations block the calling dispatcher thread for the whole
/// exchange, including retries.
pub trait Network: Send + Sync {
    fn perform_request(
        &self,
        request: &Request,
        additional_headers: &Headers,
    ) -> Result<NetworkResponse, Error>;
}

/// One raw HTTP exchange as seen by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl StackResponse {
    pub fn new(status_code: u16, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status_code,
            headers,
            body: Some(body.into()),
        }
    }
}

/// Transport failures an [`HttpStack`] can report
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error("socket timed out")]
    SocketTimeout,
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("malformed url: {0}")]
    MalformedUrl(String),
    /// Nothing was received from the server
    #[error("connection failed")]
    Io(#[source] io::Error),
    /// The server answered but the body could not be read to the end
    #[error("response body interrupted")]
    BodyInterrupted(#[source] io::Error),
}

/// Transport executing a single attempt.
///
/// Must send `additional_headers` on top of the request's own headers and
/// give up after `timeout`.
pub trait HttpStack: Send + Sync {
    fn perform_request(
        &self,
        request: &Request,
        additional_headers: &Headers,
        timeout: Duration,
    ) -> Result<StackResponse, StackError>;
}

/// Conditional request headers for revalidating `entry`.
pub fn cache_headers(entry: Option<&CacheEntry>) -> Headers {
    let mut headers = Headers::new();
    let Some(entry) = entry else {
        return headers;
    };

    if let Some(etag) = &entry.etag {
        headers.insert(http::header::IF_NONE_MATCH.to_string(), etag.clone());
    }

    if entry.last_modified > 0 {
        headers.insert(
            http::header::IF_MODIFIED_SINCE.to_string(),
            format_http_date(entry.last_modified),
        );
    }

    headers
}
