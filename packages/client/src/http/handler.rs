//! Response handlers: per-request parsing and delivery hooks
//!
//! Callers implement [`ResponseHandler`] for their output type. The queue
//! works with an erased form so requests of different output types can share
//! the same heaps; parse results cross the erasure as [`Payload`] and are
//! downcast back before delivery.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use http::Method;

use super::request::{Priority, Request};
use super::response::{NetworkResponse, Payload, Response};
use crate::cache::{Cache, header_parser};
use crate::delivery::Task;
use crate::error::{self, Error};

/// Parses raw responses into `Output` and hands results to the caller.
///
/// `deliver_response` and `deliver_error` run on the delivery executor. A
/// soft-expired cache hit calls `deliver_response` twice: once with the
/// cached value and once with the refreshed one.
pub trait ResponseHandler: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Runs on a worker thread. Must not block on the delivery context.
    fn parse_network_response(&self, response: &NetworkResponse) -> Response<Self::Output>;

    fn deliver_response(&self, output: Self::Output);

    fn deliver_error(&self, error: Error);

    /// Refine a network error before delivery, e.g. by decoding an error body.
    fn parse_network_error(&self, error: Error) -> Error {
        error
    }

    /// Called when a dispatcher picks the request up. Returning true discards
    /// the request without touching the cache or the network.
    fn intercept(&self) -> bool {
        false
    }
}

/// Object-safe view of a [`ResponseHandler`] used inside [`Request`].
pub(crate) trait ErasedHandler: Send + Sync {
    fn erased_parse(&self, response: &NetworkResponse) -> Response<Payload>;
    fn erased_deliver(&self, payload: Payload);
    fn erased_deliver_error(&self, error: Error);
    fn erased_parse_error(&self, error: Error) -> Error;
    fn erased_intercept(&self) -> bool;
}

impl<H: ResponseHandler> ErasedHandler for H {
    fn erased_parse(&self, response: &NetworkResponse) -> Response<Payload> {
        self.parse_network_response(response)
            .map(|output| Box::new(output) as Payload)
    }

    fn erased_deliver(&self, payload: Payload) {
        match payload.downcast::<H::Output>() {
            Ok(output) => self.deliver_response(*output),
            Err(_) => {
                tracing::error!(
                    target: "quarry::delivery",
                    expected = std::any::type_name::<H::Output>(),
                    "Parsed payload does not match the handler output type"
                );
                self.deliver_error(error::unexpected("payload type mismatch"));
            }
        }
    }

    fn erased_deliver_error(&self, error: Error) {
        self.deliver_error(error);
    }

    fn erased_parse_error(&self, error: Error) -> Error {
        self.parse_network_error(error)
    }

    fn erased_intercept(&self) -> bool {
        self.intercept()
    }
}

type ParseFn<T> = dyn Fn(&NetworkResponse) -> Result<T, Error> + Send + Sync;
type DeliverFn<T> = dyn Fn(T) + Send + Sync;
type ErrorFn = dyn Fn(Error) + Send + Sync;

/// Handler assembled from closures.
///
/// Parsed values are cached with freshness taken from the response's HTTP
/// cache headers.
pub struct FnHandler<T> {
    parse: Box<ParseFn<T>>,
    on_response: Box<DeliverFn<T>>,
    on_error: Box<ErrorFn>,
}

/// Handler delivering the raw response body
pub type BytesHandler = FnHandler<Bytes>;

/// Handler delivering the body decoded as text
pub type StringHandler = FnHandler<String>;

impl<T: Send + 'static> FnHandler<T> {
    pub fn new(
        parse: impl Fn(&NetworkResponse) -> Result<T, Error> + Send + Sync + 'static,
        on_response: impl Fn(T) + Send + Sync + 'static,
        on_error: impl Fn(Error) + Send + Sync + 'static,
    ) -> Self {
        Self {
            parse: Box::new(parse),
            on_response: Box::new(on_response),
            on_error: Box::new(on_error),
        }
    }
}

impl FnHandler<Bytes> {
    /// Delivers the raw response body.
    pub fn bytes(
        on_response: impl Fn(Bytes) + Send + Sync + 'static,
        on_error: impl Fn(Error) + Send + Sync + 'static,
    ) -> Self {
        Self::new(|response| Ok(response.data.clone()), on_response, on_error)
    }
}

impl FnHandler<String> {
    /// Decodes the body with the charset named in `Content-Type`,
    /// ISO-8859-1 when none is given.
    pub fn string(
        on_response: impl Fn(String) + Send + Sync + 'static,
        on_error: impl Fn(Error) + Send + Sync + 'static,
    ) -> Self {
        Self::new(decode_string, on_response, on_error)
    }
}

impl<T: Send + 'static> ResponseHandler for FnHandler<T> {
    type Output = T;

    fn parse_network_response(&self, response: &NetworkResponse) -> Response<T> {
        match (self.parse)(response) {
            Ok(value) => Response::success(value, header_parser::parse_cache_headers(response)),
            Err(e) => Response::error(e),
        }
    }

    fn deliver_response(&self, output: T) {
        (self.on_response)(output);
    }

    fn deliver_error(&self, error: Error) {
        (self.on_error)(error);
    }
}

fn decode_string(response: &NetworkResponse) -> Result<String, Error> {
    let charset = header_parser::parse_charset(&response.headers, "ISO-8859-1");

    if charset.eq_ignore_ascii_case("utf-8") || charset.eq_ignore_ascii_case("us-ascii") {
        String::from_utf8(response.data.to_vec()).map_err(error::parse)
    } else if charset.eq_ignore_ascii_case("iso-8859-1") || charset.eq_ignore_ascii_case("latin1")
    {
        Ok(response.data.iter().map(|&b| char::from(b)).collect())
    } else {
        Err(error::parse(format!("unsupported charset: {charset}")))
    }
}

/// Clears a cache when dispatched and never delivers.
///
/// Goes through the cache queue at [`Priority::Immediate`] so it runs ahead
/// of everything already waiting there. The optional callback runs on the
/// cache worker once the cache is empty.
pub struct ClearCacheHandler {
    cache: Arc<dyn Cache>,
    callback: Mutex<Option<Task>>,
}

impl ClearCacheHandler {
    pub fn new(cache: Arc<dyn Cache>, callback: Option<Task>) -> Self {
        Self {
            cache,
            callback: Mutex::new(callback),
        }
    }

    /// A ready-to-add request wrapping this handler.
    pub fn request(cache: Arc<dyn Cache>, callback: Option<Task>) -> Request {
        Request::new(Method::GET, "http://", Self::new(cache, callback))
            .with_priority(Priority::Immediate)
    }
}

impl ResponseHandler for ClearCacheHandler {
    type Output = ();

    fn parse_network_response(&self, _response: &NetworkResponse) -> Response<()> {
        Response::error(error::unexpected("cache clear requests have no response"))
    }

    fn deliver_response(&self, _output: ()) {}

    fn deliver_error(&self, _error: Error) {}

    fn intercept(&self) -> bool {
        self.cache.clear();
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            callback();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Headers;

    fn response_with_type(content_type: &str, body: &'static [u8]) -> NetworkResponse {
        let mut headers = Headers::new();
        headers.insert("Content-Type".into(), content_type.into());
        NetworkResponse::new(200, Bytes::from_static(body)).with_headers(headers)
    }

    #[test]
    fn test_string_decoding_honours_charset() {
        let utf8 = response_with_type("text/plain; charset=utf-8", "h\u{e9}".as_bytes());
        assert_eq!(decode_string(&utf8).ok().as_deref(), Some("h\u{e9}"));

        let latin1 = response_with_type("text/plain", b"h\xe9");
        assert_eq!(decode_string(&latin1).ok().as_deref(), Some("h\u{e9}"));

        let unknown = response_with_type("text/plain; charset=koi8-r", b"x");
        assert!(decode_string(&unknown).is_err_and(|e| e.is_parse()));
    }

    #[test]
    fn test_erased_roundtrip_delivers_typed_value() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handler = FnHandler::bytes(move |b| tx.send(b).unwrap_or(()), |_| {});
        let erased: &dyn ErasedHandler = &handler;

        let parsed = erased.erased_parse(&NetworkResponse::new(200, Bytes::from_static(b"abc")));
        let payload = parsed.result.ok().unwrap();
        erased.erased_deliver(payload);

        assert_eq!(rx.try_recv().ok(), Some(Bytes::from_static(b"abc")));
    }
}
