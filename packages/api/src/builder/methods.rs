//! Terminal methods producing requests (GET, HEAD, DELETE, POST, PUT, PATCH)
//!
//! Each terminal takes the URL and the handler that will receive the result,
//! and returns a [`Request`] ready for [`RequestQueue::add`](quarry_client::RequestQueue::add).

use quarry_client::error::{self, Error};
use quarry_client::http::{FnHandler, Method, Request, ResponseHandler};
use serde::de::DeserializeOwned;

use crate::builder::core::{BodyNotSet, BodySet, RequestBuilder};

/// Handler decoding the response body as JSON into `T`
pub type JsonHandler<T> = FnHandler<T>;

/// Build a handler that deserializes JSON bodies
///
/// # Examples
/// ```no_run
/// #[derive(serde::Deserialize)]
/// struct Item {
///     id: u64,
/// }
///
/// let request = quarry::json().get(
///     "https://api.example.com/items/1",
///     quarry::json_handler(|item: Item| println!("{}", item.id), |err| eprintln!("{err}")),
/// );
/// ```
pub fn json_handler<T: DeserializeOwned + Send + 'static>(
    on_response: impl Fn(T) + Send + Sync + 'static,
    on_error: impl Fn(Error) + Send + Sync + 'static,
) -> JsonHandler<T> {
    FnHandler::new(
        |response| serde_json::from_slice(&response.data).map_err(error::parse),
        on_response,
        on_error,
    )
}

impl RequestBuilder<BodyNotSet> {
    /// Build a GET request
    #[must_use]
    pub fn get<H: ResponseHandler>(self, url: &str, handler: H) -> Request {
        self.build(Method::GET, url, handler)
    }

    /// Build a HEAD request
    #[must_use]
    pub fn head<H: ResponseHandler>(self, url: &str, handler: H) -> Request {
        self.build(Method::HEAD, url, handler)
    }

    /// Build a DELETE request
    #[must_use]
    pub fn delete<H: ResponseHandler>(self, url: &str, handler: H) -> Request {
        self.build(Method::DELETE, url, handler)
    }
}

impl RequestBuilder<BodySet> {
    /// Build a POST request carrying the body
    #[must_use]
    pub fn post<H: ResponseHandler>(self, url: &str, handler: H) -> Request {
        self.build(Method::POST, url, handler)
    }

    /// Build a PUT request carrying the body
    #[must_use]
    pub fn put<H: ResponseHandler>(self, url: &str, handler: H) -> Request {
        self.build(Method::PUT, url, handler)
    }

    /// Build a PATCH request carrying the body
    #[must_use]
    pub fn patch<H: ResponseHandler>(self, url: &str, handler: H) -> Request {
        self.build(Method::PATCH, url, handler)
    }
}
