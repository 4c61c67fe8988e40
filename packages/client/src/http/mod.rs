//! Request and response types shared by every stage of the pipeline
//!
//! This module provides the request type that travels through the queues, the
//! raw network response envelope, the parsed `Response` handed to delivery and
//! the `ResponseHandler` hook that turns one into the other.

use std::collections::BTreeMap;

pub mod handler;
pub mod request;
pub mod response;

pub use handler::*;
pub use request::*;
pub use response::*;

pub use http::Method;

/// Header map used on both sides of the network layer.
///
/// Names keep the case they arrived with; use [`header_value`] for lookups.
pub type Headers = BTreeMap<String, String>;

/// Case-insensitive header lookup
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
