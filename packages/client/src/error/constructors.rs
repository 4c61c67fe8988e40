use super::types::{BoxError, Error, Kind};
use crate::http::NetworkResponse;

/// Creates an `Error` for a transport failure where no server was reached.
pub fn no_connection<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::NoConnection).with(e.into())
}

/// Creates an `Error` for an attempt that hit its deadline.
pub fn timeout() -> Error {
    Error::new(Kind::Timeout)
}

/// Creates an `Error` for a 401/403 answer.
pub fn auth_failure(response: NetworkResponse) -> Error {
    Error::new(Kind::AuthFailure).with_response(response)
}

/// Creates an `Error` for a 301/302 answer.
pub fn redirect(response: NetworkResponse) -> Error {
    Error::new(Kind::Redirect).with_response(response)
}

/// Creates an `Error` for any other unsuccessful status.
pub fn server(response: NetworkResponse) -> Error {
    Error::new(Kind::Server).with_response(response)
}

/// Creates an `Error` for a transport failure after the exchange started.
pub fn network<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Network).with(e.into())
}

/// Creates an `Error` for response bytes that could not be parsed.
pub fn parse<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Parse).with(e.into())
}

/// Creates an `Error` for an unreadable persisted cache record.
pub fn cache_format<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::CacheFormat).with(e.into())
}

/// Creates an `Error` for failures nothing else anticipated.
pub fn unexpected<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Unexpected).with(e.into())
}
