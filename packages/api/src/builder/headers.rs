//! Header management for request builders
//!
//! Headers are stored as plain strings on the request; `http` typed names and
//! values are accepted so invalid ones are rejected at the call site.

use http::{HeaderName, HeaderValue};

use crate::builder::core::{ContentType, RequestBuilder};

/// Helper type for accept method that can handle both strings and `ContentType` enums
pub enum AcceptValue {
    /// String representation of content type
    String(String),
    /// `ContentType` enum variant
    ContentType(ContentType),
}

impl AcceptValue {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AcceptValue::String(s) => s,
            AcceptValue::ContentType(ct) => ct.as_str(),
        }
    }
}

impl From<&str> for AcceptValue {
    fn from(s: &str) -> Self {
        AcceptValue::String(s.to_string())
    }
}

impl From<String> for AcceptValue {
    fn from(s: String) -> Self {
        AcceptValue::String(s)
    }
}

impl From<ContentType> for AcceptValue {
    fn from(ct: ContentType) -> Self {
        AcceptValue::ContentType(ct)
    }
}

/// Header constants for common HTTP headers
pub mod header {
    pub use http::header::*;

    /// Custom X-API-Key header for API authentication
    pub const X_API_KEY: &str = "x-api-key";
}

impl<S> RequestBuilder<S> {
    /// Add a header, replacing any previous value under the same name
    ///
    /// Values that are not visible ASCII are skipped.
    #[must_use]
    pub fn header(mut self, key: HeaderName, value: HeaderValue) -> Self {
        match value.to_str() {
            Ok(value) => {
                self.headers.insert(key.as_str().to_string(), value.to_string());
            }
            Err(_) => {
                tracing::warn!(
                    target: "quarry::request",
                    header = %key,
                    "Skipping non-ASCII header value"
                );
            }
        }
        self
    }

    /// Add multiple headers
    ///
    /// # Examples
    /// ```no_run
    /// let builder = quarry::json().headers([
    ///     ("user-agent", "MyApp/1.0"),
    ///     ("x-api-version", "v1"),
    /// ]);
    /// ```
    #[must_use]
    pub fn headers<'a>(mut self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (name, value) in headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => self = self.header(name, value),
                _ => continue, // Skip invalid header names
            }
        }
        self
    }

    /// Set the Accept header
    #[must_use]
    pub fn accept(self, accept: impl Into<AcceptValue>) -> Self {
        let accept = accept.into();
        match HeaderValue::from_str(accept.as_str()) {
            Ok(value) => self.header(header::ACCEPT, value),
            Err(_) => self,
        }
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(self, agent: &str) -> Self {
        match HeaderValue::from_str(agent) {
            Ok(value) => self.header(header::USER_AGENT, value),
            Err(_) => self,
        }
    }
}
