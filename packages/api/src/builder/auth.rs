//! Authentication headers for requests
//!
//! API keys, basic credentials and bearer tokens.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::{HeaderName, HeaderValue};

use crate::builder::core::RequestBuilder;
use crate::builder::headers::header;

impl<S> RequestBuilder<S> {
    /// Set an `X-API-Key` header
    #[must_use]
    pub fn api_key(self, key: &str) -> Self {
        match HeaderValue::from_str(key) {
            Ok(value) => self.header(HeaderName::from_static(header::X_API_KEY), value),
            Err(_) => self, // Skip invalid header value
        }
    }

    /// Set a Basic `Authorization` header from a user name and password
    ///
    /// # Examples
    /// ```no_run
    /// let builder = quarry::json().basic_auth("user", "secret");
    /// ```
    #[must_use]
    pub fn basic_auth(self, user: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        match HeaderValue::from_str(&format!("Basic {encoded}")) {
            Ok(value) => self.header(header::AUTHORIZATION, value),
            Err(_) => self,
        }
    }

    /// Set a Bearer `Authorization` header
    #[must_use]
    pub fn bearer_auth(self, token: &str) -> Self {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => self.header(header::AUTHORIZATION, value),
            Err(_) => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::core::RequestBuilder;

    #[test]
    fn test_basic_auth_encoding() {
        let builder = RequestBuilder::new().basic_auth("Aladdin", "open sesame");
        assert_eq!(
            builder.headers.get("authorization").map(String::as_str),
            Some("Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==")
        );
    }

    #[test]
    fn test_bearer_and_api_key() {
        let builder = RequestBuilder::new().bearer_auth("tok").api_key("k-1");
        assert_eq!(
            builder.headers.get("authorization").map(String::as_str),
            Some("Bearer tok")
        );
        assert_eq!(builder.headers.get("x-api-key").map(String::as_str), Some("k-1"));
    }

    #[test]
    fn test_invalid_token_is_skipped() {
        let builder = RequestBuilder::new().bearer_auth("line\nbreak");
        assert!(builder.headers.is_empty());
    }
}
