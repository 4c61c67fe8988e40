//! Request body handling
//!
//! Bodies are serialized eagerly according to the builder's content type:
//! JSON by default, form-urlencoded when selected.

use bytes::Bytes;
use serde::Serialize;

use crate::builder::core::{BodyNotSet, BodySet, ContentType, RequestBuilder};

impl RequestBuilder<BodyNotSet> {
    /// Serialize `body` as the request body
    ///
    /// A value that fails to serialize produces an empty body and a warning.
    ///
    /// # Examples
    /// ```no_run
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct User {
    ///     name: String,
    /// }
    ///
    /// let builder = quarry::json().body(&User { name: "Jo".into() });
    /// ```
    #[must_use]
    pub fn body<T: Serialize>(self, body: &T) -> RequestBuilder<BodySet> {
        let encoded = match self.content_type {
            ContentType::ApplicationFormUrlEncoded => {
                serde_urlencoded::to_string(body).map(String::into_bytes).map_err(|e| e.to_string())
            }
            _ => serde_json::to_vec(body).map_err(|e| e.to_string()),
        };

        let body_bytes = encoded.unwrap_or_else(|error| {
            tracing::warn!(
                target: "quarry::request",
                content_type = self.content_type.as_str(),
                %error,
                "Request body could not be serialized"
            );
            Vec::new()
        });

        if self.debug_enabled {
            tracing::debug!(
                target: "quarry::request",
                len = body_bytes.len(),
                content_type = self.content_type.as_str(),
                "Set request body"
            );
        }

        self.with_state(Some(Bytes::from(body_bytes)), BodySet)
    }

    /// Use raw bytes as the body, sent as `application/octet-stream` unless
    /// another content type was chosen
    #[must_use]
    pub fn raw_body(self, bytes: impl Into<Bytes>) -> RequestBuilder<BodySet> {
        let builder = if self.content_type == ContentType::ApplicationJson {
            self.content_type(ContentType::ApplicationOctetStream)
        } else {
            self
        };
        builder.with_state(Some(bytes.into()), BodySet)
    }

    /// Use UTF-8 text as the body, sent as `text/plain`
    #[must_use]
    pub fn text_body(self, text: &str) -> RequestBuilder<BodySet> {
        self.content_type(ContentType::TextPlain)
            .with_state(Some(Bytes::copy_from_slice(text.as_bytes())), BodySet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        label: &'static str,
    }

    #[test]
    fn test_json_body() {
        let builder = RequestBuilder::json().body(&Point { x: 3, label: "a b" });
        assert_eq!(
            builder.body.as_deref(),
            Some(&br#"{"x":3,"label":"a b"}"#[..])
        );
    }

    #[test]
    fn test_form_body() {
        let builder = RequestBuilder::form_urlencoded().body(&Point { x: 3, label: "a b" });
        assert_eq!(builder.body.as_deref(), Some(&b"x=3&label=a+b"[..]));
        assert_eq!(builder.content_type, ContentType::ApplicationFormUrlEncoded);
    }

    #[test]
    fn test_raw_and_text_bodies_pick_content_type() {
        let raw = RequestBuilder::new().raw_body(vec![1u8, 2, 3]);
        assert_eq!(raw.content_type, ContentType::ApplicationOctetStream);

        let text = RequestBuilder::new().text_body("hi");
        assert_eq!(text.content_type, ContentType::TextPlain);
        assert_eq!(text.body.as_deref(), Some(&b"hi"[..]));
    }
}
