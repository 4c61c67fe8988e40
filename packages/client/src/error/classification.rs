use super::types::{Error, Kind};

impl Error {
    /// Returns true if no attempt reached a server.
    #[must_use]
    pub fn is_no_connection(&self) -> bool {
        matches!(self.inner.kind, Kind::NoConnection)
    }

    /// Returns true if the error is related to a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, Kind::Timeout)
    }

    /// Returns true if the server rejected the credentials.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.inner.kind, Kind::AuthFailure)
    }

    /// Returns true if the server answered with a relocation.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self.inner.kind, Kind::Redirect)
    }

    /// Returns true for unsuccessful statuses without special handling.
    #[must_use]
    pub fn is_server(&self) -> bool {
        matches!(self.inner.kind, Kind::Server)
    }

    /// Returns true if the response could not be parsed.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self.inner.kind, Kind::Parse)
    }

    /// Returns true if a persisted cache record was unreadable.
    #[must_use]
    pub fn is_cache_format(&self) -> bool {
        matches!(self.inner.kind, Kind::CacheFormat)
    }

    /// Returns true for failures wrapped at the top of a worker loop.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self.inner.kind, Kind::Unexpected)
    }

    /// Whether the retry policy gets a say before this error becomes terminal.
    ///
    /// Parse and cache-format problems are local data issues and never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::Timeout | Kind::AuthFailure | Kind::Redirect
        )
    }

    /// Returns the status code, if the error was generated from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.inner.response.as_ref().map(|r| r.status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;
    use crate::http::NetworkResponse;

    #[test]
    fn test_retryable_kinds() {
        assert!(error::timeout().is_retryable());
        assert!(error::auth_failure(NetworkResponse::new(401, Default::default())).is_retryable());
        assert!(!error::parse("bad utf-8").is_retryable());
        assert!(!error::cache_format("bad magic").is_retryable());
    }

    #[test]
    fn test_status_from_attached_response() {
        let err = error::server(NetworkResponse::new(503, Default::default()));
        assert_eq!(err.status(), Some(503));
        assert!(err.is_server());
        assert_eq!(err.to_string(), "server error (status 503)");
        assert_eq!(error::timeout().status(), None);
    }
}
