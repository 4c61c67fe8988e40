use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::http::NetworkResponse;

/// A Result alias where the Err case is `quarry_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// Represents errors that can occur while resolving a request.
pub struct Error {
    pub(crate) inner: Box<Inner>,
}

pub(crate) struct Inner {
    pub(crate) kind: Kind,
    pub(crate) source: Option<BoxError>,
    pub(crate) response: Option<NetworkResponse>,
    pub(crate) network_time: Duration,
}

/// Failure categories surfaced to request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// No attempt reached a server
    NoConnection,
    /// An attempt hit its socket or connect deadline
    Timeout,
    /// Server rejected the credentials (401/403)
    AuthFailure,
    /// Server issued a relocation that is not followed automatically
    Redirect,
    /// Non-2xx status that is not special-cased
    Server,
    /// Transport failure after a response was started
    Network,
    /// Response bytes could not be turned into the expected type
    Parse,
    /// Persisted cache record is corrupt or unreadable
    CacheFormat,
    /// Anything the pipeline did not anticipate, including handler panics
    Unexpected,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                response: None,
                network_time: Duration::ZERO,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<BoxError>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_response(mut self, response: NetworkResponse) -> Error {
        self.inner.response = Some(response);
        self
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// The response that produced this error, when the server answered
    #[must_use]
    pub fn network_response(&self) -> Option<&NetworkResponse> {
        self.inner.response.as_ref()
    }

    /// Wall-clock time spent on the network before the failure
    #[must_use]
    pub fn network_time(&self) -> Duration {
        self.inner.network_time
    }

    pub fn set_network_time(&mut self, elapsed: Duration) {
        self.inner.network_time = elapsed;
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("quarry_client::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref response) = self.inner.response {
            f.field("status", &response.status_code);
        }

        if !self.inner.network_time.is_zero() {
            f.field("network_time", &self.inner.network_time);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::NoConnection => f.write_str("no connection could be established")?,
            Kind::Timeout => f.write_str("request timed out")?,
            Kind::AuthFailure => f.write_str("authentication failure")?,
            Kind::Redirect => f.write_str("redirect not followed")?,
            Kind::Server => f.write_str("server error")?,
            Kind::Network => f.write_str("network error")?,
            Kind::Parse => f.write_str("error parsing response")?,
            Kind::CacheFormat => f.write_str("corrupt cache record")?,
            Kind::Unexpected => f.write_str("unexpected error")?,
        }

        if let Some(ref response) = self.inner.response {
            write!(f, " (status {})", response.status_code)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
