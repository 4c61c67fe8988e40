//! Network implementation on top of an `HttpStack`

use std::time::{Duration, Instant};

use bytes::Bytes;

use super::{HttpStack, Network, StackError, StackResponse};
use crate::cache::CacheEntry;
use crate::config::NetworkConfig;
use crate::error::{self, Error};
use crate::http::{Headers, NetworkResponse, Request, header_value};

/// Drives an [`HttpStack`] through the request's retry policy.
///
/// Per attempt:
/// - socket and connect timeouts are retried as `Timeout`
/// - 304 replays the cached body with merged headers
/// - 2xx succeeds
/// - 401/403 are retried as `AuthFailure`
/// - 301/302 record the `Location` and are retried as `Redirect`
/// - anything else fails as `Server`, retried only with
///   [`NetworkConfig::retry_server_errors`]
#[derive(Debug)]
pub struct BasicNetwork<S> {
    stack: S,
    config: NetworkConfig,
}

impl<S: HttpStack> BasicNetwork<S> {
    pub fn new(stack: S) -> Self {
        Self::with_config(stack, NetworkConfig::default())
    }

    pub fn with_config(stack: S, config: NetworkConfig) -> Self {
        Self { stack, config }
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    fn attempt(
        &self,
        request: &Request,
        additional_headers: &Headers,
        started: Instant,
    ) -> Result<NetworkResponse, Attempt> {
        let response = match self
            .stack
            .perform_request(request, additional_headers, request.timeout())
        {
            Ok(response) => response,
            Err(StackError::SocketTimeout) => return Err(Attempt::Retry("socket", error::timeout())),
            Err(StackError::ConnectTimeout) => {
                return Err(Attempt::Retry("connection", error::timeout()));
            }
            Err(StackError::MalformedUrl(url)) => {
                return Err(Attempt::Fatal(error::unexpected(format!("bad url {url}"))));
            }
            Err(StackError::BodyInterrupted(e)) => {
                return Err(Attempt::Fatal(error::network(e)));
            }
            Err(StackError::Io(e)) => return Err(Attempt::Fatal(error::no_connection(e))),
        };

        let StackResponse {
            status_code,
            headers,
            body,
        } = response;

        if status_code == 304 {
            let elapsed = started.elapsed();
            return Ok(match request.cache_entry() {
                Some(entry) => NetworkResponse {
                    status_code,
                    headers: combine_headers(headers, &entry),
                    data: entry.data,
                    not_modified: true,
                    network_time: elapsed,
                },
                None => NetworkResponse {
                    status_code,
                    headers,
                    data: Bytes::new(),
                    not_modified: true,
                    network_time: elapsed,
                },
            });
        }

        let elapsed = started.elapsed();
        let network_response = NetworkResponse {
            status_code,
            data: body.unwrap_or_default(),
            headers,
            not_modified: false,
            network_time: elapsed,
        };
        self.log_slow_request(request, &network_response, elapsed);

        match status_code {
            200..=299 => Ok(network_response),
            401 | 403 => Err(Attempt::Retry(
                "auth",
                error::auth_failure(network_response),
            )),
            301 | 302 => {
                if let Some(location) = network_response.header("Location") {
                    tracing::debug!(
                        target: "quarry::network",
                        from = %request.origin_url(),
                        to = %location,
                        "Request redirected"
                    );
                    request.set_redirect_url(location);
                }
                Err(Attempt::Retry("redirect", error::redirect(network_response)))
            }
            500..=599 if self.config.retry_server_errors => {
                Err(Attempt::Retry("server", error::server(network_response)))
            }
            _ => Err(Attempt::Fatal(error::server(network_response))),
        }
    }

    fn log_slow_request(&self, request: &Request, response: &NetworkResponse, elapsed: Duration) {
        if elapsed.as_millis() > u128::from(self.config.slow_request_threshold_ms) {
            tracing::debug!(
                target: "quarry::network",
                url = %request.url(),
                lifetime_ms = elapsed.as_millis() as u64,
                size = response.data.len(),
                status = response.status_code,
                retry_count = request.retry_policy().current_retry_count(),
                "Slow HTTP response"
            );
        }
    }
}

/// Outcome of a failed attempt
enum Attempt {
    /// Ask the retry policy; the prefix names the failure in request markers.
    Retry(&'static str, Error),
    Fatal(Error),
}

impl<S: HttpStack> Network for BasicNetwork<S> {
    fn perform_request(
        &self,
        request: &Request,
        additional_headers: &Headers,
    ) -> Result<NetworkResponse, Error> {
        let started = Instant::now();
        loop {
            match self.attempt(request, additional_headers, started) {
                Ok(response) => return Ok(response),
                Err(Attempt::Fatal(error)) => return Err(error),
                Err(Attempt::Retry(prefix, error)) => attempt_retry(prefix, request, error)?,
            }
        }
    }
}

/// Consult the request's retry policy, leaving a marker either way.
fn attempt_retry(prefix: &str, request: &Request, error: Error) -> Result<(), Error> {
    let mut policy = request.retry_policy();
    let old_timeout = policy.current_timeout().as_millis();
    let outcome = policy.retry(error);
    drop(policy);

    match outcome {
        Ok(()) => {
            request.add_marker(format!("{prefix}-retry [timeout={old_timeout}]"));
            Ok(())
        }
        Err(error) => {
            request.add_marker(format!("{prefix}-timeout-giveup [timeout={old_timeout}]"));
            Err(error)
        }
    }
}

/// Response headers, plus cached headers the 304 did not repeat.
fn combine_headers(mut response_headers: Headers, entry: &CacheEntry) -> Headers {
    for (name, value) in &entry.response_headers {
        if header_value(&response_headers, name).is_none() {
            response_headers.insert(name.clone(), value.clone());
        }
    }
    response_headers
}
