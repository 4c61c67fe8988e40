//! Quarry public API
//!
//! Prioritized, deduplicating request queue with a persistent response cache.
//! Requests are described with the fluent [`RequestBuilder`] and submitted to
//! a [`RequestQueue`]; results come back through the request's handler.
//!
//! ```no_run
//! use quarry::prelude::*;
//!
//! # struct Stack;
//! # impl HttpStack for Stack {
//! #     fn perform_request(&self, _: &Request, _: &Headers, _: std::time::Duration)
//! #         -> Result<StackResponse, StackError> { Err(StackError::SocketTimeout) }
//! # }
//! let queue = quarry::new_request_queue("/tmp/quarry", Stack)?;
//!
//! queue.add(
//!     quarry::json()
//!         .bearer_auth("token")
//!         .priority(Priority::High)
//!         .get(
//!             "https://api.example.com/items",
//!             FnHandler::string(|body| println!("{body}"), |err| eprintln!("{err}")),
//!         ),
//! );
//! # Ok::<(), std::io::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub mod builder;

// Re-export all public API components
pub use builder::*;

// Engine types from the client package
pub use quarry_client::{cache, config, delivery, error, network, prelude, queue, retry, telemetry};
pub use quarry_client::prelude::*;

/// Main entry point providing static builder methods
pub struct Quarry;

impl Quarry {
    /// Builder preset for JSON bodies
    #[must_use]
    pub fn json() -> RequestBuilder {
        RequestBuilder::json()
    }

    /// Builder preset for form-urlencoded bodies
    #[must_use]
    pub fn form_urlencoded() -> RequestBuilder {
        RequestBuilder::form_urlencoded()
    }

    /// Disk-cached queue over `stack`, already started
    ///
    /// # Errors
    /// Fails when a worker thread cannot be spawned.
    pub fn queue<S: HttpStack + 'static>(
        cache_dir: impl Into<PathBuf>,
        stack: S,
    ) -> io::Result<RequestQueue> {
        new_request_queue(cache_dir, stack)
    }
}

/// Shorthand for `RequestBuilder::json()`
#[must_use]
pub fn json() -> RequestBuilder {
    RequestBuilder::json()
}

/// Shorthand for `RequestBuilder::form_urlencoded()`
#[must_use]
pub fn form() -> RequestBuilder {
    RequestBuilder::form_urlencoded()
}

/// Build and start a queue with the standard components: a [`DiskCache`]
/// rooted at `cache_dir`, a [`BasicNetwork`] over `stack`, delivery on a
/// dedicated thread and the default worker count.
///
/// # Errors
/// Fails when a worker thread cannot be spawned.
pub fn new_request_queue<S: HttpStack + 'static>(
    cache_dir: impl Into<PathBuf>,
    stack: S,
) -> io::Result<RequestQueue> {
    new_request_queue_with(cache_dir, stack, DiskCacheConfig::default(), QueueConfig::default())
}

/// [`new_request_queue`] with explicit cache and queue configuration.
///
/// # Errors
/// Fails when either configuration is invalid or a worker thread cannot be
/// spawned.
pub fn new_request_queue_with<S: HttpStack + 'static>(
    cache_dir: impl Into<PathBuf>,
    stack: S,
    cache_config: DiskCacheConfig,
    queue_config: QueueConfig,
) -> io::Result<RequestQueue> {
    cache_config
        .validate()
        .and_then(|()| queue_config.validate())
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidInput, msg))?;

    let cache_dir = cache_dir.into();
    tracing::debug!(
        target: "quarry::queue",
        cache_dir = %cache_dir.display(),
        max_bytes = cache_config.max_bytes,
        network_threads = queue_config.network_threads,
        "Creating request queue"
    );

    let queue = RequestQueue::new(
        Arc::new(DiskCache::new(cache_dir, cache_config)),
        Arc::new(BasicNetwork::new(stack)),
        Arc::new(ExecutorDelivery::new(ThreadExecutor::new()?)),
        queue_config,
    );
    queue.start()?;
    Ok(queue)
}
