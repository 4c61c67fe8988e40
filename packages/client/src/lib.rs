//! # Quarry client engine
//!
//! Request scheduling and caching for HTTP-style requests. A
//! [`RequestQueue`] accepts typed requests from any thread, coalesces
//! identical cacheable requests, resolves them against a persistent
//! [`DiskCache`](cache::DiskCache) before falling back to the network, runs
//! network I/O on a fixed pool of worker threads, retries per request policy
//! and delivers each result exactly once through a pluggable
//! [`ResponseDelivery`](delivery::ResponseDelivery).
//!
//! ## Features
//!
//! - **Request coalescing** for identical in-flight cacheable requests
//! - **Priority scheduling** with FIFO order inside a priority
//! - **Soft and hard TTLs**: stale-but-usable hits are served immediately and
//!   refreshed in the background
//! - **Conditional revalidation** with `If-None-Match` / `If-Modified-Since`
//! - **Disk cache** with a compact binary record format and LRU eviction
//! - **Retry policies** with growing per-attempt timeouts
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quarry_client::prelude::*;
//!
//! # struct Stack;
//! # impl HttpStack for Stack {
//! #     fn perform_request(&self, _: &Request, _: &Headers, _: std::time::Duration)
//! #         -> Result<StackResponse, StackError> { Err(StackError::SocketTimeout) }
//! # }
//! # fn stack() -> Stack { Stack }
//! let queue = RequestQueue::new(
//!     Arc::new(DiskCache::with_root("/tmp/quarry")),
//!     Arc::new(BasicNetwork::new(stack())),
//!     Arc::new(ExecutorDelivery::new(ThreadExecutor::new()?)),
//!     QueueConfig::default(),
//! );
//! queue.start()?;
//!
//! queue.add(Request::new(
//!     Method::GET,
//!     "https://example.com/feed",
//!     FnHandler::string(|body| println!("{body}"), |err| eprintln!("{err}")),
//! ));
//! # Ok::<(), std::io::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

// Core modules
pub mod cache;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod network;
pub mod queue;
pub mod retry;
pub mod telemetry;

// Prelude with canonical types
pub mod prelude;

pub use crate::error::{Error, Result};
pub use crate::prelude::*;
