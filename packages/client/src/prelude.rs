//! Quarry client prelude
//!
//! The types needed to build a queue, submit requests and handle results.

// Requests, responses and handlers
pub use crate::http::{
    BytesHandler, ClearCacheHandler, FnHandler, Headers, NetworkResponse, Payload, Priority,
    Request, Response, ResponseHandler, StringHandler,
};

// Error types
pub use crate::error::{Error, Kind};

// Queue
pub use crate::queue::{RequestFinishedListener, RequestQueue};

// Caches
pub use crate::cache::{Cache, CacheEntry, DiskCache, NoCache};

// Network
pub use crate::network::{BasicNetwork, HttpStack, Network, StackError, StackResponse};

// Delivery
pub use crate::delivery::{
    ChannelExecutor, DeliveryReceiver, Executor, ExecutorDelivery, InlineExecutor,
    ResponseDelivery, Task, ThreadExecutor,
};

// Configuration
pub use crate::config::{DiskCacheConfig, NetworkConfig, QueueConfig, RetryConfig};

// Retry
pub use crate::retry::{DefaultRetryPolicy, RetryPolicy};

// Telemetry types
pub use crate::telemetry::QueueStatsSnapshot;

// HTTP standard types from http crate
pub use ::http::Method;
