//! Dispatcher threads
//!
//! One cache dispatcher resolves requests against the cache; a pool of
//! network dispatchers performs the network round trips. Both are plain loops
//! on named threads that end when their quit flag is raised.

use std::any::Any;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub mod cache_dispatcher;
pub mod network_dispatcher;

pub use cache_dispatcher::CacheDispatcher;
pub use network_dispatcher::NetworkDispatcher;

use crate::delivery::ResponseDelivery;
use crate::error;
use crate::http::Request;
use crate::queue::QueueState;
use crate::telemetry::QueueStats;

/// Handle to a running dispatcher thread
#[derive(Debug)]
pub struct WorkerHandle {
    quit: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn spawn<F>(name: String, quit: Arc<AtomicBool>, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let thread = thread::Builder::new().name(name).spawn(body)?;
        Ok(Self { quit, thread })
    }

    /// Ask the worker to exit once its current request is done.
    pub fn quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    pub fn name(&self) -> Option<&str> {
        self.thread.thread().name()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Turn a caught panic into an `Unexpected` error delivered to the request.
pub(crate) fn deliver_panic(
    state: &QueueState,
    delivery: &dyn ResponseDelivery,
    request: &Arc<Request>,
    payload: Box<dyn Any + Send>,
    started: Instant,
) {
    let message = panic_message(payload.as_ref());
    tracing::error!(
        target: "quarry::queue",
        url = %request.url(),
        panic = %message,
        "Unhandled panic while dispatching request"
    );
    QueueStats::incr(&state.stats.panics);

    // The result already reached the handler; a second delivery would repeat it.
    if request.is_finished() {
        return;
    }

    let mut error = error::unexpected(message);
    error.set_network_time(started.elapsed());
    delivery.post_error(Arc::clone(request), error);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
