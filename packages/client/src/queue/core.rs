//! Request queue coordinator
//!
//! Owns the in-flight set, the staging map used to coalesce identical
//! cacheable requests, the two work queues and the dispatcher threads.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::listener::RequestFinishedListener;
use super::priority::PriorityBlockingQueue;
use crate::cache::Cache;
use crate::config::QueueConfig;
use crate::delivery::ResponseDelivery;
use crate::dispatch::{CacheDispatcher, NetworkDispatcher, WorkerHandle};
use crate::http::Request;
use crate::network::Network;
use crate::telemetry::{QueueStats, QueueStatsSnapshot};

/// Staged requests per cache key. `None` means one request for the key is
/// being resolved and nothing is waiting behind it yet.
type StagingMap = HashMap<String, Option<VecDeque<Arc<Request>>>>;

/// State shared between the queue handle, its dispatchers and every request
/// it accepted.
pub(crate) struct QueueState {
    sequence: AtomicU64,
    current: Mutex<HashMap<u64, Arc<Request>>>,
    waiting: Mutex<StagingMap>,
    pub(crate) cache_queue: PriorityBlockingQueue,
    pub(crate) network_queue: PriorityBlockingQueue,
    listeners: Mutex<Vec<Arc<dyn RequestFinishedListener>>>,
    pub(crate) stats: QueueStats,
}

impl QueueState {
    fn new() -> Self {
        Self {
            sequence: AtomicU64::new(0),
            current: Mutex::new(HashMap::new()),
            waiting: Mutex::new(HashMap::new()),
            cache_queue: PriorityBlockingQueue::new(),
            network_queue: PriorityBlockingQueue::new(),
            listeners: Mutex::new(Vec::new()),
            stats: QueueStats::default(),
        }
    }

    /// Assign the next sequence number and record the request as in flight.
    ///
    /// Both happen under the in-flight lock, so sequence order matches
    /// registration order.
    fn register(&self, request: &Arc<Request>) {
        let mut current = lock(&self.current);
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        request.set_sequence(sequence);
        current.insert(sequence, Arc::clone(request));
    }

    fn stage_or_dispatch(&self, request: &Arc<Request>) {
        let key = request.cache_key();
        let mut waiting = lock(&self.waiting);

        if let Some(staged) = waiting.get_mut(&key) {
            staged
                .get_or_insert_with(VecDeque::new)
                .push_back(Arc::clone(request));
            QueueStats::incr(&self.stats.staged);
            tracing::debug!(
                target: "quarry::queue",
                cache_key = %key,
                sequence = request.sequence(),
                "Request for key is in flight, putting on hold"
            );
        } else {
            waiting.insert(key, None);
            self.cache_queue.push(Arc::clone(request));
        }
    }

    /// Release a finished request: drop it from the in-flight set, hand any
    /// staged duplicates back to the cache queue, then notify listeners.
    ///
    /// Staged requests are released before listeners run, and a panicking
    /// listener is contained, so the key never stays held.
    pub(crate) fn finish(&self, request: &Arc<Request>) {
        lock(&self.current).remove(&request.sequence());
        QueueStats::incr(&self.stats.finished);

        if request.should_cache() {
            let key = request.cache_key();
            let staged = lock(&self.waiting).remove(&key).flatten();
            if let Some(staged) = staged {
                tracing::debug!(
                    target: "quarry::queue",
                    cache_key = %key,
                    released = staged.len(),
                    "Releasing staged requests"
                );
                self.cache_queue.push_all(staged);
            }
        }

        let listeners = lock(&self.listeners).clone();
        for listener in &listeners {
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| listener.on_request_finished(request)));
            if outcome.is_err() {
                tracing::warn!(
                    target: "quarry::queue",
                    sequence = request.sequence(),
                    "Finished listener panicked"
                );
            }
        }
    }
}

/// Entry point: accepts requests and runs the dispatcher threads.
///
/// Dropping the queue stops its dispatchers.
pub struct RequestQueue {
    state: Arc<QueueState>,
    cache: Arc<dyn Cache>,
    network: Arc<dyn Network>,
    delivery: Arc<dyn ResponseDelivery>,
    config: QueueConfig,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl RequestQueue {
    pub fn new(
        cache: Arc<dyn Cache>,
        network: Arc<dyn Network>,
        delivery: Arc<dyn ResponseDelivery>,
        config: QueueConfig,
    ) -> Self {
        Self {
            state: Arc::new(QueueState::new()),
            cache,
            network,
            delivery,
            config,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Start one cache dispatcher and `network_threads` network dispatchers,
    /// stopping any that are already running.
    pub fn start(&self) -> io::Result<()> {
        self.stop();

        let mut workers = lock(&self.workers);
        workers.push(
            CacheDispatcher::new(
                Arc::clone(&self.state),
                Arc::clone(&self.cache),
                Arc::clone(&self.delivery),
            )
            .spawn()?,
        );

        for id in 0..self.config.network_threads.max(1) {
            workers.push(
                NetworkDispatcher::new(
                    id,
                    Arc::clone(&self.state),
                    Arc::clone(&self.network),
                    Arc::clone(&self.cache),
                    Arc::clone(&self.delivery),
                )
                .spawn()?,
            );
        }

        tracing::debug!(
            target: "quarry::queue",
            network_threads = self.config.network_threads.max(1),
            "Request queue started"
        );
        Ok(())
    }

    /// Signal every dispatcher to exit after its current request.
    ///
    /// Queued requests are left in place.
    pub fn stop(&self) {
        let workers: Vec<WorkerHandle> = lock(&self.workers).drain(..).collect();
        if workers.is_empty() {
            return;
        }
        for worker in &workers {
            worker.quit();
        }
        self.state.cache_queue.wake_all();
        self.state.network_queue.wake_all();
        tracing::debug!(
            target: "quarry::queue",
            workers = workers.len(),
            "Request queue stopped"
        );
    }

    /// Submit a request. Returns immediately with the shared handle.
    pub fn add(&self, request: Request) -> Arc<Request> {
        let request = Arc::new(request);
        request.bind(Arc::downgrade(&self.state));
        self.state.register(&request);
        request.add_marker("add-to-queue");
        QueueStats::incr(&self.state.stats.added);

        if request.should_cache() {
            self.state.stage_or_dispatch(&request);
        } else {
            self.state.network_queue.push(Arc::clone(&request));
        }

        request
    }

    /// Cancel every in-flight request matching `filter`.
    pub fn cancel_all<F>(&self, filter: F)
    where
        F: Fn(&Request) -> bool,
    {
        let current = lock(&self.state.current);
        for request in current.values() {
            if filter(request) {
                request.cancel();
            }
        }
    }

    /// Cancel every in-flight request carrying `tag`.
    pub fn cancel_all_tagged(&self, tag: &str) {
        self.cancel_all(|request| request.tag() == Some(tag));
    }

    pub fn add_finished_listener(&self, listener: Arc<dyn RequestFinishedListener>) {
        lock(&self.state.listeners).push(listener);
    }

    pub fn remove_finished_listener(&self, listener: &Arc<dyn RequestFinishedListener>) {
        lock(&self.state.listeners)
            .retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)));
    }

    /// Last sequence number handed out
    pub fn sequence_number(&self) -> u64 {
        self.state.sequence.load(Ordering::Acquire)
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Requests accepted and not yet finished
    pub fn in_flight_count(&self) -> usize {
        lock(&self.state.current).len()
    }

    /// Whether a resolution for `cache_key` is currently active
    pub fn is_key_in_flight(&self, cache_key: &str) -> bool {
        lock(&self.state.waiting).contains_key(cache_key)
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.state.stats.snapshot()
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
