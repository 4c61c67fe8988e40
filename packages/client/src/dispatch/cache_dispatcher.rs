//! Cache dispatcher: the single worker that resolves requests from the cache

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use super::{WorkerHandle, deliver_panic};
use crate::cache::Cache;
use crate::delivery::ResponseDelivery;
use crate::http::{NetworkResponse, Request};
use crate::queue::QueueState;
use crate::telemetry::QueueStats;

pub struct CacheDispatcher {
    state: Arc<QueueState>,
    cache: Arc<dyn Cache>,
    delivery: Arc<dyn ResponseDelivery>,
    quit: Arc<AtomicBool>,
}

impl CacheDispatcher {
    pub(crate) fn new(
        state: Arc<QueueState>,
        cache: Arc<dyn Cache>,
        delivery: Arc<dyn ResponseDelivery>,
    ) -> Self {
        Self {
            state,
            cache,
            delivery,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn spawn(self) -> io::Result<WorkerHandle> {
        let quit = Arc::clone(&self.quit);
        WorkerHandle::spawn("quarry-cache".to_string(), quit, move || self.run())
    }

    fn run(self) {
        tracing::debug!(target: "quarry::cache", "Cache dispatcher started");

        self.cache.initialize();

        while let Some(request) = self.state.cache_queue.take(&self.quit) {
            let started = Instant::now();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(&request)));
            if let Err(payload) = outcome {
                deliver_panic(&self.state, self.delivery.as_ref(), &request, payload, started);
            }
        }

        tracing::debug!(target: "quarry::cache", "Cache dispatcher exiting");
    }

    fn process(&self, request: &Arc<Request>) {
        let stats = &self.state.stats;
        request.add_marker("cache-queue-take");

        if request.is_discarded() {
            QueueStats::incr(&stats.discarded);
            request.finish("cache-discard-cancelled");
            return;
        }

        let key = request.cache_key();
        let Some(entry) = self.cache.get(&key) else {
            request.add_marker("cache-miss");
            QueueStats::incr(&stats.cache_misses);
            self.state.network_queue.push(Arc::clone(request));
            return;
        };

        // Too stale to serve: revalidate with the entry's validators.
        if entry.is_expired() {
            request.add_marker("cache-hit-expired");
            QueueStats::incr(&stats.expired_hits);
            request.set_cache_entry(Some(entry));
            self.state.network_queue.push(Arc::clone(request));
            return;
        }

        request.add_marker("cache-hit");
        let mut response = request.parse_network_response(&NetworkResponse::from_cache(
            entry.data.clone(),
            entry.response_headers.clone(),
        ));
        request.add_marker("cache-hit-parsed");

        if !response.is_success() {
            request.add_marker("cache-parsing-failed");
            tracing::debug!(
                target: "quarry::cache",
                cache_key = %key,
                "Cached entry could not be parsed, refetching"
            );
            self.cache.invalidate(&key, true);
            request.set_cache_entry(None);
            QueueStats::incr(&stats.cache_misses);
            self.state.network_queue.push(Arc::clone(request));
            return;
        }

        if !entry.refresh_needed() {
            QueueStats::incr(&stats.cache_hits);
            QueueStats::incr(&stats.deliveries);
            self.delivery.post_response(Arc::clone(request), response, None);
            return;
        }

        // Soft-expired: serve it now, then refresh from the network.
        request.add_marker("cache-hit-refresh-needed");
        QueueStats::incr(&stats.soft_hits);
        QueueStats::incr(&stats.deliveries);
        request.set_cache_entry(Some(entry));
        response.intermediate = true;

        let state = Arc::clone(&self.state);
        let refresh = Arc::clone(request);
        self.delivery.post_response(
            Arc::clone(request),
            response,
            Some(Box::new(move || state.network_queue.push(refresh))),
        );
    }
}
