//! Network dispatcher: one of the pool workers performing network requests

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use super::{WorkerHandle, deliver_panic};
use crate::cache::Cache;
use crate::delivery::ResponseDelivery;
use crate::error::Error;
use crate::http::Request;
use crate::network::{self, Network};
use crate::queue::QueueState;
use crate::telemetry::QueueStats;

pub struct NetworkDispatcher {
    id: usize,
    state: Arc<QueueState>,
    network: Arc<dyn Network>,
    cache: Arc<dyn Cache>,
    delivery: Arc<dyn ResponseDelivery>,
    quit: Arc<AtomicBool>,
}

impl NetworkDispatcher {
    pub(crate) fn new(
        id: usize,
        state: Arc<QueueState>,
        network: Arc<dyn Network>,
        cache: Arc<dyn Cache>,
        delivery: Arc<dyn ResponseDelivery>,
    ) -> Self {
        Self {
            id,
            state,
            network,
            cache,
            delivery,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn spawn(self) -> io::Result<WorkerHandle> {
        let quit = Arc::clone(&self.quit);
        WorkerHandle::spawn(format!("quarry-network-{}", self.id), quit, move || {
            self.run();
        })
    }

    fn run(self) {
        tracing::debug!(target: "quarry::network", worker = self.id, "Network dispatcher started");

        while let Some(request) = self.state.network_queue.take(&self.quit) {
            let started = Instant::now();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| self.process(&request, started)));
            if let Err(payload) = outcome {
                deliver_panic(&self.state, self.delivery.as_ref(), &request, payload, started);
            }
        }

        tracing::debug!(target: "quarry::network", worker = self.id, "Network dispatcher exiting");
    }

    fn process(&self, request: &Arc<Request>, started: Instant) {
        let stats = &self.state.stats;
        request.add_marker("network-queue-take");

        if request.is_discarded() {
            QueueStats::incr(&stats.discarded);
            request.finish("network-discard-cancelled");
            return;
        }

        let headers = network::cache_headers(request.cache_entry().as_ref());
        QueueStats::incr(&stats.network_requests);

        let network_response = match self.network.perform_request(request, &headers) {
            Ok(response) => response,
            Err(mut error) => {
                error.set_network_time(started.elapsed());
                self.post_error(request, error);
                return;
            }
        };
        request.add_marker("network-http-complete");

        // The intermediate delivery already carried this exact data.
        if network_response.not_modified && request.has_had_response_delivered() {
            QueueStats::incr(&stats.not_modified);
            request.finish("not-modified");
            return;
        }

        let response = request.parse_network_response(&network_response);
        request.add_marker("network-parse-complete");

        if request.should_cache()
            && let Some(entry) = &response.cache_entry
        {
            self.cache.put(&request.cache_key(), entry);
            request.add_marker("network-cache-written");
        }

        if response.is_success() {
            QueueStats::incr(&stats.deliveries);
        } else {
            QueueStats::incr(&stats.errors);
        }
        request.mark_delivered();
        self.delivery.post_response(Arc::clone(request), response, None);
    }

    fn post_error(&self, request: &Arc<Request>, error: Error) {
        QueueStats::incr(&self.state.stats.errors);
        let error = request.parse_network_error(error);
        self.delivery.post_error(Arc::clone(request), error);
    }
}
