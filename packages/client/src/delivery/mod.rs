//! Delivery of parsed responses and errors back to callers
//!
//! Dispatchers never call handlers directly. They post to a
//! [`ResponseDelivery`], which decides on which thread the handler runs and
//! terminates the request once its final result was delivered.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub mod executor;

pub use executor::{
    ChannelExecutor, DeliveryReceiver, Executor, InlineExecutor, Task, ThreadExecutor,
};

use crate::error::Error;
use crate::http::{Request, Response};

/// Sink for request results
pub trait ResponseDelivery: Send + Sync {
    /// Deliver a parsed response, then run `then` in the same context.
    fn post_response(&self, request: Arc<Request>, response: Response, then: Option<Task>);

    fn post_error(&self, request: Arc<Request>, error: Error);
}

/// Posts every result through an [`Executor`]
#[derive(Debug, Clone)]
pub struct ExecutorDelivery<E> {
    executor: E,
}

impl<E: Executor> ExecutorDelivery<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl ExecutorDelivery<InlineExecutor> {
    /// Deliver on whichever worker produced the result
    pub fn inline() -> Self {
        Self::new(InlineExecutor)
    }
}

impl ExecutorDelivery<ChannelExecutor> {
    /// Deliver on the thread that drains the returned receiver
    pub fn channel() -> (Self, DeliveryReceiver) {
        let (executor, receiver) = ChannelExecutor::new();
        (Self::new(executor), receiver)
    }
}

impl<E: Executor> ResponseDelivery for ExecutorDelivery<E> {
    fn post_response(&self, request: Arc<Request>, response: Response, then: Option<Task>) {
        request.mark_delivered();
        request.add_marker("post-response");
        self.executor
            .execute(Box::new(move || deliver(&request, response, then)));
    }

    fn post_error(&self, request: Arc<Request>, error: Error) {
        request.add_marker("post-error");
        let response = Response::error(error);
        self.executor
            .execute(Box::new(move || deliver(&request, response, None)));
    }
}

fn deliver(request: &Arc<Request>, response: Response, then: Option<Task>) {
    // Cancellation may have happened after the result was posted.
    if request.is_canceled() {
        request.finish("canceled-at-delivery");
        return;
    }

    let intermediate = response.intermediate;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match response.result {
        Ok(payload) => request.deliver_response(payload),
        Err(error) => request.deliver_error(error),
    }));
    if outcome.is_err() {
        tracing::warn!(
            target: "quarry::delivery",
            url = %request.url(),
            "Response handler panicked during delivery"
        );
    }

    if intermediate {
        request.add_marker("intermediate-response");
    } else {
        request.finish("done");
    }

    if let Some(then) = then {
        then();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FnHandler, Method};
    use bytes::Bytes;

    fn request(tx: crossbeam_channel::Sender<String>) -> Arc<Request> {
        let err_tx = tx.clone();
        Arc::new(Request::new(
            Method::GET,
            "http://test/",
            FnHandler::bytes(
                move |b| tx.send(format!("ok:{}", b.len())).unwrap_or(()),
                move |e| err_tx.send(format!("err:{e}")).unwrap_or(()),
            ),
        ))
    }

    fn payload(data: &'static [u8]) -> Response {
        Response::success(Box::new(Bytes::from_static(data)) as crate::http::Payload, None)
    }

    #[test]
    fn test_final_response_finishes_request() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let req = request(tx);
        ExecutorDelivery::inline().post_response(Arc::clone(&req), payload(b"abc"), None);

        assert_eq!(rx.try_recv().ok().as_deref(), Some("ok:3"));
        assert!(req.has_had_response_delivered());
        assert!(req.is_finished());
        assert!(req.markers().contains("done"));
    }

    #[test]
    fn test_intermediate_response_leaves_request_open_and_runs_then() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let req = request(tx);
        let mut response = payload(b"abc");
        response.intermediate = true;
        let (then_tx, then_rx) = crossbeam_channel::bounded(1);

        ExecutorDelivery::inline().post_response(
            Arc::clone(&req),
            response,
            Some(Box::new(move || then_tx.send(()).unwrap_or(()))),
        );

        assert!(rx.try_recv().is_ok());
        assert!(then_rx.try_recv().is_ok());
        assert!(!req.is_finished());
        assert!(req.markers().contains("intermediate-response"));
    }

    #[test]
    fn test_canceled_request_is_finished_without_delivery() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let req = request(tx);
        let (delivery, receiver) = ExecutorDelivery::channel();

        delivery.post_error(Arc::clone(&req), crate::error::timeout());
        req.cancel();
        receiver.run_pending();

        assert!(rx.try_recv().is_err());
        assert!(req.is_finished());
        assert!(req.markers().contains("canceled-at-delivery"));
    }
}
