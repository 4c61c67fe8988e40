use crate::http::Request;

/// Notified once for every request that reaches `finish`, on whichever
/// thread finished it.
pub trait RequestFinishedListener: Send + Sync {
    fn on_request_finished(&self, request: &Request);
}

impl<F> RequestFinishedListener for F
where
    F: Fn(&Request) + Send + Sync,
{
    fn on_request_finished(&self, request: &Request) {
        self(request);
    }
}
