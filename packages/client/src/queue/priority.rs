//! Blocking priority queue feeding the dispatcher threads

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::http::{Priority, Request};

/// Heap slot. Ordered by priority, then by sequence so that equal
/// priorities are served first-come first-served.
struct Queued {
    priority: Priority,
    sequence: u64,
    request: Arc<Request>,
}

impl Queued {
    fn new(request: Arc<Request>) -> Self {
        Self {
            priority: request.priority(),
            sequence: request.sequence(),
            request,
        }
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Queued {}

/// Mutex + condvar binary heap. `push` never blocks; `take` blocks while empty.
#[derive(Default)]
pub struct PriorityBlockingQueue {
    heap: Mutex<BinaryHeap<Queued>>,
    available: Condvar,
}

impl PriorityBlockingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, request: Arc<Request>) {
        self.lock().push(Queued::new(request));
        self.available.notify_one();
    }

    pub fn push_all(&self, requests: impl IntoIterator<Item = Arc<Request>>) {
        let mut heap = self.lock();
        let before = heap.len();
        heap.extend(requests.into_iter().map(Queued::new));
        let added = heap.len() - before;
        drop(heap);
        for _ in 0..added {
            self.available.notify_one();
        }
    }

    /// Block until a request is available or `quit` is raised.
    ///
    /// `quit` is checked under the heap lock, and [`wake_all`](Self::wake_all)
    /// takes the same lock before notifying, so a stop signal is never missed.
    pub fn take(&self, quit: &AtomicBool) -> Option<Arc<Request>> {
        let mut heap = self.lock();
        loop {
            if quit.load(Ordering::Acquire) {
                return None;
            }
            if let Some(queued) = heap.pop() {
                return Some(queued.request);
            }
            heap = self
                .available
                .wait(heap)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Pop without blocking
    pub fn try_take(&self) -> Option<Arc<Request>> {
        self.lock().pop().map(|queued| queued.request)
    }

    /// Wake every blocked `take` so it re-checks its quit flag.
    pub fn wake_all(&self) {
        let _heap = self.lock();
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BinaryHeap<Queued>> {
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
