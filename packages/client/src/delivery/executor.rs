//! Execution contexts for delivery callbacks

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

/// Unit of work posted to an [`Executor`]
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Where delivery callbacks run
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) {
        (**self).execute(task);
    }
}

/// Runs tasks on the calling worker thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

/// Queues tasks for a caller-owned thread to drain through a
/// [`DeliveryReceiver`]
#[derive(Debug, Clone)]
pub struct ChannelExecutor {
    tx: Sender<Task>,
}

impl ChannelExecutor {
    pub fn new() -> (Self, DeliveryReceiver) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, DeliveryReceiver { rx })
    }
}

impl Executor for ChannelExecutor {
    fn execute(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::warn!(
                target: "quarry::delivery",
                "Delivery receiver dropped, discarding callback"
            );
        }
    }
}

/// Receiving half of a [`ChannelExecutor`]
#[derive(Debug)]
pub struct DeliveryReceiver {
    rx: Receiver<Task>,
}

impl DeliveryReceiver {
    /// Run every task already queued, without blocking. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one task and run it.
    pub fn run_next(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run tasks as they arrive until `duration` has elapsed.
    pub fn run_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut ran = 0;
        while let Ok(task) = self.rx.recv_deadline(deadline) {
            task();
            ran += 1;
        }
        ran
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Runs tasks in order on one dedicated `quarry-delivery` thread.
///
/// Dropping the executor lets the thread drain what is queued and exit.
#[derive(Debug)]
pub struct ThreadExecutor {
    tx: Option<Sender<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadExecutor {
    pub fn new() -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Task>();
        let handle = thread::Builder::new()
            .name("quarry-delivery".to_string())
            .spawn(move || {
                for task in rx {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        tracing::warn!(
                            target: "quarry::delivery",
                            "Delivery callback panicked"
                        );
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) {
        let sent = self.tx.as_ref().map(|tx| tx.send(task).is_ok());
        if sent != Some(true) {
            tracing::warn!(
                target: "quarry::delivery",
                "Delivery thread gone, discarding callback"
            );
        }
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take()
            && handle.thread().id() != thread::current().id()
        {
            let _ = handle.join();
        }
    }
}
