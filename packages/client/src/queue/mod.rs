//! Request queue, priority work queues and finish notifications

pub mod core;
pub mod listener;
pub mod priority;

pub use self::core::RequestQueue;
pub(crate) use self::core::QueueState;
pub use listener::RequestFinishedListener;
pub use priority::PriorityBlockingQueue;
