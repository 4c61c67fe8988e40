//! Per-request event log
//!
//! Each stage a request passes through leaves a named marker with the thread
//! it ran on and the time since the request was created. The log is dumped
//! when the request finishes.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub name: String,
    pub thread: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub struct MarkerLog {
    started: Instant,
    markers: Mutex<Vec<Marker>>,
}

impl Default for MarkerLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerLog {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            markers: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, name: impl Into<String>) {
        let current = thread::current();
        let marker = Marker {
            name: name.into(),
            thread: current.name().unwrap_or("unnamed").to_string(),
            elapsed: self.started.elapsed(),
        };
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(marker);
    }

    /// Marker names in the order they were added
    pub fn names(&self) -> Vec<String> {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.markers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|m| m.name == name)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Display for MarkerLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let markers = self.markers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut previous = Duration::ZERO;
        for (i, marker) in markers.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(
                f,
                "(+{}ms) [{}] {}",
                marker.elapsed.saturating_sub(previous).as_millis(),
                marker.thread,
                marker.name
            )?;
            previous = marker.elapsed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_keep_order_and_thread() {
        let log = MarkerLog::new();
        log.add("add-to-queue");
        std::thread::scope(|s| {
            std::thread::Builder::new()
                .name("worker".into())
                .spawn_scoped(s, || log.add("cache-hit"))
                .unwrap();
        });

        assert_eq!(log.names(), vec!["add-to-queue", "cache-hit"]);
        assert!(log.contains("cache-hit"));
        assert!(log.to_string().contains("[worker] cache-hit"));
    }
}
