#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use crossbeam_channel::{Receiver, Sender};
use quarry_client::error::Error;
use quarry_client::network::{HttpStack, Network, StackError, StackResponse};
use quarry_client::prelude::*;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// What a recording handler observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Response(String),
    Error(Kind),
}

pub fn recording_handler() -> (StringHandler, Receiver<Event>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let err_tx = tx.clone();
    let handler = FnHandler::string(
        move |body| tx.send(Event::Response(body)).unwrap_or(()),
        move |err| err_tx.send(Event::Error(err.kind())).unwrap_or(()),
    );
    (handler, rx)
}

pub fn get(url: &str) -> (Request, Receiver<Event>) {
    let (handler, rx) = recording_handler();
    (Request::new(Method::GET, url, handler), rx)
}

/// Sequence numbers of finished requests, in finish order
pub fn finished_channel(queue: &RequestQueue) -> Receiver<u64> {
    let (tx, rx) = crossbeam_channel::unbounded();
    queue.add_finished_listener(Arc::new(move |r: &Request| {
        tx.send(r.sequence()).unwrap_or(())
    }));
    rx
}

pub fn wait_finished(rx: &Receiver<u64>, sequence: u64) -> bool {
    while let Ok(finished) = rx.recv_timeout(WAIT) {
        if finished == sequence {
            return true;
        }
    }
    false
}

/// A fresh cache entry for `body`, valid for a minute
pub fn fresh_entry(body: &'static str) -> CacheEntry {
    let now = chrono::Utc::now().timestamp_millis();
    CacheEntry {
        data: Bytes::from_static(body.as_bytes()),
        ttl: now + 60_000,
        soft_ttl: now + 60_000,
        ..CacheEntry::default()
    }
}

/// Servable but due for a refresh
pub fn soft_expired_entry(body: &'static str, etag: &str) -> CacheEntry {
    let now = chrono::Utc::now().timestamp_millis();
    CacheEntry {
        data: Bytes::from_static(body.as_bytes()),
        etag: Some(etag.to_string()),
        ttl: now + 60_000,
        soft_ttl: now - 1_000,
        ..CacheEntry::default()
    }
}

pub fn expired_entry(body: &'static str, etag: &str) -> CacheEntry {
    let now = chrono::Utc::now().timestamp_millis();
    CacheEntry {
        data: Bytes::from_static(body.as_bytes()),
        etag: Some(etag.to_string()),
        ttl: now - 1_000,
        soft_ttl: now - 1_000,
        ..CacheEntry::default()
    }
}

/// In-memory cache recording every lookup and write
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    gets: Mutex<Vec<String>>,
    puts: Mutex<Vec<String>>,
}

impl MemoryCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn gets_for(&self, key: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|k| *k == key).count()
    }

    pub fn total_gets(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    pub fn puts_for(&self, key: &str) -> usize {
        self.puts.lock().unwrap().iter().filter(|k| *k == key).count()
    }

    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.gets.lock().unwrap().push(key.to_string());
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, entry: &CacheEntry) {
        self.puts.lock().unwrap().push(key.to_string());
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), entry.clone());
    }

    fn initialize(&self) {}

    fn invalidate(&self, key: &str, full_expire: bool) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(key) {
            entry.soft_ttl = 0;
            if full_expire {
                entry.ttl = 0;
            }
        }
    }

    fn remove(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Blocks network calls until the test lets them through
pub struct Gate {
    entered_tx: Sender<String>,
    entered_rx: Receiver<String>,
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        Arc::new(Self {
            entered_tx,
            entered_rx,
            release_tx,
            release_rx,
        })
    }

    fn pass(&self, url: String) {
        self.entered_tx.send(url).unwrap_or(());
        let _ = self.release_rx.recv_timeout(WAIT);
    }

    /// Wait for a network call to arrive at the gate
    pub fn wait_entered(&self) -> Option<String> {
        self.entered_rx.recv_timeout(WAIT).ok()
    }

    pub fn release(&self) {
        self.release_tx.send(()).unwrap_or(());
    }
}

type Responder = dyn Fn(&Request, &Headers) -> Result<NetworkResponse, Error> + Send + Sync;

/// Network answering from a closure and recording every call
pub struct ScriptedNetwork {
    respond: Box<Responder>,
    gate: Option<Arc<Gate>>,
    calls: Mutex<Vec<(String, Headers)>>,
}

impl ScriptedNetwork {
    pub fn new(
        respond: impl Fn(&Request, &Headers) -> Result<NetworkResponse, Error> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            gate: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn gated(
        gate: Arc<Gate>,
        respond: impl Fn(&Request, &Headers) -> Result<NetworkResponse, Error> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            gate: Some(gate),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Always answers 200 with `body`, cacheable for a minute
    pub fn ok(body: &'static str) -> Arc<Self> {
        Self::new(move |_, _| Ok(ok_response(body)))
    }

    pub fn calls(&self) -> Vec<(String, Headers)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Network for ScriptedNetwork {
    fn perform_request(
        &self,
        request: &Request,
        additional_headers: &Headers,
    ) -> Result<NetworkResponse, Error> {
        self.calls
            .lock()
            .unwrap()
            .push((request.url(), additional_headers.clone()));
        if let Some(gate) = &self.gate {
            gate.pass(request.url());
        }
        (self.respond)(request, additional_headers)
    }
}

pub fn ok_response(body: &'static str) -> NetworkResponse {
    NetworkResponse::new(200, Bytes::from_static(body.as_bytes())).with_headers(headers(&[
        ("Cache-Control", "max-age=60"),
        ("Content-Type", "text/plain; charset=utf-8"),
    ]))
}

/// One recorded transport call
#[derive(Debug, Clone)]
pub struct StackCall {
    pub url: String,
    pub headers: Headers,
    pub timeout: Duration,
}

/// Transport replaying a fixed script of outcomes
#[derive(Default)]
pub struct MockStack {
    script: Mutex<VecDeque<Result<StackResponse, StackError>>>,
    calls: Mutex<Vec<StackCall>>,
}

impl MockStack {
    pub fn new(script: Vec<Result<StackResponse, StackError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<StackCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl HttpStack for MockStack {
    fn perform_request(
        &self,
        request: &Request,
        additional_headers: &Headers,
        timeout: Duration,
    ) -> Result<StackResponse, StackError> {
        self.calls.lock().unwrap().push(StackCall {
            url: request.url(),
            headers: additional_headers.clone(),
            timeout,
        });
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(StackError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "script exhausted",
            )))
        })
    }
}

pub fn status(code: u16, pairs: &[(&str, &str)], body: &'static str) -> Result<StackResponse, StackError> {
    Ok(StackResponse::new(code, headers(pairs), body))
}
