//! Scriptable `EngineApi` for tests
//!
//! Responses are keyed by path. Requests can be held in flight until
//! `release` is called, which is how overlap and join behavior is tested.

use super::client::EngineApi;
use crate::errors::{ClientError, ClientResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

pub struct MockEngineApi {
    responses: Mutex<HashMap<String, ClientResult<Value>>>,
    calls: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
    held: watch::Sender<bool>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockEngineApi {
    pub fn new() -> Self {
        let (held, _) = watch::channel(false);
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            held,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn respond(&self, path: &str, value: Value) {
        self.responses.lock().insert(path.to_string(), Ok(value));
    }

    pub fn fail(&self, path: &str, status: u16, message: Option<&str>) {
        self.responses.lock().insert(
            path.to_string(),
            Err(ClientError::Status {
                endpoint: path.to_string(),
                status,
                message: message.map(str::to_string),
            }),
        );
    }

    pub fn fail_network(&self, path: &str) {
        self.responses
            .lock()
            .insert(path.to_string(), Err(ClientError::Network("connection refused".to_string())));
    }

    /// Keep every subsequent request pending until `release`
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    pub fn release(&self) {
        self.held.send_replace(false);
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|p| p.as_str() == path).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn serve(&self, path: &str) -> ClientResult<Value> {
        self.calls.lock().push(path.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut held = self.held.subscribe();
        let _ = held.wait_for(|is_held| !*is_held).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses.lock().get(path).cloned().unwrap_or_else(|| {
            Err(ClientError::Status {
                endpoint: path.to_string(),
                status: 404,
                message: None,
            })
        })
    }
}

#[async_trait]
impl EngineApi for MockEngineApi {
    async fn get(&self, path: &str) -> ClientResult<Value> {
        self.serve(path).await
    }

    async fn post(&self, path: &str, body: Value) -> ClientResult<Value> {
        self.posts.lock().push((path.to_string(), body));
        self.serve(path).await
    }
}
