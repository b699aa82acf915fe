//! Mock transport implementation for testing
//!
//! `MockTransport` answers wire requests from scripted per-category
//! responses and keeps a log of everything it received.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::engine::mobile::client::{MobileTransport, WireRequest};
use crate::{Error, Result};

/// Request as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRequest {
    pub category: String,
    pub args: Vec<String>,
    pub token: Option<String>,
}

/// Scripted mobile driver
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<String>>>,
    defaults: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<LoggedRequest>>,
    screenshot: Mutex<Option<Bytes>>,
    offline: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request of `category` with `response` unless something is queued
    pub fn with_default(mut self, category: &str, response: Value) -> Self {
        self.defaults
            .get_mut()
            .insert(category.to_string(), response.to_string());
        self
    }

    /// Answer the next request of `category` with `response`
    pub fn with_response(mut self, category: &str, response: Value) -> Self {
        self.queued
            .get_mut()
            .entry(category.to_string())
            .or_default()
            .push_back(response.to_string());
        self
    }

    /// Answer the next request of `category` with a raw body
    pub fn with_raw(mut self, category: &str, body: &str) -> Self {
        self.queued
            .get_mut()
            .entry(category.to_string())
            .or_default()
            .push_back(body.to_string());
        self
    }

    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        *self.screenshot.get_mut() = Some(Bytes::from(png));
        self
    }

    /// Fail every request at the transport level
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn push_response(&self, category: &str, response: Value) {
        self.queued
            .lock()
            .await
            .entry(category.to_string())
            .or_default()
            .push_back(response.to_string());
    }

    pub async fn requests(&self) -> Vec<LoggedRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests of one category, in order
    pub async fn requests_for(&self, category: &str) -> Vec<LoggedRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect()
    }
}

/// Successful driver answer carrying `fields`
pub fn ok_response(fields: Value) -> Value {
    let mut response = json!({"status": 0, "message": ""});
    if let (Some(target), Value::Object(extra)) = (response.as_object_mut(), fields) {
        target.extend(extra);
    }
    response
}

/// Failed driver answer
pub fn error_response(status: i64, message: &str) -> Value {
    json!({"status": status, "message": message})
}

#[async_trait]
impl MobileTransport for MockTransport {
    async fn post(&self, request: &WireRequest) -> Result<String> {
        let category = request
            .url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        self.requests.lock().await.push(LoggedRequest {
            category: category.clone(),
            args: if request.body.is_empty() {
                Vec::new()
            } else {
                request.body.split('\n').map(str::to_string).collect()
            },
            token: request.token.clone(),
        });

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::internal("connection refused"));
        }

        if let Some(body) = self
            .queued
            .lock()
            .await
            .get_mut(&category)
            .and_then(VecDeque::pop_front)
        {
            return Ok(body);
        }

        Ok(self
            .defaults
            .lock()
            .await
            .get(&category)
            .cloned()
            .unwrap_or_else(|| ok_response(Value::Null).to_string()))
    }

    async fn get_bytes(&self, _url: &str, _user_agent: &str) -> Result<Bytes> {
        self.screenshot
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::internal("no screenshot available"))
    }
}
