//! Mobile driver wire client
//!
//! Every call is `POST {base_url}/{category}` with the arguments joined by
//! newlines. The answer is a JSON object carrying at least `status`
//! (0 on success) and `message`. Transport and decoding failures yield no
//! response instead of an error.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::{Error, Result};

pub const DRIVER: &str = "driver";
pub const APP: &str = "app";
pub const START: &str = "start";
pub const STOP: &str = "stop";
pub const SWITCH: &str = "switch";
pub const CAPTURE: &str = "capture";
pub const ELEMENT: &str = "element";
pub const INPUT: &str = "input";
pub const ALERT: &str = "alert";
pub const TAP: &str = "tap";
pub const PRESS: &str = "press";
pub const SWIPE: &str = "swipe";
pub const SCRIPTING: &str = "scripting";
pub const SET_PROP: &str = "property-set";
pub const GET_PROP: &str = "property";
pub const SYS_BUTTON: &str = "sysbutton";

const SCREENSHOT: &str = "screenshot";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF8";

/// Location of a mobile driver and the application to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileEndpoint {
    /// `host:port`
    pub endpoint: String,
    /// `http://host:port`
    pub base_url: String,
    pub application: Option<String>,
}

impl MobileEndpoint {
    /// Parse `mobile://host:port/application`
    pub fn parse(application: &str) -> Result<Self> {
        let path = match application.find("://") {
            Some(start) => &application[start + 3..],
            None => application,
        };

        let mut segments = path.split('/');
        let endpoint = segments.next().unwrap_or_default().trim();
        if endpoint.is_empty() {
            return Err(Error::configuration(format!(
                "missing mobile endpoint in '{}'",
                application
            )));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            base_url: format!("http://{}", endpoint),
            application: segments
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    /// Host part of the endpoint
    pub fn host(&self) -> &str {
        self.endpoint.split(':').next().unwrap_or(&self.endpoint)
    }
}

/// One wire request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub url: String,
    pub body: String,
    pub token: Option<String>,
    pub user_agent: String,
}

/// Transport carrying wire requests
#[async_trait]
pub trait MobileTransport: Send + Sync + Debug {
    /// Post a request and return the raw response body
    async fn post(&self, request: &WireRequest) -> Result<String>;

    /// Fetch a binary resource
    async fn get_bytes(&self, url: &str, user_agent: &str) -> Result<Bytes>;
}

/// reqwest based transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(
                config.read_timeout_secs + config.write_timeout_secs,
            ))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MobileTransport for HttpTransport {
    async fn post(&self, request: &WireRequest) -> Result<String> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(reqwest::header::USER_AGENT, &request.user_agent)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(request.body.clone());

        if let Some(token) = &request.token {
            builder = builder.header("Token", token);
        }

        let response = builder.send().await?;
        Ok(response.text().await?)
    }

    async fn get_bytes(&self, url: &str, user_agent: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?)
    }
}

/// Decoded JSON answer of a mobile driver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MobileResponse(Map<String, Value>);

impl MobileResponse {
    /// Parse a response body, `None` unless it is a JSON object
    pub fn parse(body: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Some(Self(map)),
            Ok(_) => None,
            Err(e) => {
                debug!("Invalid mobile driver response: {}", e);
                None
            }
        }
    }

    /// Wire status, -1 when absent
    pub fn status(&self) -> i64 {
        self.0.get("status").and_then(Value::as_i64).unwrap_or(-1)
    }

    pub fn is_success(&self) -> bool {
        self.status() == 0
    }

    pub fn message(&self) -> String {
        self.str("message").unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Session-aware client of one mobile driver
#[derive(Debug)]
pub struct MobileClient {
    endpoint: MobileEndpoint,
    transport: std::sync::Arc<dyn MobileTransport>,
    user_agent: String,
    token: RwLock<Option<String>>,
}

impl MobileClient {
    pub fn new(
        endpoint: MobileEndpoint,
        transport: std::sync::Arc<dyn MobileTransport>,
        user_agent: String,
    ) -> Self {
        Self {
            endpoint,
            transport,
            user_agent,
            token: RwLock::new(None),
        }
    }

    pub fn endpoint(&self) -> &MobileEndpoint {
        &self.endpoint
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }

    /// Post one request; `None` when the driver could not be reached or
    /// answered something that is not a JSON object
    pub async fn execute(&self, category: &str, args: &[&str]) -> Option<MobileResponse> {
        let request = WireRequest {
            url: format!("{}/{}", self.endpoint.base_url, category),
            body: args.join("\n"),
            token: self.token(),
            user_agent: self.user_agent.clone(),
        };

        match self.transport.post(&request).await {
            Ok(body) => MobileResponse::parse(&body),
            Err(e) => {
                warn!("Mobile request '{}' failed: {}", category, e);
                None
            }
        }
    }

    /// Raw device screenshot
    pub async fn screenshot(&self) -> Result<Bytes> {
        let url = format!("{}/{}", self.endpoint.base_url, SCREENSHOT);
        self.transport.get_bytes(&url, &self.user_agent).await
    }
}
