//! Channel management traits
//!
//! This module defines the backend kinds, the engine factory interface and
//! the channel inventory types.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::traits::DriverEngine;
use crate::Result;

/// Backend variant bound to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Web,
    Desktop,
    Mobile,
    Api,
}

const BROWSERS: &[&str] = &[
    "chrome", "chromium", "firefox", "edge", "msedge", "opera", "brave", "safari", "ie",
];

impl EngineKind {
    /// Classify an application string
    pub fn from_application(application: &str) -> Self {
        let lower = application.trim().to_lowercase();
        if lower.starts_with("mobile://") {
            EngineKind::Mobile
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            EngineKind::Api
        } else if BROWSERS.contains(&lower.as_str()) {
            EngineKind::Web
        } else {
            EngineKind::Desktop
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::Web => "web",
            EngineKind::Desktop => "desktop",
            EngineKind::Mobile => "mobile",
            EngineKind::Api => "api",
        };
        f.write_str(name)
    }
}

/// Channel lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Starting,
    Running,
    Closed,
}

/// Everything needed to build the engine of a new channel
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub name: String,
    pub application: String,
    pub kind: EngineKind,
    pub config: Config,
}

impl StartRequest {
    pub fn new(name: &str, application: &str, config: Config) -> Self {
        Self {
            name: name.to_string(),
            application: application.to_string(),
            kind: EngineKind::from_application(application),
            config,
        }
    }
}

/// Builds driver engines for new channels
#[async_trait]
pub trait EngineFactory: Send + Sync + fmt::Debug {
    /// Start the backend session and return its engine
    async fn create(&self, request: &StartRequest) -> Result<Arc<dyn DriverEngine>>;
}

/// Inventory entry reported in action status data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub application: String,
    pub kind: EngineKind,
    pub current: bool,
    pub state: ChannelState,
}
