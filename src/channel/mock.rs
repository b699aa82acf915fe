//! Mock engine factory for testing
//!
//! `MockEngineFactory` hands out `MockEngine`s and keeps them by channel name
//! so tests can inspect what each channel did.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::channel::traits::{EngineFactory, StartRequest};
use crate::engine::mock::MockEngine;
use crate::engine::traits::DriverEngine;
use crate::{Error, Result};

/// Mock engine factory
#[derive(Debug, Default)]
pub struct MockEngineFactory {
    engines: RwLock<HashMap<String, Arc<MockEngine>>>,
    failing: HashSet<String>,
    created: AtomicUsize,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to start `application`
    pub fn failing(mut self, application: &str) -> Self {
        self.failing.insert(application.to_string());
        self
    }

    /// Engine of the named channel
    pub async fn engine(&self, name: &str) -> Option<Arc<MockEngine>> {
        self.engines.read().await.get(name).cloned()
    }

    /// Number of engines created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn create(&self, request: &StartRequest) -> Result<Arc<dyn DriverEngine>> {
        if self.failing.contains(&request.application) {
            return Err(Error::channel_start(format!(
                "unable to connect to : {}",
                request.application
            )));
        }

        let engine = Arc::new(MockEngine::new());
        self.engines
            .write()
            .await
            .insert(request.name.clone(), engine.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(engine)
    }
}
