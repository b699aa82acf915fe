//! Driver registry
//!
//! `DriverManager` builds the engine of a new channel from its application
//! string. Mobile engines are built in; other backend kinds are served by
//! registered factories.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::channel::traits::{EngineFactory, EngineKind, StartRequest};
use crate::engine::mobile::MobileDriverEngine;
use crate::engine::traits::DriverEngine;
use crate::{Error, Result};

/// Factory of mobile driver sessions over HTTP
#[derive(Debug, Default)]
pub struct MobileEngineFactory;

#[async_trait]
impl EngineFactory for MobileEngineFactory {
    async fn create(&self, request: &StartRequest) -> Result<Arc<dyn DriverEngine>> {
        let engine = MobileDriverEngine::start(request).await?;
        Ok(Arc::new(engine))
    }
}

/// Engine factory dispatching on the backend kind
#[derive(Debug)]
pub struct DriverManager {
    factories: HashMap<EngineKind, Arc<dyn EngineFactory>>,
}

impl Default for DriverManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverManager {
    /// Registry with the built-in mobile factory
    pub fn new() -> Self {
        let mut factories: HashMap<EngineKind, Arc<dyn EngineFactory>> = HashMap::new();
        factories.insert(EngineKind::Mobile, Arc::new(MobileEngineFactory));
        Self { factories }
    }

    /// Serve `kind` with `factory`, replacing any previous one
    pub fn register(mut self, kind: EngineKind, factory: Arc<dyn EngineFactory>) -> Self {
        self.factories.insert(kind, factory);
        self
    }

    pub fn supports(&self, kind: EngineKind) -> bool {
        self.factories.contains_key(&kind)
    }
}

#[async_trait]
impl EngineFactory for DriverManager {
    #[instrument(skip(self, request), fields(kind = %request.kind))]
    async fn create(&self, request: &StartRequest) -> Result<Arc<dyn DriverEngine>> {
        let factory = self
            .factories
            .get(&request.kind)
            .ok_or_else(|| Error::channel_start(format!("no driver available for {}", request.kind)))?;

        debug!("Creating {} engine for {}", request.kind, request.application);
        factory.create(request).await
    }
}
