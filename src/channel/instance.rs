//! Running application session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::channel::traits::{ChannelInfo, ChannelState, EngineKind};
use crate::config::RetryTiming;
use crate::engine::empty::EmptyEngine;
use crate::engine::traits::DriverEngine;
use crate::engine::types::ChannelDimensions;
use crate::report::{ActionStatus, NoopRecorder, Recorder};
use crate::Result;

/// One running application bound to its driver engine
#[derive(Debug)]
pub struct Channel {
    id: String,
    name: String,
    application: String,
    kind: EngineKind,
    engine: Arc<dyn DriverEngine>,
    current: AtomicBool,
    state: RwLock<ChannelState>,
    timing: RetryTiming,
    recorder: Arc<dyn Recorder>,
}

impl Channel {
    /// Create a channel around a started engine, still `Starting` until
    /// [`mark_running`](Self::mark_running)
    pub fn new(
        name: &str,
        application: &str,
        kind: EngineKind,
        engine: Arc<dyn DriverEngine>,
        timing: RetryTiming,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            application: application.to_string(),
            kind,
            engine,
            current: AtomicBool::new(false),
            state: RwLock::new(ChannelState::Starting),
            timing,
            recorder,
        }
    }

    /// Null-object channel of an empty registry
    pub fn empty() -> Self {
        let channel = Self::new(
            "",
            "",
            EngineKind::Desktop,
            Arc::new(EmptyEngine::new()),
            RetryTiming::default(),
            Arc::new(NoopRecorder),
        );
        channel.set_state(ChannelState::Closed);
        channel
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    pub fn engine(&self) -> &Arc<dyn DriverEngine> {
        &self.engine
    }

    pub fn timing(&self) -> &RetryTiming {
        &self.timing
    }

    pub fn recorder(&self) -> &Arc<dyn Recorder> {
        &self.recorder
    }

    /// True for the null-object channel
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst)
    }

    pub(crate) fn set_current(&self, current: bool) {
        self.current.store(current, Ordering::SeqCst);
    }

    pub fn state(&self) -> ChannelState {
        self.state
            .read()
            .map(|state| *state)
            .unwrap_or(ChannelState::Closed)
    }

    /// Promote a starting channel to `Running`; closed channels stay closed
    pub fn mark_running(&self) {
        if self.state() == ChannelState::Starting {
            self.set_state(ChannelState::Running);
        }
    }

    pub(crate) fn set_state(&self, state: ChannelState) {
        if let Ok(mut current) = self.state.write() {
            *current = state;
        }
    }

    pub fn dimensions(&self) -> ChannelDimensions {
        self.engine.dimensions()
    }

    /// Channel-local point to device coordinates
    pub fn to_device(&self, x: f64, y: f64) -> (f64, f64) {
        let origin = self.dimensions().channel;
        (x + origin.x, y + origin.y)
    }

    /// Device point to channel-local coordinates
    pub fn to_channel(&self, x: f64, y: f64) -> (f64, f64) {
        let origin = self.dimensions().channel;
        (x - origin.x, y - origin.y)
    }

    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Diagnostic event for this channel
    pub fn send_log(&self, code: i32, message: &str, value: impl std::fmt::Display) {
        info!(channel = %self.name, code, value = %value, "{}", message);
    }

    /// Hook run after every element action
    pub fn action_terminated(&self, status: &ActionStatus) {
        debug!(
            channel = %self.name,
            passed = status.is_passed(),
            code = status.code().code(),
            "Action terminated"
        );
    }

    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            name: self.name.clone(),
            application: self.application.clone(),
            kind: self.kind,
            current: self.is_current(),
            state: self.state(),
        }
    }

    /// Tear down the engine; `keep_running` leaves the application alive
    #[instrument(skip(self), fields(channel = %self.name))]
    pub async fn close(&self, keep_running: bool) -> Result<()> {
        if self.state() == ChannelState::Closed {
            return Ok(());
        }
        self.set_state(ChannelState::Closed);
        self.engine.close(keep_running).await
    }
}
