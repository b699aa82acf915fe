//! Channel manager implementation
//!
//! Keeps the registry of running channels in insertion order. Exactly one
//! channel is current while the registry is not empty; an empty registry
//! exposes the null-object channel.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::channel::instance::Channel;
use crate::channel::traits::{ChannelInfo, ChannelState, EngineFactory, StartRequest};
use crate::config::Config;
use crate::report::{ActionStatus, NoopRecorder, Recorder, StatusCode};

/// Registry of running channels
#[derive(Debug)]
pub struct ChannelManager {
    channels: Vec<Arc<Channel>>,
    current: Arc<Channel>,
    factory: Arc<dyn EngineFactory>,
    config: Config,
    recorder: Arc<dyn Recorder>,
}

impl ChannelManager {
    /// Create an empty manager
    pub fn new(config: Config, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            channels: Vec::new(),
            current: Arc::new(Channel::empty()),
            factory,
            config,
            recorder: Arc::new(NoopRecorder),
        }
    }

    /// Create a manager whose channels report to `recorder`
    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn recorder(&self) -> &Arc<dyn Recorder> {
        &self.recorder
    }

    /// Current channel, the null-object channel when none is running
    pub fn current_channel(&self) -> Arc<Channel> {
        self.current.clone()
    }

    pub fn get_channel(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.iter().find(|c| c.name() == name).cloned()
    }

    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    pub fn channels_info(&self) -> Vec<ChannelInfo> {
        self.channels.iter().map(|c| c.info()).collect()
    }

    fn set_current_channel(&mut self, channel: Arc<Channel>) {
        for c in &self.channels {
            c.set_current(Arc::ptr_eq(c, &channel));
        }
        channel.set_current(true);
        self.current = channel;
    }

    fn inventory(&self) -> serde_json::Value {
        serde_json::to_value(self.channels_info()).unwrap_or(serde_json::Value::Null)
    }

    /// Start a new channel and make it current
    #[instrument(skip(self, status))]
    pub async fn start_channel(
        &mut self,
        status: &mut ActionStatus,
        name: &str,
        application: &str,
    ) -> Option<Arc<Channel>> {
        status.start_duration();

        if let Some(existing) = self.get_channel(name) {
            if existing.state() == ChannelState::Running {
                status.set_error(
                    StatusCode::ChannelStartError,
                    format!("channel [{}] is already running", name),
                );
                status.set_data(self.inventory());
                status.end_duration();
                return None;
            }
        }

        let request = StartRequest::new(name, application, self.config.clone());
        info!("Starting channel [{}] ({}) on {}", name, request.kind, application);

        let started = match self.factory.create(&request).await {
            Ok(engine) => {
                let channel = Arc::new(Channel::new(
                    name,
                    application,
                    request.kind,
                    engine,
                    self.config.retry_timing(),
                    self.recorder.clone(),
                ));

                channel.mark_running();
                self.channels.retain(|c| c.name() != name);
                self.channels.push(channel.clone());
                self.set_current_channel(channel.clone());

                status.set_no_error();
                status.set_channel(name);
                Some(channel)
            }
            Err(e) => {
                warn!("Unable to start channel [{}]: {}", name, e);
                status.set_error(StatusCode::ChannelStartError, e.to_string());
                None
            }
        };

        status.set_data(self.inventory());
        status.end_duration();
        started
    }

    /// Make the named channel current
    #[instrument(skip(self, status))]
    pub fn switch_channel(&mut self, status: &mut ActionStatus, name: &str) {
        status.start_duration();

        match self.get_channel(name) {
            Some(channel) => {
                if !channel.is_current() {
                    self.set_current_channel(channel);
                    status.set_data(self.inventory());
                    status.set_channel(name);
                }
                status.set_no_error();
                status.end_duration();
            }
            None => {
                status.set_error(
                    StatusCode::ChannelNotFound,
                    format!("channel [{}] is not running", name),
                );
            }
        }
    }

    /// Close the named channel and unregister it
    #[instrument(skip(self, status))]
    pub async fn close_channel(&mut self, status: &mut ActionStatus, name: &str, keep_running: bool) {
        match self.get_channel(name) {
            Some(channel) => {
                if let Err(e) = channel.close(keep_running).await {
                    warn!("Error while closing channel [{}]: {}", name, e);
                }
                self.channel_closed(status, &channel);
            }
            None => {
                status.set_error(
                    StatusCode::ChannelNotFound,
                    format!("channel [{}] is not running", name),
                );
            }
        }
    }

    /// Unregister a closed channel, promoting the first remaining one
    pub fn channel_closed(&mut self, status: &mut ActionStatus, channel: &Arc<Channel>) {
        status.start_duration();

        let before = self.channels.len();
        self.channels.retain(|c| !Arc::ptr_eq(c, channel));

        if self.channels.len() < before {
            if let Some(first) = self.channels.first().cloned() {
                if channel.is_current() {
                    channel.set_current(false);
                    status.set_channel(first.name());
                    self.set_current_channel(first);
                }
            } else {
                channel.set_current(false);
                self.current = Arc::new(Channel::empty());
            }

            status.set_no_error();
            status.set_data(self.inventory());
        } else {
            status.set_error(
                StatusCode::ChannelStartError,
                format!("channel '{}' not found", channel.name()),
            );
        }
        status.end_duration();
    }

    /// Close every channel, oldest first
    pub async fn close_all(&mut self) {
        while !self.channels.is_empty() {
            let channel = self.channels.remove(0);
            if let Err(e) = channel.close(false).await {
                warn!("Error while closing channel [{}]: {}", channel.name(), e);
            }
            channel.set_current(false);
        }
        self.current = Arc::new(Channel::empty());
    }

    /// Close every channel and stop their sessions
    pub async fn tear_down(&mut self) {
        info!("Tearing down {} channel(s)", self.channels.len());
        self.close_all().await;
    }
}
