//! Action status

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::Error;

/// Outcome code of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Ok,
    ObjectNotFound,
    ObjectNotInteractable,
    OccurrencesError,
    AttributeNotSet,
    ChannelStartError,
    ChannelNotFound,
    JavascriptError,
    Unsupported,
}

impl StatusCode {
    /// Numeric code used by reports
    pub fn code(&self) -> i32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::ObjectNotFound => -1,
            StatusCode::ObjectNotInteractable => -3,
            StatusCode::OccurrencesError => -4,
            StatusCode::AttributeNotSet => -5,
            StatusCode::ChannelStartError => -6,
            StatusCode::ChannelNotFound => -7,
            StatusCode::JavascriptError => -8,
            StatusCode::Unsupported => -9,
        }
    }
}

impl From<&Error> for StatusCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::ObjectNotFound(_) | Error::StaleReference(_) => StatusCode::ObjectNotFound,
            Error::NotInteractable(_) => StatusCode::ObjectNotInteractable,
            Error::AttributeNotSet(_) => StatusCode::AttributeNotSet,
            Error::ChannelStart(_) => StatusCode::ChannelStartError,
            Error::ChannelNotFound(_) => StatusCode::ChannelNotFound,
            Error::ScriptExecutionFailed(_) => StatusCode::JavascriptError,
            Error::Unsupported(_) => StatusCode::Unsupported,
            _ => StatusCode::ObjectNotInteractable,
        }
    }
}

/// Mutable outcome of one action, owned by the caller
#[derive(Debug, Clone)]
pub struct ActionStatus {
    passed: bool,
    code: StatusCode,
    message: String,
    started: Instant,
    duration: Duration,
    value: Option<String>,
    data: serde_json::Value,
    channel: Option<String>,
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionStatus {
    /// Create a passing status whose duration starts now
    pub fn new() -> Self {
        Self {
            passed: true,
            code: StatusCode::Ok,
            message: String::new(),
            started: Instant::now(),
            duration: Duration::ZERO,
            value: None,
            data: serde_json::Value::Null,
            channel: None,
        }
    }

    pub fn is_passed(&self) -> bool {
        self.passed
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn set_passed(&mut self, passed: bool) {
        self.passed = passed;
    }

    pub fn set_value<S: Into<String>>(&mut self, value: S) {
        self.value = Some(value.into());
    }

    pub fn set_data(&mut self, data: serde_json::Value) {
        self.data = data;
    }

    pub fn set_channel<S: Into<String>>(&mut self, name: S) {
        self.channel = Some(name.into());
    }

    /// Mark the action as passed and clear any previous error
    pub fn set_no_error(&mut self) {
        self.passed = true;
        self.code = StatusCode::Ok;
        self.message.clear();
    }

    /// Mark the action as passed with an informative message
    pub fn set_no_error_message<S: Into<String>>(&mut self, message: S) {
        self.set_no_error();
        self.message = message.into();
    }

    /// Mark the action as failed
    pub fn set_error<S: Into<String>>(&mut self, code: StatusCode, message: S) {
        self.passed = false;
        self.code = code;
        self.message = message.into();
    }

    /// Mark the action as failed and keep the observed value
    pub fn set_error_value<S: Into<String>, V: ToString>(
        &mut self,
        code: StatusCode,
        message: S,
        value: V,
    ) {
        self.set_error(code, message);
        self.value = Some(value.to_string());
    }

    /// Mark the action as failed, the duration being measured from `since`
    pub fn set_error_since<S: Into<String>>(&mut self, code: StatusCode, message: S, since: Instant) {
        self.set_error(code, message);
        self.duration = since.elapsed();
    }

    /// Override the measured duration
    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.duration = elapsed;
    }

    /// Restart the duration measurement
    pub fn start_duration(&mut self) {
        self.started = Instant::now();
        self.duration = Duration::ZERO;
    }

    /// Freeze the duration measured since the last start
    pub fn end_duration(&mut self) {
        self.duration = self.started.elapsed();
    }
}
