//! Recorder collaborator

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Mutex;

use crate::report::status::{ActionStatus, StatusCode};

/// Reporting view of a resolved element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementSummary {
    pub tag: String,
    pub criterias: String,
    pub count: usize,
    pub search_duration_ms: u128,
}

/// Receives action outcomes for reporting
pub trait Recorder: Send + Sync + Debug {
    /// Outcome of an element action
    fn update(&self, status: &ActionStatus, element: Option<&ElementSummary>);

    /// Outcome of an element action that produced a value
    fn update_value(
        &self,
        status: &ActionStatus,
        element: Option<&ElementSummary>,
        value: &str,
        data: &str,
    );

    /// Screen refresh request
    fn update_screen(&self, status: &ActionStatus);
}

/// Recorder that drops everything
#[derive(Debug, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn update(&self, _status: &ActionStatus, _element: Option<&ElementSummary>) {}

    fn update_value(
        &self,
        _status: &ActionStatus,
        _element: Option<&ElementSummary>,
        _value: &str,
        _data: &str,
    ) {
    }

    fn update_screen(&self, _status: &ActionStatus) {}
}

/// One recorded outcome
#[derive(Debug, Clone, Serialize)]
pub struct RecordEntry {
    pub timestamp: DateTime<Utc>,
    pub screen: bool,
    pub code: StatusCode,
    pub passed: bool,
    pub message: String,
    pub duration_ms: u128,
    pub element: Option<ElementSummary>,
    pub value: Option<String>,
    pub data: Option<String>,
}

/// In-memory recorder
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    entries: Mutex<Vec<RecordEntry>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries
    pub fn entries(&self) -> Vec<RecordEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Recorded entries as a JSON array
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.entries()).unwrap_or(serde_json::Value::Null)
    }

    fn push(
        &self,
        status: &ActionStatus,
        screen: bool,
        element: Option<&ElementSummary>,
        value: Option<&str>,
        data: Option<&str>,
    ) {
        let entry = RecordEntry {
            timestamp: Utc::now(),
            screen,
            code: status.code(),
            passed: status.is_passed(),
            message: status.message().to_string(),
            duration_ms: status.duration().as_millis(),
            element: element.cloned(),
            value: value.map(str::to_string),
            data: data.map(str::to_string),
        };

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

impl Recorder for MemoryRecorder {
    fn update(&self, status: &ActionStatus, element: Option<&ElementSummary>) {
        self.push(status, false, element, None, None);
    }

    fn update_value(
        &self,
        status: &ActionStatus,
        element: Option<&ElementSummary>,
        value: &str,
        data: &str,
    ) {
        self.push(status, false, element, Some(value), Some(data));
    }

    fn update_screen(&self, status: &ActionStatus) {
        self.push(status, true, None, None, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_recorder_keeps_order() {
        let recorder = MemoryRecorder::new();
        let mut status = ActionStatus::new();

        recorder.update_screen(&status);
        status.set_error(StatusCode::AttributeNotSet, "attribute 'href' not found");
        recorder.update_value(&status, None, "", "href");

        let entries = recorder.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].screen);
        assert_eq!(entries[1].code, StatusCode::AttributeNotSet);
        assert_eq!(entries[1].data.as_deref(), Some("href"));
        assert!(recorder.to_json().is_array());
    }

    #[test]
    fn test_entries_serialize_with_timestamp() {
        let recorder = MemoryRecorder::new();
        recorder.update(&ActionStatus::new(), None);

        let json = recorder.to_json();
        let entry = &json[0];
        assert_eq!(entry["code"], "OK");
        let timestamp = entry["timestamp"].as_str().unwrap_or_default();
        assert!(timestamp.parse::<DateTime<Utc>>().is_ok());
    }
}
