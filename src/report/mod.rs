//! Action reporting
//!
//! `ActionStatus` carries the outcome of one action (code, message, duration,
//! value/data pair). The `Recorder` collaborator receives outcomes for
//! reporting; its storage format is not defined here.

pub mod status;
pub mod recorder;

pub use recorder::{ElementSummary, MemoryRecorder, NoopRecorder, RecordEntry, Recorder};
pub use status::{ActionStatus, StatusCode};
