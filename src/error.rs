//! Unified error types for ATS-Oxide

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for ATS-Oxide
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image decoding/encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Element handle invalidated by a UI mutation (transient)
    #[error("Stale element reference: {0}")]
    StaleReference(String),

    /// Element exists but cannot receive the action yet (transient)
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// No element matched the query
    #[error("Element not found: {0}")]
    ObjectNotFound(String),

    /// Attribute absent on a resolved element
    #[error("Attribute not set: {0}")]
    AttributeNotSet(String),

    /// Channel (session) could not be started
    #[error("Channel start error: {0}")]
    ChannelStart(String),

    /// No channel with the requested name
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Backend wire protocol fault
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Capability not offered by this backend
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Criteria or operator that cannot be evaluated
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new stale reference error
    pub fn stale_reference<S: Into<String>>(msg: S) -> Self {
        Error::StaleReference(msg.into())
    }

    /// Create a new not interactable error
    pub fn not_interactable<S: Into<String>>(msg: S) -> Self {
        Error::NotInteractable(msg.into())
    }

    /// Create a new object not found error
    pub fn object_not_found<S: Into<String>>(msg: S) -> Self {
        Error::ObjectNotFound(msg.into())
    }

    /// Create a new attribute not set error
    pub fn attribute_not_set<S: Into<String>>(name: S) -> Self {
        Error::AttributeNotSet(name.into())
    }

    /// Create a new channel start error
    pub fn channel_start<S: Into<String>>(msg: S) -> Self {
        Error::ChannelStart(msg.into())
    }

    /// Create a new channel not found error
    pub fn channel_not_found<S: Into<String>>(name: S) -> Self {
        Error::ChannelNotFound(name.into())
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }

    /// Create a new invalid criteria error
    pub fn invalid_criteria<S: Into<String>>(msg: S) -> Self {
        Error::InvalidCriteria(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Faults a retry loop may absorb
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StaleReference(_) | Error::NotInteractable(_))
    }

    /// Stale handle raised during resolution
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::StaleReference(_))
    }
}
