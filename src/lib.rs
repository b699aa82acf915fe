//! ATS-Oxide: backend-agnostic UI element resolution and action engine
//!
//! This library resolves declarative element queries against heterogeneous
//! automation backends and runs retried actions on the resolved handles.
//! A mobile driver client is provided as the built-in backend.

pub mod error;
pub mod config;

pub mod report;
pub mod element;
pub mod engine;
pub mod channel;

// Re-exports
pub use error::{Error, Result};
pub use config::{Config, RetryTiming};

/// ATS-Oxide library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
