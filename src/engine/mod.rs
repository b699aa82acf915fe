//! Driver engines
//!
//! This module defines the capability contract every automation backend
//! implements, the types shared by all backends and the built-in engines:
//! - `empty`: null-object engine of the empty channel
//! - `mobile`: mobile driver protocol client
//! - `mock`: scripted engine for tests

pub mod traits;
pub mod types;
pub mod empty;
pub mod image;
pub mod mobile;
pub mod mock;

pub use empty::EmptyEngine;
pub use traits::{DriverEngine, ElementQuery};
pub use types::{
    Cartesian, ChannelDimensions, ImageTemplate, ModifierKey, MouseDirection, MousePosition,
    Rectangle, SendKeyData,
};
