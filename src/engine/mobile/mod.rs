//! Mobile driver backend
//!
//! This module talks to a remote mobile automation driver over HTTP:
//! - `client`: wire format, transport trait and reqwest transport
//! - `tree`: arena mirror of the captured element hierarchy and hit testing
//! - `cache`: time-bounded snapshot used by read-heavy operations
//! - `engine`: `DriverEngine` implementation
//! - `mock`: scripted transport for tests

pub mod cache;
pub mod client;
pub mod engine;
pub mod mock;
pub mod tree;


pub use cache::TimedCache;
pub use client::{HttpTransport, MobileClient, MobileEndpoint, MobileResponse, MobileTransport, WireRequest};
pub use engine::{DeviceInfo, MobileDriverEngine};
pub use mock::MockTransport;
pub use tree::{MobileNode, MobileTree, NodeId};
