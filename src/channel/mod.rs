//! Channel management
//!
//! A channel is one running application bound to its driver engine. The
//! `ChannelManager` keeps them in start order and designates exactly one as
//! current while any is running.
//!
//! ## Module layout
//! - `traits`: backend kinds, engine factory interface and inventory types
//! - `instance`: the `Channel` itself
//! - `manager`: channel registry
//! - `driver`: factory registry building engines by backend kind
//! - `mock`: engine factory for tests

pub mod traits;
pub mod instance;
pub mod manager;
pub mod driver;
pub mod mock;


pub use driver::{DriverManager, MobileEngineFactory};
pub use instance::Channel;
pub use manager::ChannelManager;
pub use mock::MockEngineFactory;
pub use traits::{ChannelInfo, ChannelState, EngineFactory, EngineKind, StartRequest};
