//! Common test utilities
//!
//! Shared fixtures for the integration tests: fast retry timing, a scripted
//! desktop-like engine and a scripted mobile driver.

#![allow(dead_code)]

use ats_oxide::channel::{Channel, EngineKind};
use ats_oxide::config::{Config, RetryTiming};
use ats_oxide::engine::mobile::client::{APP, CAPTURE, DRIVER};
use ats_oxide::engine::mobile::mock::ok_response;
use ats_oxide::engine::mobile::{MobileDriverEngine, MockTransport};
use ats_oxide::engine::mock::{MockEngine, MockNode};
use ats_oxide::report::Recorder;
use serde_json::{json, Value};
use std::sync::Arc;

pub const MOBILE_APPLICATION: &str = "mobile://10.0.0.5:8080/com.example.shop";

/// Configuration with millisecond delays
pub fn fast_config() -> Config {
    Config {
        max_try: 4,
        max_try_interactable: 4,
        interactable_delay_ms: 1,
        cooldown_ms: 1,
        animation_sample_ms: 1,
        progressive_step_ms: 1,
        ..Config::default()
    }
}

pub fn fast_timing() -> RetryTiming {
    fast_config().retry_timing()
}

/// Login page with two email fields and a password field
pub fn login_page() -> MockEngine {
    MockEngine::new()
        .with_node(MockNode::new("form", "form").attr("name", "login"))
        .with_node(
            MockNode::new("email", "input")
                .attr("name", "email")
                .attr("value", "qa@example.com")
                .child_of("form"),
        )
        .with_node(
            MockNode::new("backup", "input")
                .attr("name", "email")
                .child_of("form"),
        )
        .with_node(
            MockNode::new("password", "input")
                .attr("name", "password")
                .attr("type", "password")
                .child_of("form"),
        )
        .with_node(MockNode::new("submit", "button").text("Sign in").child_of("form"))
}

fn driver_start() -> Value {
    ok_response(json!({
        "token": "tok-it",
        "os": "android",
        "systemName": "Android 14",
        "driverVersion": "1.2.0",
        "mobileName": "Pixel 8",
        "deviceWidth": 1080,
        "deviceHeight": 2400,
        "channelWidth": 1080,
        "channelHeight": 2400,
        "screenCapturePort": 47633,
        "systemButtons": ["home", "back"],
    }))
}

/// Shop tree with the second cell at `trail_y`
pub fn shop_tree_with_trail_at(trail_y: i64) -> Value {
    ok_response(json!({
        "root": {
            "id": "root", "tag": "App",
            "x": 0, "y": 0, "width": 1080, "height": 2400,
            "children": [
                {
                    "id": "search", "tag": "TextField",
                    "x": 20, "y": 100, "width": 1040, "height": 80,
                    "attributes": {"name": "search", "text": "shoes"}
                },
                {
                    "id": "list", "tag": "List",
                    "x": 0, "y": 200, "width": 1080, "height": 1800,
                    "children": [
                        {
                            "id": "item-1", "tag": "Cell",
                            "x": 0, "y": 200, "width": 1080, "height": 200,
                            "attributes": {"text": "Runner"}
                        },
                        {
                            "id": "item-2", "tag": "Cell",
                            "x": 0, "y": trail_y, "width": 1080, "height": 200,
                            "attributes": {"text": "Trail"}
                        }
                    ]
                }
            ]
        }
    }))
}

/// Mobile driver answering a shop application
pub fn shop_transport() -> Arc<MockTransport> {
    Arc::new(
        MockTransport::new()
            .with_response(DRIVER, driver_start())
            .with_response(APP, ok_response(json!({"version": "2.0.0"})))
            .with_default(CAPTURE, shop_tree_with_trail_at(400)),
    )
}

/// Channel bound to a mobile engine started over `transport`
pub async fn mobile_channel(
    transport: Arc<MockTransport>,
    recorder: Arc<dyn Recorder>,
) -> Arc<Channel> {
    let config = fast_config();
    let engine = MobileDriverEngine::start_with_transport(MOBILE_APPLICATION, &config, transport)
        .await
        .expect("mobile session should start");

    let channel = Arc::new(Channel::new(
        "phone",
        MOBILE_APPLICATION,
        EngineKind::Mobile,
        Arc::new(engine),
        config.retry_timing(),
        recorder,
    ));
    channel.mark_running();
    channel
}
