//! Mobile session end to end over a scripted driver

mod common;

use ats_oxide::element::{CalculatedProperty, SearchedElement, TestElement};
use ats_oxide::engine::mobile::client::{APP, CAPTURE, DRIVER, TAP};
use ats_oxide::engine::mobile::mock::error_response;
use ats_oxide::engine::types::{MouseDirection, Rectangle};
use ats_oxide::report::{ActionStatus, MemoryRecorder, StatusCode};
use std::sync::Arc;

use common::{mobile_channel, shop_transport, shop_tree_with_trail_at};

#[tokio::test]
async fn test_find_and_tap_cell() {
    let transport = shop_transport();
    let channel = mobile_channel(transport.clone(), Arc::new(MemoryRecorder::new())).await;

    let query = SearchedElement::new("Cell")
        .with_property(CalculatedProperty::new("text", "Trail"))
        .with_parent(SearchedElement::new("List"));
    let element = TestElement::find(channel, &query).await;
    assert_eq!(element.count(), 1);
    assert_eq!(element.found_element().map(|e| e.id.as_str()), Some("item-2"));

    let mut status = ActionStatus::new();
    element.click(&mut status, &MouseDirection::default()).await;
    assert!(status.is_passed(), "{}", status.message());

    let taps: Vec<Vec<String>> = transport
        .requests_for(TAP)
        .await
        .into_iter()
        .map(|r| r.args)
        .collect();
    assert_eq!(taps, vec![vec!["540", "500", "1"]]);
}

#[tokio::test]
async fn test_rejected_tap_is_retried() {
    let transport = shop_transport();
    let channel = mobile_channel(transport.clone(), Arc::new(MemoryRecorder::new())).await;
    transport
        .push_response(TAP, error_response(-2, "element is covered"))
        .await;

    let query = SearchedElement::new("TextField").with_property(CalculatedProperty::new("name", "search"));
    let element = TestElement::find(channel, &query).await;

    let mut status = ActionStatus::new();
    element.click(&mut status, &MouseDirection::default()).await;
    assert!(status.is_passed(), "{}", status.message());
    assert_eq!(transport.requests_for(TAP).await.len(), 2);
}

#[tokio::test]
async fn test_attribute_read_is_recorded() {
    let recorder = Arc::new(MemoryRecorder::new());
    let channel = mobile_channel(shop_transport(), recorder.clone()).await;

    let query = SearchedElement::new("TextField").with_property(CalculatedProperty::new("name", "search"));
    let element = TestElement::find(channel, &query).await;

    let mut status = ActionStatus::new();
    assert_eq!(element.property(&mut status, "text").await, "shoes");

    let mut status = ActionStatus::new();
    assert_eq!(element.property(&mut status, "color").await, "");
    assert_eq!(status.code(), StatusCode::AttributeNotSet);
    assert_eq!(status.message(), "attribute 'color' not found");

    assert_eq!(recorder.entries().len(), 2);
}

#[tokio::test]
async fn test_closing_stops_application_and_driver() {
    let transport = shop_transport();
    let channel = mobile_channel(transport.clone(), Arc::new(MemoryRecorder::new())).await;

    channel.close(false).await.unwrap();

    let apps: Vec<Vec<String>> = transport
        .requests_for(APP)
        .await
        .into_iter()
        .map(|r| r.args)
        .collect();
    assert_eq!(apps.last().cloned(), Some(vec!["stop".to_string(), "com.example.shop".to_string()]));

    let drivers = transport.requests_for(DRIVER).await;
    assert_eq!(drivers.last().map(|r| r.args.clone()), Some(vec!["stop".to_string()]));
}

#[tokio::test]
async fn test_settling_wait_tracks_moving_cell() {
    let transport = shop_transport();
    let channel = mobile_channel(transport.clone(), Arc::new(MemoryRecorder::new())).await;

    let query = SearchedElement::new("Cell").with_property(CalculatedProperty::new("text", "Trail"));
    let mut element = TestElement::find(channel, &query).await;
    assert_eq!(element.count(), 1);

    // the cell slides in: 300, 350, then rests at 400
    transport.push_response(CAPTURE, shop_tree_with_trail_at(300)).await;
    transport.push_response(CAPTURE, shop_tree_with_trail_at(350)).await;

    assert_eq!(element.wait_animation().await, 2);
    assert_eq!(
        element.found_element().map(|e| e.rect),
        Some(Rectangle::new(0.0, 400.0, 1080.0, 200.0))
    );
}
