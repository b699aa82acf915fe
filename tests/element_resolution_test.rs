//! Element resolution through the channel registry
//!
//! Drives `TestElement` against channels started by `ChannelManager` with a
//! scripted engine factory.

mod common;

use ats_oxide::channel::{ChannelManager, MockEngineFactory};
use ats_oxide::element::{CalculatedProperty, CalculatedValue, Comparison, SearchedElement, TestElement};
use ats_oxide::engine::types::MouseDirection;
use ats_oxide::engine::DriverEngine;
use ats_oxide::report::{ActionStatus, MemoryRecorder, StatusCode};
use async_trait::async_trait;
use std::sync::Arc;

use common::{fast_config, login_page};

#[derive(Debug)]
struct LoginPageFactory;

#[async_trait]
impl ats_oxide::channel::EngineFactory for LoginPageFactory {
    async fn create(
        &self,
        _request: &ats_oxide::channel::StartRequest,
    ) -> ats_oxide::Result<Arc<dyn DriverEngine>> {
        Ok(Arc::new(login_page()))
    }
}

async fn started(recorder: Arc<MemoryRecorder>) -> ChannelManager {
    let mut manager =
        ChannelManager::new(fast_config(), Arc::new(LoginPageFactory)).with_recorder(recorder);
    let mut status = ActionStatus::new();
    manager.start_channel(&mut status, "main", "login.exe").await;
    assert!(status.is_passed(), "{}", status.message());
    manager
}

fn email_in_login_form() -> SearchedElement {
    SearchedElement::new("input")
        .with_property(CalculatedProperty::new("name", "email"))
        .with_parent(
            SearchedElement::new("form").with_property(CalculatedProperty::new("name", "login")),
        )
}

#[tokio::test]
async fn test_resolve_and_read_value() {
    let recorder = Arc::new(MemoryRecorder::new());
    let manager = started(recorder.clone()).await;

    let element = TestElement::find(manager.current_channel(), &email_in_login_form()).await;
    assert_eq!(element.count(), 2);
    assert_eq!(element.parent().map(|p| p.count()), Some(1));

    let mut status = ActionStatus::new();
    element.check_occurrences(&mut status, Comparison::Equal, 2);
    assert!(status.is_passed());

    let mut status = ActionStatus::new();
    let value = element.property(&mut status, "value").await;
    assert!(status.is_passed());
    assert_eq!(value, "qa@example.com");

    let entries = recorder.entries();
    assert!(entries.iter().any(|e| e.value.as_deref() == Some("qa@example.com")));
}

#[tokio::test]
async fn test_occurrence_mismatch_is_reported() {
    let recorder = Arc::new(MemoryRecorder::new());
    let manager = started(recorder.clone()).await;

    let element = TestElement::find(manager.current_channel(), &email_in_login_form()).await;
    let mut status = ActionStatus::new();
    element.check_occurrences(&mut status, Comparison::Equal, 1);

    assert!(!status.is_passed());
    assert_eq!(status.code(), StatusCode::OccurrencesError);
    assert_eq!(status.value(), Some("2"));
}

#[tokio::test]
async fn test_password_entry_is_masked() {
    let manager = started(Arc::new(MemoryRecorder::new())).await;
    let query = SearchedElement::new("input").with_property(CalculatedProperty::new("name", "password"));

    let mut element = TestElement::find(manager.current_channel(), &query).await;
    assert!(element.is_password());

    let mut status = ActionStatus::new();
    let shown = element
        .enter_text(&mut status, &CalculatedValue::from("s3cret"))
        .await;
    assert!(status.is_passed(), "{}", status.message());
    assert_eq!(shown, "########");
}

#[tokio::test]
async fn test_missing_element_fails_actions() {
    let manager = started(Arc::new(MemoryRecorder::new())).await;
    let query = SearchedElement::new("button").with_property(CalculatedProperty::new("id", "nope"));

    let element = TestElement::find(manager.current_channel(), &query).await;
    assert_eq!(element.count(), 0);

    let mut status = ActionStatus::new();
    element.click(&mut status, &MouseDirection::default()).await;
    assert_eq!(status.code(), StatusCode::ObjectNotFound);
}

#[tokio::test]
async fn test_switching_channels_changes_resolution_target() {
    let factory = Arc::new(MockEngineFactory::new());
    let mut manager = ChannelManager::new(fast_config(), factory.clone());

    let mut status = ActionStatus::new();
    manager.start_channel(&mut status, "first", "first.exe").await;
    manager.start_channel(&mut status, "second", "second.exe").await;

    let mut status = ActionStatus::new();
    manager.switch_channel(&mut status, "first");
    assert_eq!(manager.current_channel().name(), "first");

    let element = TestElement::find(manager.current_channel(), &SearchedElement::new("div")).await;
    assert_eq!(element.count(), 0);

    let first = factory.engine("first").await.unwrap();
    let second = factory.engine("second").await.unwrap();
    assert_eq!(first.calls().find.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(second.calls().find.load(std::sync::atomic::Ordering::SeqCst), 0);

    manager.tear_down().await;
    assert!(first.is_closed());
    assert!(second.is_closed());
}
