use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::channel::instance::Channel;
use crate::channel::traits::EngineKind;
use crate::config::RetryTiming;
use crate::element::test_element::{ATS_OCCURRENCES, ATS_OCCURRENCES_INDEX, ATS_SEARCH_TAG};
use crate::engine::mock::{MockEngine, MockNode};
use crate::engine::types::{MouseDirection, Rectangle};
use crate::report::{ActionStatus, MemoryRecorder, NoopRecorder, StatusCode};

fn timing() -> RetryTiming {
    RetryTiming {
        max_try: 5,
        max_try_interactable: 5,
        interactable_delay: Duration::from_millis(2),
        cooldown: Duration::from_millis(1),
        animation_sample: Duration::from_millis(1),
        progressive_step: Duration::from_millis(1),
    }
}

fn channel(engine: Arc<MockEngine>) -> Arc<Channel> {
    Arc::new(Channel::new(
        "main",
        "desktop-app",
        EngineKind::Desktop,
        engine,
        timing(),
        Arc::new(NoopRecorder),
    ))
}

fn recorded_channel(engine: Arc<MockEngine>, recorder: Arc<MemoryRecorder>) -> Arc<Channel> {
    Arc::new(Channel::new(
        "main",
        "desktop-app",
        EngineKind::Desktop,
        engine,
        timing(),
        recorder,
    ))
}

fn login_form() -> MockEngine {
    MockEngine::new()
        .with_node(MockNode::new("f1", "form").attr("name", "login"))
        .with_node(MockNode::new("f2", "form").attr("name", "search"))
        .with_node(
            MockNode::new("i1", "input")
                .attr("name", "email")
                .attr("placeholder", "Mail")
                .child_of("f1"),
        )
        .with_node(
            MockNode::new("i2", "input")
                .attr("name", "email")
                .attr("placeholder", "Backup")
                .child_of("f1"),
        )
        .with_node(
            MockNode::new("i3", "input")
                .attr("name", "email")
                .attr("placeholder", "Other")
                .child_of("f2"),
        )
        .with_node(
            MockNode::new("pwd", "input")
                .attr("name", "password")
                .attr("type", "password")
                .child_of("f1"),
        )
}

fn email_query() -> SearchedElement {
    SearchedElement::new("input").with_property(CalculatedProperty::new("name", "email"))
}

#[tokio::test]
async fn test_resolution_counts_matches() {
    let engine = Arc::new(login_form());
    let element = TestElement::find(channel(engine.clone()), &email_query()).await;

    assert_eq!(element.count(), 3);
    assert!(element.is_validated());
    assert_eq!(element.criterias(), "input,name:email");
    assert_eq!(element.searched_tag(), "input");
    assert_eq!(element.found_element().map(|e| e.id.as_str()), Some("i1"));
    assert!(element.total_search_duration() >= element.search_duration());
    assert_eq!(engine.calls().find.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_parent_chain_restricts_search() {
    let engine = Arc::new(login_form());
    let query = email_query().with_parent(
        SearchedElement::new("form").with_property(CalculatedProperty::new("name", "login")),
    );

    let element = TestElement::find(channel(engine.clone()), &query).await;
    assert_eq!(element.count(), 2);
    assert_eq!(element.parent().map(|p| p.count()), Some(1));
    assert!(element.total_search_duration() >= element.parent().unwrap().total_search_duration());
    assert_eq!(engine.calls().find.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_parent_skips_child_search() {
    let engine = Arc::new(login_form());
    let query = email_query().with_parent(
        SearchedElement::new("form").with_property(CalculatedProperty::regexp("name", "sign.*")),
    );

    let element = TestElement::find(channel(engine.clone()), &query).await;
    assert_eq!(element.count(), 0);
    assert!(!element.is_validated());
    assert_eq!(engine.calls().find.load(Ordering::SeqCst), 1);
    assert_eq!(element.not_found_description(), "element not found [input,name:email]");
}

#[tokio::test]
async fn test_occurrence_index() {
    let engine = Arc::new(login_form());

    let second = TestElement::find(channel(engine.clone()), &email_query().with_index(2)).await;
    assert_eq!(second.count(), 3);
    assert_eq!(second.found_element().map(|e| e.id.as_str()), Some("i2"));

    let third = TestElement::find(channel(engine.clone()), &email_query().with_index(3)).await;
    assert!(third.is_validated());

    let fourth = TestElement::find(channel(engine), &email_query().with_index(4)).await;
    assert_eq!(fourth.count(), 0);
    assert!(!fourth.is_validated());
    assert!(fourth.found_element().is_none());
}

#[tokio::test]
async fn test_stale_search_resolves_empty() {
    let engine = Arc::new(login_form().stale_find(true));
    let element = TestElement::find(channel(engine), &email_query()).await;
    assert_eq!(element.count(), 0);
    assert!(!element.is_validated());
}

#[tokio::test]
async fn test_click_retries_until_interactable() {
    let engine = Arc::new(login_form().fail_clicks(4));
    let element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    element.click(&mut status, &MouseDirection::default()).await;

    assert!(status.is_passed());
    assert_eq!(engine.calls().click.load(Ordering::SeqCst), 5);
    assert_eq!(engine.actions().await, vec!["click i1"]);
}

#[tokio::test]
async fn test_click_exhaustion_reports_last_message() {
    let engine = Arc::new(login_form().fail_clicks(100));
    let element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    element.click(&mut status, &MouseDirection::default()).await;

    assert!(!status.is_passed());
    assert_eq!(status.code(), StatusCode::ObjectNotInteractable);
    assert!(status.message().contains("input is covered"));
    assert_eq!(engine.calls().click.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn test_click_without_element() {
    let engine = Arc::new(login_form());
    let element = TestElement::find(channel(engine.clone()), &SearchedElement::new("button")).await;

    let mut status = ActionStatus::new();
    element.click(&mut status, &MouseDirection::default()).await;

    assert_eq!(status.code(), StatusCode::ObjectNotFound);
    assert_eq!(engine.calls().click.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_animation_settling_consumes_moving_samples() {
    let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
    let b = Rectangle::new(5.0, 0.0, 10.0, 10.0);
    let c = Rectangle::new(9.0, 0.0, 10.0, 10.0);
    let engine = Arc::new(login_form().with_rects(vec![a, b, c]));
    let mut element = TestElement::find(channel(engine.clone()), &email_query()).await;

    assert_eq!(element.wait_animation().await, 2);
    assert_eq!(element.found_element().map(|e| e.rect), Some(c));
    assert_eq!(engine.calls().bound_rect.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_enter_text_masks_password() {
    let engine = Arc::new(login_form());
    let query = SearchedElement::new("input").with_property(CalculatedProperty::new("type", "password"));
    let mut element = TestElement::find(channel(engine.clone()), &query).await;

    let mut status = ActionStatus::new();
    let entered = element.enter_text(&mut status, &CalculatedValue::from("secret")).await;

    assert!(status.is_passed());
    assert_eq!(entered, "########");
    assert_eq!(
        engine.actions().await,
        vec!["over pwd false", "clear pwd", "text pwd secret"]
    );
}

#[tokio::test]
async fn test_enter_key_sequence_skips_clear() {
    let engine = Arc::new(login_form().fail_text(2));
    let mut element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    let entered = element
        .enter_text(&mut status, &CalculatedValue::from("$key(ENTER)"))
        .await;

    assert!(status.is_passed());
    assert_eq!(entered, "$key(ENTER)");
    assert_eq!(engine.calls().text.load(Ordering::SeqCst), 3);
    assert_eq!(
        engine.actions().await,
        vec!["over i1 false", "text i1 $KEY-ENTER"]
    );
}

#[tokio::test]
async fn test_hover_exhaustion_stops_text_entry() {
    let engine = Arc::new(login_form().fail_hover(100));
    let mut element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    let entered = element.enter_text(&mut status, &CalculatedValue::from("abc")).await;

    assert_eq!(entered, "");
    assert_eq!(status.code(), StatusCode::ObjectNotInteractable);
    assert!(status.duration() >= Duration::from_millis(10));
    assert_eq!(engine.calls().hover.load(Ordering::SeqCst), 5);
    assert!(engine.actions().await.is_empty());
}

#[tokio::test]
async fn test_check_occurrences_reports_mismatch() {
    let engine = Arc::new(login_form());
    let recorder = Arc::new(MemoryRecorder::new());
    let element = TestElement::find(recorded_channel(engine, recorder.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    element.check_occurrences(&mut status, Comparison::Equal, 2);

    assert_eq!(status.code(), StatusCode::OccurrencesError);
    assert_eq!(
        status.message(),
        "[2] expected occurrence(s) but [3] occurrence(s) found using criterias [input,name:email]"
    );
    assert_eq!(status.value(), Some("3"));

    let entries = recorder.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].screen);
    assert_eq!(entries[1].value.as_deref(), Some("3"));
    assert_eq!(entries[1].data.as_deref(), Some("= 2"));

    let mut status = ActionStatus::new();
    element.check_occurrences(&mut status, Comparison::GreaterOrEqual, 3);
    assert!(status.is_passed());
}

#[tokio::test]
async fn test_pseudo_attributes_and_property() {
    let engine = Arc::new(login_form());
    let recorder = Arc::new(MemoryRecorder::new());
    let element = TestElement::find(recorded_channel(engine.clone(), recorder.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    assert_eq!(element.property(&mut status, ATS_OCCURRENCES).await, "3");
    assert_eq!(element.property(&mut status, "placeholder").await, "Mail");
    assert!(status.is_passed());

    assert_eq!(element.property(&mut status, "href").await, "");
    assert_eq!(status.code(), StatusCode::AttributeNotSet);
    assert_eq!(status.message(), "attribute 'href' not found");
    assert_eq!(recorder.entries().len(), 3);

    let attributes = element.get_attributes(false).await;
    let names: Vec<&str> = attributes.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(&names[..6], &[
        "-ats-occurences",
        "-ats-occurences-index",
        "-ats-table-data",
        "-ats-max-try",
        "-ats-search-duration",
        "-ats-search-tag",
    ]);
    assert_eq!(&names[6..], &["name", "placeholder"]);

    let missing = TestElement::find(channel(engine), &SearchedElement::new("button")).await;
    let mut status = ActionStatus::new();
    assert_eq!(missing.get_attribute(&mut status, ATS_OCCURRENCES_INDEX).await.as_deref(), Some("-1"));
    assert_eq!(missing.get_attribute(&mut status, ATS_SEARCH_TAG).await.as_deref(), Some("button"));
    assert_eq!(missing.property(&mut status, "name").await, "");
    assert_eq!(status.code(), StatusCode::ObjectNotFound);
}

#[tokio::test]
async fn test_text_data_extraction() {
    let engine = Arc::new(
        login_form()
            .with_node(MockNode::new("t1", "pre").text("a\tb\nc"))
            .with_node(MockNode::new("s1", "select"))
            .with_select_options(vec![
                vec!["fr".to_string(), "France".to_string()],
                vec![],
            ]),
    );

    let inputs = TestElement::find(channel(engine.clone()), &email_query()).await;
    let rows = inputs.get_text_data().await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], Parameter::named(0, "name", "email"));
    assert_eq!(rows[2][1].value, "Other");

    let pre = TestElement::find(channel(engine.clone()), &SearchedElement::new("pre")).await;
    assert_eq!(pre.get_table_data().await, r#"[{"0":"a","1":"b"},{"0":"c"}]"#);

    let select = TestElement::find(channel(engine.clone()), &SearchedElement::new("select")).await;
    let rows = select.get_text_data().await;
    assert_eq!(rows[0], vec![Parameter::new(0, "fr"), Parameter::new(1, "France")]);
    assert_eq!(rows[1], vec![Parameter::new(0, "")]);

    let single = TestElement::find(channel(engine), &email_query().with_index(1)).await;
    assert_eq!(single.get_text_data().await, vec![vec![Parameter::new(0, "")]]);
}

#[tokio::test]
async fn test_execute_script() {
    let engine = Arc::new(login_form());
    let element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    let value = element.execute_script(&mut status, "return this.value").await;
    assert!(status.is_passed());
    assert_eq!(value.unwrap()["element"], "i1");

    element.execute_script(&mut status, "throw new Error()").await;
    assert_eq!(status.code(), StatusCode::JavascriptError);

    let missing = TestElement::find(channel(engine), &SearchedElement::new("button")).await;
    let mut status = ActionStatus::new();
    assert!(missing.execute_script(&mut status, "return 1").await.is_none());
    assert_eq!(status.code(), StatusCode::ObjectNotFound);
    assert_eq!(status.message(), "Element not found, cannot execute script action !");
}

#[tokio::test]
async fn test_swipe_and_select() {
    let engine = Arc::new(login_form().fail_select(1));
    let element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    let direction = MouseDirection::new(
        Some(crate::engine::types::MousePosition::new(crate::engine::types::Cartesian::Left, 0)),
        None,
    );
    element.swipe(&mut status, &MouseDirection::default(), &direction).await;
    assert!(status.is_passed());

    element
        .select(&mut status, &CalculatedProperty::new("value", "fr"))
        .await;
    assert!(status.is_passed());
    assert_eq!(engine.calls().select.load(Ordering::SeqCst), 2);

    let actions = engine.actions().await;
    assert_eq!(actions[0], "drag i1");
    assert!(actions[1].starts_with("move "));
    assert_eq!(actions[2], "release");
    assert_eq!(actions[3], "select i1 fr");
}

#[tokio::test]
async fn test_wrapped_found_element() {
    let engine = Arc::new(login_form());
    let element = TestElement::from_found(
        channel(engine.clone()),
        crate::element::FoundElement::new("i3", "input", Rectangle::default()),
    );
    assert_eq!(element.count(), 1);
    assert!(element.is_validated());

    let mut status = ActionStatus::new();
    element.tap(&mut status, 2).await;
    assert!(status.is_passed());
    assert_eq!(engine.actions().await, vec!["tap i3 2"]);
}

#[tokio::test]
async fn test_drag_then_release() {
    let engine = Arc::new(login_form());
    let element = TestElement::find(channel(engine.clone()), &email_query()).await;

    let mut status = ActionStatus::new();
    element.drag(&mut status, &MouseDirection::default(), 5, 5).await;
    element.release(&mut status, None, true).await;
    assert!(status.is_passed());
    assert_eq!(engine.actions().await, vec!["drag i1", "release"]);

    let detached = TestElement::from_found(
        Arc::new(Channel::empty()),
        crate::element::found::FoundElement::new("x", "div", Rectangle::default()),
    );
    let mut status = ActionStatus::new();
    detached.release(&mut status, None, false).await;
    assert_eq!(status.code(), StatusCode::ChannelNotFound);
}
